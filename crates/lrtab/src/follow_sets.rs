//! Calculation of follow sets, used by the SLR(1) table construction.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID},
    types::{Map, TerminalSet},
};

#[derive(Debug)]
pub struct FollowSets {
    map: Map<NonterminalID, TerminalSet>,
}

impl FollowSets {
    pub fn new(grammar: &Grammar, first_sets: &FirstSets) -> Self {
        let map = follow_sets(grammar, first_sets, |_| ());
        Self { map }
    }

    /// `Follow(N)`
    pub fn get(&self, n: NonterminalID) -> &TerminalSet {
        &self.map[&n]
    }
}

fn follow_sets(
    grammar: &Grammar,
    first_sets: &FirstSets,
    mut on_pass: impl FnMut(&Map<NonterminalID, TerminalSet>),
) -> Map<NonterminalID, TerminalSet> {
    let mut map: Map<NonterminalID, TerminalSet> = grammar
        .nonterminals
        .keys()
        .map(|n| (*n, TerminalSet::default()))
        .collect();

    // The end of input always follows the start symbols.
    map[&NonterminalID::START].insert(TerminalID::EOI);
    map[&grammar.start_symbol].insert(TerminalID::EOI);

    // For each occurrence `A -> alpha B beta`:
    //  - Follow(B) >= First(beta)
    //  - Follow(B) >= Follow(A)  if beta is empty or nullable
    // First(beta) does not depend on the follow sets, so it is computed once.
    let mut firsts = vec![];
    let mut inherits = vec![];
    for rule in grammar.rules.values() {
        let right = rule.right();
        for (i, symbol) in right.iter().enumerate() {
            let b = match symbol {
                SymbolID::N(n) => *n,
                SymbolID::T(..) => continue,
            };
            let beta = &right[i + 1..];
            let first = first_sets.of_seq(beta);
            if !first.is_empty() {
                firsts.push((b, first));
            }
            if first_sets.is_nullable_seq(beta) && b != rule.left() {
                inherits.push((b, rule.left()));
            }
        }
    }

    for (b, first) in &firsts {
        map[b].union_with(first);
    }
    on_pass(&map);

    let mut changed = true;
    while changed {
        changed = false;
        for (b, a) in &inherits {
            let follow_a = map[a].clone();
            changed |= map[b].extend_from(&follow_a);
        }
        on_pass(&map);
    }

    map
}
