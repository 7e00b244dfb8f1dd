//! Calculation of nullable symbols and first sets.

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID},
    types::{Map, Set, TerminalSet},
};

#[derive(Debug)]
pub struct FirstSets {
    nulls: Set<NonterminalID>,
    map: Map<NonterminalID, TerminalSet>,
}

impl FirstSets {
    pub fn new(grammar: &Grammar) -> Self {
        let nulls = nulls_set(grammar);
        let map = first_sets(grammar, &nulls, |_| ());
        Self { nulls, map }
    }

    pub fn is_nullable(&self, symbol: SymbolID) -> bool {
        matches!(symbol, SymbolID::N(n) if self.nulls.contains(&n))
    }

    /// `First(N)` of a single nonterminal symbol.
    pub fn first(&self, n: NonterminalID) -> &TerminalSet {
        &self.map[&n]
    }

    /// Return whether every symbol in `symbols` can derive the empty string.
    pub fn is_nullable_seq(&self, symbols: &[SymbolID]) -> bool {
        symbols.iter().all(|symbol| self.is_nullable(*symbol))
    }

    /// `First(prefix)` without any trailing lookahead.
    pub fn of_seq(&self, prefix: &[SymbolID]) -> TerminalSet {
        self.get(prefix, None)
    }

    /// `First(prefix lookaheads)`
    pub fn get<L>(&self, prefix: &[SymbolID], lookaheads: L) -> TerminalSet
    where
        L: IntoIterator<Item = TerminalID>,
    {
        let mut res = TerminalSet::default();

        let mut is_end = false;
        for symbol in prefix {
            match symbol {
                SymbolID::T(t) => {
                    res.insert(*t);
                    is_end = true;
                    break;
                }
                SymbolID::N(n) => {
                    res.union_with(&self.map[n]);
                    if !self.nulls.contains(n) {
                        is_end = true;
                        break;
                    }
                }
            }
        }

        if !is_end {
            res.extend(lookaheads);
        }

        res
    }
}

/// Calculate the set of nullable symbols in this grammar.
fn nulls_set(grammar: &Grammar) -> Set<NonterminalID> {
    // Rules with an empty right-hand side are nullable from the start.
    let mut nulls: Set<NonterminalID> = grammar
        .rules
        .values()
        .filter_map(|rule| rule.right().is_empty().then(|| rule.left()))
        .collect();

    // Repeat until nothing changes.
    let mut changed = true;
    while changed {
        changed = false;
        for rule in grammar.rules.values() {
            if nulls.contains(&rule.left()) {
                continue;
            }
            let is_rhs_nullable = rule
                .right()
                .iter()
                .all(|symbol| matches!(symbol, SymbolID::N(n) if nulls.contains(n)));
            if is_rhs_nullable {
                changed = true;
                nulls.insert(rule.left());
            }
        }
    }

    nulls
}

/// Solve the first set constraints, calling `on_pass` after every full pass.
fn first_sets(
    grammar: &Grammar,
    nulls: &Set<NonterminalID>,
    mut on_pass: impl FnMut(&Map<NonterminalID, TerminalSet>),
) -> Map<NonterminalID, TerminalSet> {
    let mut map: Map<NonterminalID, TerminalSet> = grammar
        .nonterminals
        .keys()
        .map(|n| (*n, TerminalSet::default()))
        .collect();

    // For each rule `X -> Y1 Y2 ... Yn`, scan Y1, Y2, ... up to and including
    // the first non-nullable symbol Yk, and add `First(X) >= First(Yi)` for
    // every i in 1..=k.
    #[derive(Debug)]
    enum Constraint {
        Terminal(NonterminalID, TerminalID),
        Subset(NonterminalID, NonterminalID),
    }
    let mut constraints = vec![];
    for rule in grammar.rules.values() {
        for symbol in rule.right() {
            match symbol {
                SymbolID::T(t) => {
                    constraints.push(Constraint::Terminal(rule.left(), *t));
                    break;
                }
                SymbolID::N(n) => {
                    if *n != rule.left() {
                        constraints.push(Constraint::Subset(rule.left(), *n));
                    }
                    if !nulls.contains(n) {
                        break;
                    }
                }
            }
        }
    }

    let mut changed = true;
    while changed {
        changed = false;

        for constraint in &constraints {
            match constraint {
                Constraint::Terminal(sup, t) => {
                    changed |= map[sup].insert(*t);
                }
                Constraint::Subset(sup, sub) => {
                    let subset = map[sub].clone();
                    changed |= map[sup].extend_from(&subset);
                }
            }
        }

        on_pass(&map);
    }

    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    fn expr_grammar() -> Grammar {
        Grammar::define(|g| {
            let plus = g.terminal("PLUS")?;
            let star = g.terminal("STAR")?;
            let lparen = g.terminal("LPAREN")?;
            let rparen = g.terminal("RPAREN")?;
            let id = g.terminal("ID")?;

            let e = g.nonterminal("E")?;
            let e_ = g.nonterminal("E'")?;
            let t = g.nonterminal("T")?;
            let t_ = g.nonterminal("T'")?;
            let f = g.nonterminal("F")?;

            g.rule(e, [N(t), N(e_)])?;
            g.rule(e_, [T(plus), N(t), N(e_)])?;
            g.rule(e_, [])?;
            g.rule(t, [N(f), N(t_)])?;
            g.rule(t_, [T(star), N(f), N(t_)])?;
            g.rule(t_, [])?;
            g.rule(f, [T(lparen), N(e), T(rparen)])?;
            g.rule(f, [T(id)])?;
            Ok(())
        })
        .unwrap()
    }

    fn names(g: &Grammar, set: &TerminalSet) -> Vec<String> {
        let mut names: Vec<_> = set
            .iter()
            .map(|t| g.terminals[&t].name().to_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn nullable_and_first() {
        let g = expr_grammar();
        let first = FirstSets::new(&g);

        let nt = |name: &str| g.nonterminal(name).unwrap();
        assert!(first.is_nullable(N(nt("E'"))));
        assert!(first.is_nullable(N(nt("T'"))));
        assert!(!first.is_nullable(N(nt("E"))));

        assert_eq!(names(&g, first.first(nt("E"))), ["ID", "LPAREN"]);
        assert_eq!(names(&g, first.first(nt("E'"))), ["PLUS"]);
        assert_eq!(names(&g, first.first(nt("T'"))), ["STAR"]);
    }

    #[test]
    fn first_of_nullable_sequence_includes_lookaheads() {
        let g = expr_grammar();
        let first = FirstSets::new(&g);
        let seq = [N(g.nonterminal("E'").unwrap()), N(g.nonterminal("T'").unwrap())];

        let set = first.get(&seq, Some(TerminalID::EOI));
        assert_eq!(names(&g, &set), ["$end", "PLUS", "STAR"]);

        let set = first.get(&[], Some(TerminalID::EOI));
        assert_eq!(names(&g, &set), ["$end"]);
    }

    #[test]
    fn passes_never_shrink() {
        let g = expr_grammar();
        let nulls = nulls_set(&g);
        let mut snapshots = vec![];
        let _ = first_sets(&g, &nulls, |map| snapshots.push(map.clone()));

        assert!(!snapshots.is_empty());
        for pair in snapshots.windows(2) {
            for (n, set) in &pair[0] {
                assert!(set.is_subset(&pair[1][n]));
            }
        }
    }
}
