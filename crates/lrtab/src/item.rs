//! LR items and the closure/goto operations over item sets.

use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    types::{Map, TerminalSet},
    util::display_fn,
};
use std::{
    collections::{btree_map::Entry, BTreeMap, BTreeSet},
    fmt,
};

/// The kind of items that an item set carries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Items without lookahead symbols.
    LR0,
    /// Items annotated with their lookahead symbols.
    LR1,
}

/// The LR(0) item, a.k.a. LR item core.
///
/// For a rule `X: Y1 Y2 ... Yn`, the marker indicates how many symbols of the
/// right-hand side have already been recognized.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LRItemCore {
    pub rule: RuleID,
    pub marker: usize,
}

impl LRItemCore {
    pub const fn new(rule: RuleID, marker: usize) -> Self {
        Self { rule, marker }
    }

    /// Return the symbol immediately after the marker, if any.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.rule(self.rule).right().get(self.marker).copied()
    }

    pub fn is_complete(&self, g: &Grammar) -> bool {
        self.marker >= g.rule(self.rule).right().len()
    }

    fn advance(&self) -> Self {
        Self {
            marker: self.marker + 1,
            ..*self
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let rule = g.rule(self.rule);
            write!(f, "{} :=", g.nonterminals[&rule.left()])?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == self.marker {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if self.marker == rule.right().len() {
                f.write_str(" .")?;
            }
            Ok(())
        })
    }
}

/// A set of items, keyed by their cores.
///
/// Items sharing a core are stored once with the union of their lookaheads,
/// so the map is the canonical form of the item set: two item sets are equal
/// iff their sorted `(rule, marker, lookaheads)` sequences are equal.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemSet {
    items: BTreeMap<LRItemCore, TerminalSet>,
}

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item, returning whether the item set changed.
    pub fn insert(&mut self, core: LRItemCore, lookaheads: &TerminalSet) -> bool {
        match self.items.entry(core) {
            Entry::Vacant(entry) => {
                entry.insert(lookaheads.clone());
                true
            }
            Entry::Occupied(mut entry) => entry.get_mut().extend_from(lookaheads),
        }
    }

    /// Union every item of `other` into this set.
    pub fn merge_from(&mut self, other: &ItemSet) -> bool {
        let mut changed = false;
        for (core, lookaheads) in other.iter() {
            changed |= self.insert(*core, lookaheads);
        }
        changed
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LRItemCore, &TerminalSet)> + '_ {
        self.items.iter()
    }

    pub fn lookaheads(&self, core: &LRItemCore) -> Option<&TerminalSet> {
        self.items.get(core)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The LR(0) core of this item set, i.e. the items with lookaheads erased.
    pub fn cores(&self) -> BTreeSet<LRItemCore> {
        self.items.keys().copied().collect()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (core, lookaheads) in &self.items {
                write!(f, "- {}", core.display(g))?;
                if !lookaheads.is_empty() {
                    f.write_str("  [")?;
                    for (i, t) in lookaheads.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" ")?;
                        }
                        write!(f, "{}", g.terminals[&t])?;
                    }
                    f.write_str("]")?;
                }
                writeln!(f)?;
            }
            Ok(())
        })
    }
}

impl FromIterator<(LRItemCore, TerminalSet)> for ItemSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (LRItemCore, TerminalSet)>,
    {
        let mut items = Self::new();
        for (core, lookaheads) in iter {
            items.insert(core, &lookaheads);
        }
        items
    }
}

/// Computes closures and transitions of item sets for a grammar.
#[derive(Debug)]
pub struct ClosureEngine<'g> {
    grammar: &'g Grammar,
    first_sets: FirstSets,
    kind: ItemKind,
    rules_by_left: Map<NonterminalID, Vec<RuleID>>,
}

impl<'g> ClosureEngine<'g> {
    pub fn new(grammar: &'g Grammar, kind: ItemKind) -> Self {
        let mut rules_by_left: Map<NonterminalID, Vec<RuleID>> = Map::default();
        for rule in grammar.rules.values() {
            rules_by_left.entry(rule.left()).or_default().push(rule.id());
        }
        Self {
            grammar,
            first_sets: FirstSets::new(grammar),
            kind,
            rules_by_left,
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn first_sets(&self) -> &FirstSets {
        &self.first_sets
    }

    /// The kernel of the initial state: `[$start := . S] {$end}`.
    pub fn start_items(&self) -> ItemSet {
        let lookaheads = match self.kind {
            ItemKind::LR0 => TerminalSet::default(),
            ItemKind::LR1 => Some(TerminalID::EOI).into_iter().collect(),
        };
        Some((LRItemCore::new(RuleID::ACCEPT, 0), lookaheads))
            .into_iter()
            .collect()
    }

    /// Expand the item set until it is closed.
    pub fn closure(&self, mut items: ItemSet) -> ItemSet {
        let mut changed = true;
        while changed {
            changed = false;

            // Collect the candidates first.
            let mut added: BTreeMap<LRItemCore, TerminalSet> = BTreeMap::new();
            for (core, lookaheads) in items.iter() {
                let rule = self.grammar.rule(core.rule);

                // [X -> ... . Y beta]
                //  Y: one nonterminal symbol
                let (y_symbol, beta) = match &rule.right()[core.marker..] {
                    [SymbolID::N(y_symbol), beta @ ..] => (y_symbol, beta),
                    _ => continue,
                };

                // With lookaheads = {x1,x2,...,xk}, every terminal in
                //   First(beta x1) + ... + First(beta xk)
                // becomes a lookahead of the added items.
                let x = match self.kind {
                    ItemKind::LR0 => TerminalSet::default(),
                    ItemKind::LR1 => self.first_sets.get(beta, lookaheads.iter()),
                };

                for rule in self.rules_by_left.get(y_symbol).into_iter().flatten() {
                    added
                        .entry(LRItemCore::new(*rule, 0))
                        .or_default()
                        .union_with(&x);
                }
            }

            for (core, lookaheads) in added {
                changed |= items.insert(core, &lookaheads);
            }
        }

        tracing::trace!("closure: {} items", items.len());
        items
    }

    /// Advance the marker over `symbol` and take the closure of the result.
    ///
    /// The returned item set is empty if no item has `symbol` after its marker.
    pub fn goto(&self, items: &ItemSet, symbol: SymbolID) -> ItemSet {
        let mut kernel = ItemSet::new();
        for (core, lookaheads) in items.iter() {
            if core.next_symbol(self.grammar) == Some(symbol) {
                kernel.insert(core.advance(), lookaheads);
            }
        }
        self.closure(kernel)
    }
}
