//! Construction of the canonical collection of item sets.

use crate::{
    grammar::{Grammar, SymbolID},
    item::{ClosureEngine, ItemKind, ItemSet},
    types::Map,
    util::{display_fn, write_separated},
};
use std::{collections::VecDeque, fmt};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID {
    raw: u32,
}

impl StateID {
    /// The initial state of every automaton.
    pub const START: Self = Self::from_raw(0);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u32 {
        self.raw
    }

    #[inline]
    pub fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// A state of the automaton.
#[derive(Debug, Clone)]
pub struct State {
    pub(crate) items: ItemSet,
    pub(crate) edges: Map<SymbolID, StateID>,
    pub(crate) merged_from: Vec<StateID>,
}

impl State {
    /// The closed item set of this state.
    pub fn items(&self) -> &ItemSet {
        &self.items
    }

    /// Outgoing transitions of this state, in discovery order.
    pub fn edges(&self) -> impl Iterator<Item = (SymbolID, StateID)> + '_ {
        self.edges.iter().map(|(symbol, target)| (*symbol, *target))
    }

    /// The states of the canonical collection this state was merged from.
    ///
    /// Empty unless the automaton is the result of merging.
    pub fn merged_from(&self) -> &[StateID] {
        &self.merged_from
    }
}

/// The LR automaton: the item-set states and the transitions between them.
#[derive(Debug, Clone)]
pub struct Automaton {
    pub(crate) kind: ItemKind,
    pub(crate) states: Vec<State>,
}

impl Automaton {
    /// Build the canonical collection of item sets reachable from
    /// `[$start := . S] {$end}`.
    pub fn canonical(grammar: &Grammar, kind: ItemKind) -> Self {
        let span = tracing::debug_span!("canonical", ?kind);
        let _entered = span.enter();

        let engine = ClosureEngine::new(grammar, kind);
        let mut builder = CollectionBuilder::new(&engine);
        builder.populate();
        let automaton = builder.finish();

        tracing::debug!("{} states", automaton.states.len());
        automaton
    }

    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn states(&self) -> impl Iterator<Item = (StateID, &State)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, state)| (StateID::from_raw(i as u32), state))
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[id.index()]
    }

    /// Look up the transition `(from, symbol)`.
    pub fn transition(&self, from: StateID, symbol: SymbolID) -> Option<StateID> {
        self.states
            .get(from.index())
            .and_then(|state| state.edges.get(&symbol).copied())
    }

    /// Enumerate every transition as `(from, symbol, to)`.
    pub fn transitions(&self) -> impl Iterator<Item = (StateID, SymbolID, StateID)> + '_ {
        self.states()
            .flat_map(|(from, state)| state.edges().map(move |(symbol, to)| (from, symbol, to)))
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            for (i, (id, state)) in self.states().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }

                write!(f, "#### State {:02}", id)?;
                if !state.merged_from.is_empty() {
                    f.write_str(" (merged from ")?;
                    write_separated(f, ", ", &state.merged_from)?;
                    f.write_str(")")?;
                }
                writeln!(f)?;

                writeln!(f, "## items")?;
                write!(f, "{}", state.items.display(g))?;

                if !state.edges.is_empty() {
                    writeln!(f, "## edges")?;
                    for (symbol, target) in &state.edges {
                        writeln!(f, "- {} -> {:02}", g.symbol_name(*symbol), target)?;
                    }
                }
            }
            Ok(())
        })
    }
}

// === CollectionBuilder ===

#[derive(Debug)]
struct CollectionBuilder<'e, 'g> {
    engine: &'e ClosureEngine<'g>,
    symbols: Vec<SymbolID>,
    states: Vec<State>,
    known: Map<ItemSet, StateID>,
    pending: VecDeque<StateID>,
}

impl<'e, 'g> CollectionBuilder<'e, 'g> {
    fn new(engine: &'e ClosureEngine<'g>) -> Self {
        let mut builder = Self {
            engine,
            symbols: engine.grammar().symbols(),
            states: vec![],
            known: Map::default(),
            pending: VecDeque::new(),
        };
        let start = engine.closure(engine.start_items());
        builder.intern(start);
        builder
    }

    /// Register a closed item set, returning its ID.
    ///
    /// IDs are handed out in first-seen order, so that the numbering is
    /// reproducible for the same grammar.
    fn intern(&mut self, items: ItemSet) -> StateID {
        if let Some(id) = self.known.get(&items) {
            return *id;
        }
        let id = StateID::from_raw(self.states.len() as u32);
        self.states.push(State {
            items: items.clone(),
            edges: Map::default(),
            merged_from: vec![],
        });
        self.known.insert(items, id);
        self.pending.push_back(id);
        id
    }

    fn populate(&mut self) {
        // Repeat until no new states are discovered.
        while let Some(current) = self.pending.pop_front() {
            let items = self.states[current.index()].items.clone();
            for i in 0..self.symbols.len() {
                let symbol = self.symbols[i];
                let next = self.engine.goto(&items, symbol);
                if next.is_empty() {
                    continue;
                }
                let target = self.intern(next);
                self.states[current.index()].edges.insert(symbol, target);
            }
        }
    }

    fn finish(self) -> Automaton {
        Automaton {
            kind: self.engine.kind(),
            states: self.states,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID::*;

    fn cc_grammar() -> Grammar {
        Grammar::define(|g| {
            let c = g.terminal("c")?;
            let d = g.terminal("d")?;
            let s = g.nonterminal("S")?;
            let cc = g.nonterminal("C")?;
            g.start_symbol(s)?;
            g.rule(s, [N(cc), N(cc)])?;
            g.rule(cc, [T(c), N(cc)])?;
            g.rule(cc, [T(d)])?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn canonical_lr1_collection() {
        let g = cc_grammar();
        let automaton = Automaton::canonical(&g, ItemKind::LR1);
        eprintln!("{}", automaton.display(&g));
        assert_eq!(automaton.len(), 10);
    }

    #[test]
    fn canonical_lr0_collection() {
        let g = cc_grammar();
        let automaton = Automaton::canonical(&g, ItemKind::LR0);
        assert_eq!(automaton.len(), 7);
    }

    #[test]
    fn state_zero_is_closure_of_start_item() {
        let g = cc_grammar();
        let automaton = Automaton::canonical(&g, ItemKind::LR1);
        let engine = ClosureEngine::new(&g, ItemKind::LR1);
        assert_eq!(
            automaton.state(StateID::START).items(),
            &engine.closure(engine.start_items())
        );
    }

    #[test]
    fn states_are_distinct_and_edges_are_gotos() {
        let g = cc_grammar();
        let engine = ClosureEngine::new(&g, ItemKind::LR1);
        let automaton = Automaton::canonical(&g, ItemKind::LR1);

        for (i, (_, a)) in automaton.states().enumerate() {
            for (_, b) in automaton.states().skip(i + 1) {
                assert_ne!(a.items(), b.items());
            }
        }
        for (from, symbol, to) in automaton.transitions() {
            let expected = engine.goto(automaton.state(from).items(), symbol);
            assert_eq!(automaton.state(to).items(), &expected);
        }
    }

    #[test]
    fn construction_is_deterministic() {
        let g = cc_grammar();
        let a1 = Automaton::canonical(&g, ItemKind::LR1);
        let a2 = Automaton::canonical(&g, ItemKind::LR1);
        assert_eq!(a1.len(), a2.len());
        let t1: Vec<_> = a1.transitions().collect();
        let t2: Vec<_> = a2.transitions().collect();
        assert_eq!(t1, t2);
    }
}
