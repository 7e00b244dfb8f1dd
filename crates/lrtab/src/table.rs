//! Synthesis of the ACTION/GOTO tables from an automaton.

use crate::{
    collection::{Automaton, StateID},
    first_sets::FirstSets,
    follow_sets::FollowSets,
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    item::ItemKind,
    merge::merge_cores,
    types::{Map, TerminalSet},
    util::display_fn,
};
use indexmap::map::Entry;
use lrtab_runtime::definition as rt;
use std::fmt;

/// The family of LR automata and reduce placement used to build the table.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// LR(0) items; reduce on every terminal.
    LR0,
    /// LR(0) items; reduce on the follow set of the left-hand side.
    SLR,
    /// Canonical LR(1) items merged by core; reduce on the lookaheads.
    LALR,
    /// Canonical LR(1) items; reduce on the lookaheads.
    Canonical,
}

impl Strategy {
    pub fn item_kind(self) -> ItemKind {
        match self {
            Self::LR0 | Self::SLR => ItemKind::LR0,
            Self::LALR | Self::Canonical => ItemKind::LR1,
        }
    }
}

/// How a cell that receives a second, different action is settled.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ConflictPolicy {
    /// Keep the action that was written to the cell first.
    FirstWins,
    /// Keep a shift over a reduce, and the earlier rule among reduces.
    PreferShift,
}

#[derive(Debug, Copy, Clone)]
pub struct Config {
    strategy: Strategy,
    conflict_policy: ConflictPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: Strategy::LALR,
            conflict_policy: ConflictPolicy::FirstWins,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_lr0(&mut self) -> &mut Self {
        self.strategy = Strategy::LR0;
        self
    }

    pub fn use_slr(&mut self) -> &mut Self {
        self.strategy = Strategy::SLR;
        self
    }

    pub fn use_lalr(&mut self) -> &mut Self {
        self.strategy = Strategy::LALR;
        self
    }

    pub fn use_canonical(&mut self) -> &mut Self {
        self.strategy = Strategy::Canonical;
        self
    }

    pub fn strategy(&mut self, strategy: Strategy) -> &mut Self {
        self.strategy = strategy;
        self
    }

    pub fn prefer_shift(&mut self) -> &mut Self {
        self.conflict_policy = ConflictPolicy::PreferShift;
        self
    }

    pub fn first_wins(&mut self) -> &mut Self {
        self.conflict_policy = ConflictPolicy::FirstWins;
        self
    }

    pub fn conflict_policy(&mut self, policy: ConflictPolicy) -> &mut Self {
        self.conflict_policy = policy;
        self
    }

    pub fn get_strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn get_conflict_policy(&self) -> ConflictPolicy {
        self.conflict_policy
    }
}

/// The action that the LR automaton in a state performs on a particular
/// lookahead symbol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read a lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce to the specified production rule.
    Reduce(RuleID),

    Accept,
}

impl Action {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| match self {
            Self::Shift(next) => write!(f, "shift({:02})", next),
            Self::Reduce(rule) => write!(f, "reduce({})", g.rule(*rule).display(g)),
            Self::Accept => f.write_str("accept"),
        })
    }

    // Compact form used in the table grid: `s3`, `r2`, `acc`.
    fn short(&self) -> String {
        match self {
            Self::Shift(next) => format!("s{}", next),
            Self::Reduce(rule) => format!("r{}", rule),
            Self::Accept => "acc".into(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
    /// One of the actions is `accept`.
    Accept,
}

/// A cell of the ACTION table that received two different actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    pub symbol: TerminalID,
    pub first_action: Action,
    pub conflicting_action: Action,
    pub kept_action: Action,
}

impl Conflict {
    pub fn kind(&self) -> ConflictKind {
        use Action::*;
        match (self.first_action, self.conflicting_action) {
            (Accept, _) | (_, Accept) => ConflictKind::Accept,
            (Shift(..), _) | (_, Shift(..)) => ConflictKind::ShiftReduce,
            (Reduce(..), Reduce(..)) => ConflictKind::ReduceReduce,
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let kind = match self.kind() {
                ConflictKind::ShiftReduce => "shift/reduce",
                ConflictKind::ReduceReduce => "reduce/reduce",
                ConflictKind::Accept => "accept",
            };
            write!(
                f,
                "{} conflict in state {:02} on `{}': {} vs {}, kept {}",
                kind,
                self.state,
                g.terminals[&self.symbol],
                self.first_action.display(g),
                self.conflicting_action.display(g),
                self.kept_action.display(g),
            )
        })
    }
}

#[derive(Debug, Default, Clone)]
#[non_exhaustive]
pub struct ParseTableRow {
    pub actions: Map<TerminalID, Action>,
    pub gotos: Map<NonterminalID, StateID>,
}

#[derive(Debug, Clone)]
pub struct ParseTable {
    pub states: Map<StateID, ParseTableRow>,
    pub conflicts: Vec<Conflict>,
    strategy: Strategy,
    // left-hand side and right-hand side length, by rule.
    reductions: Map<RuleID, (NonterminalID, usize)>,
}

impl ParseTable {
    /// Derive the ACTION/GOTO tables from an automaton built for `strategy`.
    pub fn generate(
        g: &Grammar,
        automaton: &Automaton,
        strategy: Strategy,
        policy: ConflictPolicy,
    ) -> Self {
        let span = tracing::debug_span!("generate", ?strategy, ?policy);
        let _entered = span.enter();

        debug_assert_eq!(automaton.kind(), strategy.item_kind());

        let follow_sets = match strategy {
            Strategy::SLR => Some(FollowSets::new(g, &FirstSets::new(g))),
            _ => None,
        };
        let every_terminal: TerminalSet = g.terminals.keys().copied().collect();

        let mut builder = TableBuilder {
            policy,
            conflicts: vec![],
        };
        let mut states = Map::default();
        for (id, state) in automaton.states() {
            let mut row = ParseTableRow::default();

            for (core, _) in state.items().iter() {
                let symbol = match core.next_symbol(g) {
                    Some(symbol) => symbol,
                    None => continue,
                };
                let next = match automaton.transition(id, symbol) {
                    Some(next) => next,
                    None => {
                        debug_assert!(false, "missing transition from state {}", id);
                        continue;
                    }
                };
                match symbol {
                    SymbolID::T(t) => builder.set_action(&mut row, id, t, Action::Shift(next)),
                    SymbolID::N(n) => {
                        row.gotos.insert(n, next);
                    }
                }
            }

            for (core, lookaheads) in state.items().iter() {
                if !core.is_complete(g) {
                    continue;
                }
                if core.rule == RuleID::ACCEPT {
                    builder.set_action(&mut row, id, TerminalID::EOI, Action::Accept);
                    continue;
                }
                let targets = match strategy {
                    Strategy::LR0 => &every_terminal,
                    Strategy::SLR => match &follow_sets {
                        Some(follow_sets) => follow_sets.get(g.rule(core.rule).left()),
                        None => continue,
                    },
                    Strategy::LALR | Strategy::Canonical => lookaheads,
                };
                for t in targets.iter() {
                    builder.set_action(&mut row, id, t, Action::Reduce(core.rule));
                }
            }

            states.insert(id, row);
        }

        let reductions = g
            .rules
            .values()
            .map(|rule| (rule.id(), (rule.left(), rule.right().len())))
            .collect();

        if builder.conflicts.is_empty() {
            tracing::debug!("{} states, no conflicts", states.len());
        } else {
            tracing::debug!(
                "{} states, {} conflicts",
                states.len(),
                builder.conflicts.len()
            );
        }

        Self {
            states,
            conflicts: builder.conflicts,
            strategy,
            reductions,
        }
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn action(&self, state: StateID, lookahead: TerminalID) -> Option<Action> {
        self.states.get(&state)?.actions.get(&lookahead).copied()
    }

    pub fn goto(&self, state: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.states.get(&state)?.gotos.get(&symbol).copied()
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn is_conflict_free(&self) -> bool {
        self.conflicts.is_empty()
    }

    /// Render the table as a grid, one row per state.
    ///
    /// Terminal columns come in declaration order with `$end` last, followed
    /// by the nonterminal columns. Conflicts are listed below the grid.
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let terminals: Vec<TerminalID> = g
                .terminals
                .keys()
                .copied()
                .filter(|t| *t != TerminalID::EOI)
                .chain(Some(TerminalID::EOI))
                .collect();
            let nonterminals: Vec<NonterminalID> = g
                .nonterminals
                .keys()
                .copied()
                .filter(|n| *n != NonterminalID::START)
                .collect();

            let mut header = vec!["state".to_owned()];
            header.extend(terminals.iter().map(|t| g.terminals[t].name().to_owned()));
            header.extend(nonterminals.iter().map(|n| g.nonterminals[n].name().to_owned()));

            let mut rows = vec![];
            for (id, row) in &self.states {
                let mut cells = vec![id.to_string()];
                cells.extend(terminals.iter().map(|t| match row.actions.get(t) {
                    Some(action) => action.short(),
                    None => ".".into(),
                }));
                cells.extend(nonterminals.iter().map(|n| match row.gotos.get(n) {
                    Some(next) => next.to_string(),
                    None => ".".into(),
                }));
                rows.push(cells);
            }

            let mut widths: Vec<usize> = header.iter().map(|cell| cell.len()).collect();
            for cells in &rows {
                for (width, cell) in widths.iter_mut().zip(cells) {
                    *width = (*width).max(cell.len());
                }
            }

            let split = 1 + terminals.len();
            write_row(f, &header, &widths, split)?;
            for cells in &rows {
                write_row(f, cells, &widths, split)?;
            }

            if !self.conflicts.is_empty() {
                writeln!(f, "\n## conflicts")?;
                for conflict in &self.conflicts {
                    writeln!(f, "- {}", conflict.display(g))?;
                }
            }

            Ok(())
        })
    }
}

fn write_row(
    f: &mut fmt::Formatter<'_>,
    cells: &[String],
    widths: &[usize],
    split: usize,
) -> fmt::Result {
    for (i, (cell, width)) in cells.iter().zip(widths).enumerate() {
        if i == 1 || i == split {
            f.write_str(" |")?;
        }
        write!(f, " {:>width$}", cell, width = width)?;
    }
    writeln!(f)
}

impl rt::ParseTable for ParseTable {
    type State = StateID;
    type Terminal = TerminalID;
    type Nonterminal = NonterminalID;
    type Rule = RuleID;

    fn initial_state(&self) -> StateID {
        StateID::START
    }

    fn end_of_input(&self) -> TerminalID {
        TerminalID::EOI
    }

    fn action(
        &self,
        current: StateID,
        lookahead: TerminalID,
    ) -> Option<rt::ParseAction<StateID, RuleID, NonterminalID>> {
        let action = match self.states.get(&current)?.actions.get(&lookahead)? {
            Action::Shift(next) => rt::ParseAction::Shift(*next),
            Action::Reduce(rule) => {
                let (lhs, len) = self.reductions.get(rule).copied()?;
                rt::ParseAction::Reduce {
                    rule: *rule,
                    lhs,
                    len,
                }
            }
            Action::Accept => rt::ParseAction::Accept,
        };
        Some(action)
    }

    fn goto(&self, current: StateID, symbol: NonterminalID) -> Option<StateID> {
        self.states.get(&current)?.gotos.get(&symbol).copied()
    }
}

struct TableBuilder {
    policy: ConflictPolicy,
    conflicts: Vec<Conflict>,
}

impl TableBuilder {
    fn set_action(
        &mut self,
        row: &mut ParseTableRow,
        state: StateID,
        symbol: TerminalID,
        action: Action,
    ) {
        match row.actions.entry(symbol) {
            Entry::Vacant(entry) => {
                entry.insert(action);
            }
            Entry::Occupied(mut entry) => {
                let first = *entry.get();
                if first == action {
                    return;
                }
                let kept = match self.policy {
                    ConflictPolicy::FirstWins => first,
                    ConflictPolicy::PreferShift => prefer_shift(first, action),
                };
                entry.insert(kept);

                let conflict = Conflict {
                    state,
                    symbol,
                    first_action: first,
                    conflicting_action: action,
                    kept_action: kept,
                };
                tracing::warn!(
                    state = %state,
                    symbol = symbol.into_raw(),
                    "{:?} conflict: {:?} vs {:?}, kept {:?}",
                    conflict.kind(),
                    first,
                    action,
                    kept,
                );
                self.conflicts.push(conflict);
            }
        }
    }
}

fn prefer_shift(first: Action, second: Action) -> Action {
    use Action::*;
    match (first, second) {
        (Accept, _) | (_, Accept) => Accept,
        (Shift(..), _) => first,
        (_, Shift(..)) => second,
        (Reduce(r1), Reduce(r2)) => Reduce(r1.min(r2)),
    }
}

/// The automaton and the table built for a grammar.
#[derive(Debug)]
pub struct Generated {
    pub automaton: Automaton,
    pub table: ParseTable,
}

/// Build the automaton for the configured strategy and derive its table.
pub fn compute(g: &Grammar, config: &Config) -> Generated {
    let automaton = match config.strategy {
        Strategy::LR0 | Strategy::SLR => Automaton::canonical(g, ItemKind::LR0),
        Strategy::Canonical => Automaton::canonical(g, ItemKind::LR1),
        Strategy::LALR => merge_cores(&Automaton::canonical(g, ItemKind::LR1)),
    };
    let table = ParseTable::generate(g, &automaton, config.strategy, config.conflict_policy);
    Generated { automaton, table }
}
