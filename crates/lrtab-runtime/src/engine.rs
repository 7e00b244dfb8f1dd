//! The table-driven shift-reduce parser engine.

use crate::definition::{ParseAction, ParseTable};
use std::fmt;

/// The default bound on the number of steps of a single run.
pub const DEFAULT_STEP_LIMIT: usize = 10_000;

/// A trait for abstracting token symbols.
pub trait Token<TIdx> {
    /// Return the index value corresponding to this token.
    fn to_index(&self) -> TIdx;
}

/// Runtime options of [`ParseEngine`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    step_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_limit: DEFAULT_STEP_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of steps after which the input is rejected.
    pub fn step_limit(&mut self, limit: usize) -> &mut Self {
        self.step_limit = limit;
        self
    }

    pub fn get_step_limit(&self) -> usize {
        self.step_limit
    }
}

/// A cell of the parse stack.
///
/// The stack alternates between states and grammar symbols, starting and
/// ending with a state: `s0 X1 s1 X2 s2 ... Xn sn`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StackCell<S, T, N> {
    State(S),
    Terminal(T),
    Nonterminal(N),
}

/// The reason why the engine rejected its input.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectReason<S, T, N> {
    /// The table has no action for the current state and lookahead.
    #[error("no action is defined for the lookahead symbol")]
    NoActionEntry { state: S, lookahead: T },

    /// The state exposed by a reduction has no goto entry for its left-hand side.
    #[error("no goto entry is defined after the reduction")]
    NoGotoEntry { state: S, symbol: N },

    #[error("the number of steps exceeded the limit ({})", limit)]
    StepLimitExceeded { limit: usize },

    /// A reduction would pop more cells than the stack holds.
    #[error("the parse stack is too short for the reduction")]
    StackUnderflow,
}

/// The status of a run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status<S, T, N> {
    Running,
    Accepted,
    Rejected(RejectReason<S, T, N>),
}

impl<S, T, N> Status<S, T, N> {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// What the engine did in a single step.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StepAction<S, T, N, R> {
    Shift(S),
    Reduce(R),
    Accept,
    Reject(RejectReason<S, T, N>),
}

/// A record of a single step: the configuration before the step and the
/// action taken from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep<S, T, N, R> {
    pub step: usize,
    pub stack: Vec<StackCell<S, T, N>>,
    pub remaining: Vec<T>,
    pub action: StepAction<S, T, N, R>,
}

/// The result of running the engine to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome<S, T, N, R> {
    pub verdict: Status<S, T, N>,
    pub trace: Vec<TraceStep<S, T, N, R>>,
}

impl<S, T, N, R: Copy> ParseOutcome<S, T, N, R> {
    pub fn is_accepted(&self) -> bool {
        self.verdict.is_accepted()
    }

    /// The rules reduced during the run, in order.
    pub fn reductions(&self) -> impl Iterator<Item = R> + '_ {
        self.trace.iter().filter_map(|step| match step.action {
            StepAction::Reduce(rule) => Some(rule),
            _ => None,
        })
    }
}

/// The stack cell type of an engine driven by the table `D`.
pub type Cell<D> = StackCell<
    <D as ParseTable>::State,
    <D as ParseTable>::Terminal,
    <D as ParseTable>::Nonterminal,
>;

/// The outcome type produced by an engine driven by the table `D`.
pub type Outcome<D> = ParseOutcome<
    <D as ParseTable>::State,
    <D as ParseTable>::Terminal,
    <D as ParseTable>::Nonterminal,
    <D as ParseTable>::Rule,
>;

/// The status type of an engine driven by the table `D`.
pub type EngineStatus<D> = Status<
    <D as ParseTable>::State,
    <D as ParseTable>::Terminal,
    <D as ParseTable>::Nonterminal,
>;

/// The trace step type of an engine driven by the table `D`.
pub type Step<D> = TraceStep<
    <D as ParseTable>::State,
    <D as ParseTable>::Terminal,
    <D as ParseTable>::Nonterminal,
    <D as ParseTable>::Rule,
>;

/// The instance of LR parser engine that consumes a sequence of terminal
/// symbols, one step at a time.
///
/// The end-of-input symbol is implied after the last element of the input.
pub struct ParseEngine<'i, TDef>
where
    TDef: ParseTable,
{
    definition: TDef,
    config: EngineConfig,
    input: &'i [TDef::Terminal],
    cursor: usize,
    stack: Vec<Cell<TDef>>,
    status: EngineStatus<TDef>,
    trace: Vec<Step<TDef>>,
}

impl<'i, TDef> fmt::Debug for ParseEngine<'i, TDef>
where
    TDef: ParseTable + fmt::Debug,
    TDef::State: fmt::Debug,
    TDef::Terminal: fmt::Debug,
    TDef::Nonterminal: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseEngine")
            .field("definition", &self.definition)
            .field("config", &self.config)
            .field("cursor", &self.cursor)
            .field("stack", &self.stack)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<'i, TDef> ParseEngine<'i, TDef>
where
    TDef: ParseTable,
{
    /// Create a parser engine using the specified parse table.
    pub fn new(definition: TDef, input: &'i [TDef::Terminal]) -> Self {
        Self::with_config(definition, input, EngineConfig::default())
    }

    pub fn with_config(definition: TDef, input: &'i [TDef::Terminal], config: EngineConfig) -> Self {
        let initial_state = definition.initial_state();
        Self {
            definition,
            config,
            input,
            cursor: 0,
            stack: vec![StackCell::State(initial_state)],
            status: Status::Running,
            trace: vec![],
        }
    }

    pub fn status(&self) -> &EngineStatus<TDef> {
        &self.status
    }

    pub fn stack(&self) -> &[Cell<TDef>] {
        &self.stack
    }

    pub fn trace(&self) -> &[Step<TDef>] {
        &self.trace
    }

    /// Perform a single transition, unless the run has already finished.
    pub fn step(&mut self) -> &EngineStatus<TDef> {
        if !self.status.is_running() {
            return &self.status;
        }

        let stack = self.stack.clone();
        let remaining = self.remaining();
        let action = self.transition();
        match action {
            StepAction::Accept => self.status = Status::Accepted,
            StepAction::Reject(reason) => self.status = Status::Rejected(reason),
            StepAction::Shift(..) | StepAction::Reduce(..) => (),
        }
        self.trace.push(TraceStep {
            step: self.trace.len() + 1,
            stack,
            remaining,
            action,
        });

        &self.status
    }

    /// Run the engine until the input is accepted or rejected.
    pub fn run(mut self) -> Outcome<TDef> {
        while self.status.is_running() {
            self.step();
        }
        ParseOutcome {
            verdict: self.status,
            trace: self.trace,
        }
    }

    fn lookahead(&self) -> TDef::Terminal {
        self.input
            .get(self.cursor)
            .copied()
            .unwrap_or_else(|| self.definition.end_of_input())
    }

    fn remaining(&self) -> Vec<TDef::Terminal> {
        let eoi = self.definition.end_of_input();
        let mut remaining = self.input.get(self.cursor..).unwrap_or(&[]).to_vec();
        if remaining.last() != Some(&eoi) {
            remaining.push(eoi);
        }
        remaining
    }

    fn current_state(&self) -> Option<TDef::State> {
        match self.stack.last()? {
            StackCell::State(state) => Some(*state),
            _ => None,
        }
    }

    fn transition(&mut self) -> StepAction<TDef::State, TDef::Terminal, TDef::Nonterminal, TDef::Rule> {
        if self.trace.len() >= self.config.step_limit {
            return StepAction::Reject(RejectReason::StepLimitExceeded {
                limit: self.config.step_limit,
            });
        }

        let current = match self.current_state() {
            Some(current) => current,
            None => return StepAction::Reject(RejectReason::StackUnderflow),
        };
        let lookahead = self.lookahead();

        // The end marker may only appear as the last input symbol.
        if lookahead == self.definition.end_of_input() && self.cursor + 1 < self.input.len() {
            return StepAction::Reject(RejectReason::NoActionEntry {
                state: current,
                lookahead,
            });
        }

        match self.definition.action(current, lookahead) {
            Some(ParseAction::Shift(next)) => {
                self.stack.push(StackCell::Terminal(lookahead));
                self.stack.push(StackCell::State(next));
                self.cursor += 1;
                StepAction::Shift(next)
            }

            Some(ParseAction::Reduce { rule, lhs, len }) => {
                // Each right-hand side symbol occupies two cells.
                if self.stack.len() < 2 * len + 1 {
                    return StepAction::Reject(RejectReason::StackUnderflow);
                }
                self.stack.truncate(self.stack.len() - 2 * len);

                let exposed = match self.current_state() {
                    Some(exposed) => exposed,
                    None => return StepAction::Reject(RejectReason::StackUnderflow),
                };
                match self.definition.goto(exposed, lhs) {
                    Some(next) => {
                        self.stack.push(StackCell::Nonterminal(lhs));
                        self.stack.push(StackCell::State(next));
                        StepAction::Reduce(rule)
                    }
                    None => StepAction::Reject(RejectReason::NoGotoEntry {
                        state: exposed,
                        symbol: lhs,
                    }),
                }
            }

            Some(ParseAction::Accept) => StepAction::Accept,

            None => StepAction::Reject(RejectReason::NoActionEntry {
                state: current,
                lookahead,
            }),
        }
    }
}

/// Run the engine over `input` with the default configuration.
pub fn parse<TDef>(definition: TDef, input: &[TDef::Terminal]) -> Outcome<TDef>
where
    TDef: ParseTable,
{
    ParseEngine::new(definition, input).run()
}

/// Run the engine over a token sequence, mapping each token to its terminal.
pub fn parse_tokens<TDef, TTok>(
    definition: TDef,
    tokens: &[TTok],
    config: EngineConfig,
) -> Outcome<TDef>
where
    TDef: ParseTable,
    TTok: Token<TDef::Terminal>,
{
    let input: Vec<TDef::Terminal> = tokens.iter().map(|tok| tok.to_index()).collect();
    ParseEngine::with_config(definition, &input, config).run()
}

#[cfg(test)]
mod tests {
    use super::*;

    // A hand-written table for `S' -> S; S -> a S | b`.
    //
    //   state | a   b   $   | S
    //   ------+-------------+---
    //     0   | s2  s3      | 1
    //     1   |         acc |
    //     2   | s2  s3      | 4
    //     3   |         r2  |
    //     4   |         r1  |
    #[derive(Debug)]
    struct Table;

    const A: u8 = 1;
    const B: u8 = 2;
    const EOI: u8 = 0;

    impl ParseTable for Table {
        type State = u8;
        type Terminal = u8;
        type Nonterminal = char;
        type Rule = u8;

        fn initial_state(&self) -> u8 {
            0
        }

        fn end_of_input(&self) -> u8 {
            EOI
        }

        fn action(&self, current: u8, lookahead: u8) -> Option<ParseAction<u8, u8, char>> {
            match (current, lookahead) {
                (0 | 2, A) => Some(ParseAction::Shift(2)),
                (0 | 2, B) => Some(ParseAction::Shift(3)),
                (1, EOI) => Some(ParseAction::Accept),
                (3, EOI) => Some(ParseAction::Reduce {
                    rule: 2,
                    lhs: 'S',
                    len: 1,
                }),
                (4, EOI) => Some(ParseAction::Reduce {
                    rule: 1,
                    lhs: 'S',
                    len: 2,
                }),
                _ => None,
            }
        }

        fn goto(&self, current: u8, symbol: char) -> Option<u8> {
            match (current, symbol) {
                (0, 'S') => Some(1),
                (2, 'S') => Some(4),
                _ => None,
            }
        }
    }

    #[test]
    fn accepts_valid_input() {
        let outcome = parse(Table, &[A, A, B]);
        for step in &outcome.trace {
            eprintln!("{:?}", step);
        }
        assert_eq!(outcome.verdict, Status::Accepted);
        assert_eq!(outcome.reductions().collect::<Vec<_>>(), [2, 1, 1]);

        let last = outcome.trace.last().unwrap();
        assert_eq!(last.action, StepAction::Accept);
        assert_eq!(
            last.stack,
            [
                StackCell::State(0),
                StackCell::Nonterminal('S'),
                StackCell::State(1)
            ]
        );
        assert_eq!(last.remaining, [EOI]);
    }

    #[test]
    fn steps_are_numbered_from_one() {
        let outcome = parse(Table, &[B]);
        let steps: Vec<_> = outcome.trace.iter().map(|step| step.step).collect();
        assert_eq!(steps, [1, 2, 3]);
        assert_eq!(outcome.trace[0].remaining, [B, EOI]);
        assert_eq!(outcome.trace[0].stack, [StackCell::State(0)]);
    }

    #[test]
    fn rejects_missing_action() {
        let outcome = parse(Table, &[A]);
        assert_eq!(
            outcome.verdict,
            Status::Rejected(RejectReason::NoActionEntry {
                state: 2,
                lookahead: EOI
            })
        );
        assert!(matches!(
            outcome.trace.last().unwrap().action,
            StepAction::Reject(RejectReason::NoActionEntry { .. })
        ));
    }

    #[test]
    fn explicit_end_of_input_is_not_duplicated() {
        let outcome = parse(Table, &[B, EOI]);
        assert!(outcome.is_accepted());
        assert_eq!(outcome.trace[0].remaining, [B, EOI]);
    }

    #[test]
    fn input_after_end_of_input_is_rejected() {
        let outcome = parse(Table, &[B, EOI, A, B]);
        assert_eq!(
            outcome.verdict,
            Status::Rejected(RejectReason::NoActionEntry {
                state: 3,
                lookahead: EOI
            })
        );
        assert_eq!(outcome.reductions().count(), 0);
        assert_eq!(outcome.trace.last().unwrap().remaining, [EOI, A, B, EOI]);
    }

    #[test]
    fn reject_reason_is_an_error() {
        let reason: RejectReason<u8, u8, char> = RejectReason::StepLimitExceeded { limit: 3 };
        let err: &dyn std::error::Error = &reason;
        assert_eq!(err.to_string(), "the number of steps exceeded the limit (3)");
    }

    #[test]
    fn step_limit_rejects_long_runs() {
        let input = vec![A; 8];
        let mut config = EngineConfig::new();
        config.step_limit(3);
        let outcome = ParseEngine::with_config(Table, &input, config).run();
        assert_eq!(
            outcome.verdict,
            Status::Rejected(RejectReason::StepLimitExceeded { limit: 3 })
        );
        assert_eq!(outcome.trace.len(), 4);
    }

    #[test]
    fn step_is_idempotent_after_completion() {
        let mut engine = ParseEngine::new(&Table, &[B]);
        while engine.step().is_running() {}
        let len = engine.trace().len();
        assert!(engine.step().is_accepted());
        assert_eq!(engine.trace().len(), len);
    }

    #[test]
    fn missing_goto_is_reported() {
        #[derive(Debug)]
        struct Broken;
        impl ParseTable for Broken {
            type State = u8;
            type Terminal = u8;
            type Nonterminal = char;
            type Rule = u8;
            fn initial_state(&self) -> u8 {
                0
            }
            fn end_of_input(&self) -> u8 {
                EOI
            }
            fn action(&self, _: u8, _: u8) -> Option<ParseAction<u8, u8, char>> {
                Some(ParseAction::Reduce {
                    rule: 1,
                    lhs: 'X',
                    len: 0,
                })
            }
            fn goto(&self, _: u8, _: char) -> Option<u8> {
                None
            }
        }

        let outcome = parse(Broken, &[]);
        assert_eq!(
            outcome.verdict,
            Status::Rejected(RejectReason::NoGotoEntry {
                state: 0,
                symbol: 'X'
            })
        );
    }

    #[test]
    fn deep_reduction_underflows() {
        #[derive(Debug)]
        struct Underflow;
        impl ParseTable for Underflow {
            type State = u8;
            type Terminal = u8;
            type Nonterminal = char;
            type Rule = u8;
            fn initial_state(&self) -> u8 {
                0
            }
            fn end_of_input(&self) -> u8 {
                EOI
            }
            fn action(&self, _: u8, _: u8) -> Option<ParseAction<u8, u8, char>> {
                Some(ParseAction::Reduce {
                    rule: 1,
                    lhs: 'X',
                    len: 3,
                })
            }
            fn goto(&self, _: u8, _: char) -> Option<u8> {
                Some(0)
            }
        }

        let outcome = parse(Underflow, &[]);
        assert_eq!(
            outcome.verdict,
            Status::Rejected(RejectReason::StackUnderflow)
        );
    }

    #[test]
    fn tokens_are_mapped_to_terminals() {
        struct Tok(char);
        impl Token<u8> for Tok {
            fn to_index(&self) -> u8 {
                match self.0 {
                    'a' => A,
                    _ => B,
                }
            }
        }

        let outcome = parse_tokens(Table, &[Tok('a'), Tok('b')], EngineConfig::default());
        assert!(outcome.is_accepted());
    }
}
