//! Rendering of parse runs.

use crate::{
    collection::StateID,
    grammar::{Grammar, NonterminalID, TerminalID},
    table::ParseTable,
    util::{display_fn, write_separated},
};
use lrtab_runtime::engine::{Outcome, RejectReason, StackCell, Status, StepAction};
use std::fmt;

/// The outcome of running the engine over a generated table.
pub type ParseOutcome = Outcome<ParseTable>;

/// Render the trace of a run as a `step | stack | input | action` table,
/// followed by the verdict.
pub fn display<'g>(outcome: &'g ParseOutcome, g: &'g Grammar) -> impl fmt::Display + 'g {
    display_fn(move |f| {
        let mut rows = vec![[
            "step".to_owned(),
            "stack".to_owned(),
            "input".to_owned(),
            "action".to_owned(),
        ]];
        for step in &outcome.trace {
            rows.push([
                step.step.to_string(),
                display_fn(|f| {
                    for (i, cell) in step.stack.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" ")?;
                        }
                        match cell {
                            StackCell::State(state) => write!(f, "{}", state)?,
                            StackCell::Terminal(t) => write!(f, "{}", g.terminals[t])?,
                            StackCell::Nonterminal(n) => write!(f, "{}", g.nonterminals[n])?,
                        }
                    }
                    Ok(())
                })
                .to_string(),
                display_fn(|f| {
                    write_separated(f, " ", step.remaining.iter().map(|t| &g.terminals[t]))
                })
                .to_string(),
                match &step.action {
                    StepAction::Shift(next) => format!("shift {}", next),
                    StepAction::Reduce(rule) => format!("reduce {}", g.rule(*rule).display(g)),
                    StepAction::Accept => "accept".to_owned(),
                    StepAction::Reject(reason) => format!("error: {}", reason),
                },
            ]);
        }

        let mut widths = [0; 4];
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        for row in &rows {
            writeln!(
                f,
                "{:>w0$} | {:<w1$} | {:>w2$} | {}",
                row[0],
                row[1],
                row[2],
                row[3],
                w0 = widths[0],
                w1 = widths[1],
                w2 = widths[2],
            )?;
        }

        writeln!(f)?;
        write!(f, "{}", verdict(&outcome.verdict, g))
    })
}

/// Render the final status of a run.
pub fn verdict<'g>(
    status: &'g Status<StateID, TerminalID, NonterminalID>,
    g: &'g Grammar,
) -> impl fmt::Display + 'g {
    display_fn(move |f| match status {
        Status::Running => f.write_str("running"),
        Status::Accepted => f.write_str("accepted"),
        Status::Rejected(reason) => {
            write!(f, "rejected: {}", reason)?;
            match reason {
                RejectReason::NoActionEntry { state, lookahead } => write!(
                    f,
                    " (state {}, lookahead `{}')",
                    state, g.terminals[lookahead]
                ),
                RejectReason::NoGotoEntry { state, symbol } => write!(
                    f,
                    " (state {}, symbol `{}')",
                    state, g.nonterminals[symbol]
                ),
                RejectReason::StepLimitExceeded { .. } | RejectReason::StackUnderflow => Ok(()),
            }
        }
    })
}
