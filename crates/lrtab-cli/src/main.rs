use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use lrtab::{
    grammar::Grammar,
    table::{compute, ConflictPolicy, Config, ParseTable, Strategy},
    trace,
};
use lrtab_runtime::engine::{EngineConfig, ParseEngine, DEFAULT_STEP_LIMIT};
use std::{fmt::Write as _, path::PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The construction used to build the parse table.
    #[arg(long, value_enum, default_value_t = StrategyArg::Lalr)]
    strategy: StrategyArg,

    /// How conflicting table entries are settled.
    #[arg(long, value_enum, default_value_t = ConflictsArg::FirstWins)]
    conflicts: ConflictsArg,

    /// Whitespace-separated terminal names to parse, e.g. "c c d d".
    #[arg(long)]
    input: Option<String>,

    /// The maximum number of parser steps.
    #[arg(long, default_value_t = DEFAULT_STEP_LIMIT)]
    step_limit: usize,

    /// The reports to print before parsing.
    #[arg(long, value_enum, value_delimiter = ',', default_values_t = [Report::Table])]
    show: Vec<Report>,

    /// The path of grammar definition file.
    grammar: PathBuf,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum)]
enum StrategyArg {
    Lr0,
    Slr,
    Lalr,
    Canonical,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum)]
enum ConflictsArg {
    FirstWins,
    PreferShift,
}

#[derive(Debug, Copy, Clone, PartialEq, ValueEnum)]
enum Report {
    Grammar,
    Automaton,
    Table,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::trace!("CLI args = {:?}", args);

    let grammar = Grammar::from_file(&args.grammar).with_context(|| {
        anyhow::anyhow!("failed to load the grammar from {}", args.grammar.display())
    })?;

    let mut config = Config::new();
    config.strategy(match args.strategy {
        StrategyArg::Lr0 => Strategy::LR0,
        StrategyArg::Slr => Strategy::SLR,
        StrategyArg::Lalr => Strategy::LALR,
        StrategyArg::Canonical => Strategy::Canonical,
    });
    config.conflict_policy(match args.conflicts {
        ConflictsArg::FirstWins => ConflictPolicy::FirstWins,
        ConflictsArg::PreferShift => ConflictPolicy::PreferShift,
    });

    let generated = compute(&grammar, &config);

    for report in &args.show {
        match report {
            Report::Grammar => println!("{}", grammar),
            Report::Automaton => println!("{}", generated.automaton.display(&grammar)),
            Report::Table => println!("{}", generated.table.display(&grammar)),
        }
    }

    let table_shown = args.show.contains(&Report::Table);
    print!("{}", conflict_warning(&generated.table, &grammar, table_shown));

    let input = match &args.input {
        Some(input) => input,
        None => return Ok(()),
    };
    let input = grammar
        .terminal_sequence(input)
        .context("failed to read the input symbols")?;

    let mut engine_config = EngineConfig::new();
    engine_config.step_limit(args.step_limit);
    let outcome = ParseEngine::with_config(&generated.table, &input, engine_config).run();
    println!("{}", trace::display(&outcome, &grammar));

    if !outcome.is_accepted() {
        anyhow::bail!("the input was rejected");
    }

    Ok(())
}

/// The warning printed for a table with conflicts. The conflicts are listed
/// unless the table report already shows them.
fn conflict_warning(table: &ParseTable, grammar: &Grammar, table_shown: bool) -> String {
    let conflicts = table.conflicts();
    let mut out = String::new();
    if conflicts.is_empty() {
        return out;
    }

    let suffix = if conflicts.len() == 1 { "" } else { "s" };
    if table_shown {
        let _ = writeln!(
            out,
            "[warning] The table has {} conflict{}; the kept actions are listed above.",
            conflicts.len(),
            suffix
        );
    } else {
        let _ = writeln!(
            out,
            "[warning] The table has {} conflict{}:",
            conflicts.len(),
            suffix
        );
        for conflict in conflicts {
            let _ = writeln!(out, "- {}", conflict.display(grammar));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dangling_else() -> Grammar {
        Grammar::from_str(
            r#"
            @terminal if_, cond, then, else_, other;
            @rule S := if_ cond then S | if_ cond then S else_ S | other;
            "#,
        )
        .unwrap()
    }

    #[test]
    fn conflicts_are_listed_without_the_table_report() {
        let g = dangling_else();
        let generated = compute(&g, &Config::new());

        let warning = conflict_warning(&generated.table, &g, false);
        eprintln!("{}", warning);
        assert!(warning.starts_with("[warning] The table has 1 conflict:"));
        assert!(warning.contains("else_"));
        assert!(!warning.contains("listed above"));

        let warning = conflict_warning(&generated.table, &g, true);
        assert!(warning.contains("listed above"));
        assert_eq!(warning.lines().count(), 1);
    }

    #[test]
    fn no_warning_without_conflicts() {
        let g = Grammar::from_str("@terminal d; @rule S := d;").unwrap();
        let generated = compute(&g, &Config::new());
        assert!(conflict_warning(&generated.table, &g, false).is_empty());
    }
}
