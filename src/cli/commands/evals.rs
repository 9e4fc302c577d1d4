//! `bendq evals` command - run an evaluation suite against the calc-sheet engine

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use tracing::info;

use crate::cli::helpers::{format_yen, Session};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::loader::{load_calc_sheet, load_evals};
use crate::pricing::evals::{self, EvalOutcome};

#[derive(clap::Args, Debug)]
pub struct EvalsArgs {
    /// Evaluation cases (JSON); defaults to evals.json from the tables
    #[arg(long)]
    pub file: Option<PathBuf>,
}

pub fn run(args: EvalsArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::resolve(global)?;
    let tables = load_calc_sheet(&session.source)?;
    let cases = load_evals(&session.source, args.file.as_deref())?;
    info!(cases = cases.len(), "running evaluation suite");

    let outcomes = evals::run(&tables, &cases, &session.settings);
    let failed = outcomes.iter().filter(|o| !o.passed()).count();

    match session.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&outcomes).into_diagnostic()?);
        }
        OutputFormat::Yaml => print!("{}", serde_yml::to_string(&outcomes).into_diagnostic()?),
        _ => {
            for outcome in &outcomes {
                if !global.quiet || !outcome.passed() {
                    println!("{}", outcome_line(outcome));
                    for note in &outcome.notes {
                        println!("    {}", style(note).dim());
                    }
                }
            }
            println!();
            println!("{}", summary_line(outcomes.len(), failed));
        }
    }

    if failed > 0 {
        return Err(miette::miette!(
            "{} of {} evaluation case(s) failed",
            failed,
            outcomes.len()
        ));
    }
    Ok(())
}

fn outcome_line(outcome: &EvalOutcome) -> String {
    match &outcome.actual {
        Ok(actual) if *actual == outcome.expected => {
            format!("{} {} ({})", style("OK").green(), outcome.name, format_yen(*actual))
        }
        Ok(actual) => format!(
            "{} {}: expected {}, got {}",
            style("NG").red().bold(),
            outcome.name,
            format_yen(outcome.expected),
            format_yen(*actual)
        ),
        Err(e) => format!("{} {}: {}", style("ERR").red().bold(), outcome.name, e),
    }
}

fn summary_line(total: usize, failed: usize) -> String {
    let passed = total - failed;
    if failed == 0 {
        format!("{} {}/{} passed", style("✓").green(), passed, total)
    } else {
        format!(
            "{} {}/{} passed, {} failed",
            style("✗").red(),
            passed,
            total,
            failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(actual: Result<u64, String>) -> EvalOutcome {
        EvalOutcome {
            name: "L曲げ 標準".to_string(),
            expected: 1800,
            actual,
            notes: Vec::new(),
        }
    }

    #[test]
    fn test_outcome_lines() {
        console::set_colors_enabled(false);
        assert_eq!(outcome_line(&outcome(Ok(1800))), "OK L曲げ 標準 (¥1,800)");
        assert_eq!(
            outcome_line(&outcome(Ok(1900))),
            "NG L曲げ 標準: expected ¥1,800, got ¥1,900"
        );
        assert_eq!(
            outcome_line(&outcome(Err("unknown shape".to_string()))),
            "ERR L曲げ 標準: unknown shape"
        );
    }

    #[test]
    fn test_summary_line() {
        console::set_colors_enabled(false);
        assert_eq!(summary_line(3, 0), "✓ 3/3 passed");
        assert_eq!(summary_line(3, 1), "✗ 2/3 passed, 1 failed");
    }
}
