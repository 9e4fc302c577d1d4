//! CLI command implementations

pub mod calc;
pub mod completions;
pub mod config;
pub mod estimate;
pub mod evals;
pub mod tables;

use miette::Result;

use crate::cli::helpers::{format_yen, Session};
use crate::cli::output::render_quote;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::pricing::QuoteResult;

/// Print a quote in the session's format
///
/// With `--quiet` the human format prints only the tax-included total.
pub(crate) fn emit_quote(quote: &QuoteResult, session: &Session, global: &GlobalOpts) -> Result<()> {
    if global.quiet && session.format == OutputFormat::Auto {
        println!("{}", format_yen(quote.processing_cost_tax_included));
        return Ok(());
    }
    print!("{}", render_quote(quote, session.format)?);
    Ok(())
}
