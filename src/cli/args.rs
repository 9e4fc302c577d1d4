//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    calc::CalcArgs, completions::CompletionsArgs, config::ConfigCommands, estimate::EstimateArgs,
    evals::EvalsArgs, tables::TablesArgs,
};

#[derive(Parser)]
#[command(name = "bendq")]
#[command(author, version, about = "Sheet-metal bending quotation engine")]
#[command(long_about = "Prices sheet-metal bending jobs from lookup tables: base price by weight and \
length class, shape and quantity factors, process surcharges and hole unit prices.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging to stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Directory with replacement table files (default: built-in tables)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Consumption tax rate, e.g. 0.10
    #[arg(long, global = true)]
    pub tax_rate: Option<f64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Quote with the calc-sheet scheme (shared matrix × shape multiplier)
    Calc(CalcArgs),

    /// Quote with the v2.1 scheme (per-shape tables, process surcharges)
    Estimate(EstimateArgs),

    /// Show the loaded pricing tables
    Tables(TablesArgs),

    /// Run an evaluation suite against the calc-sheet scheme
    Evals(EvalsArgs),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// JSON format (for programming)
    Json,
    /// Tab-separated key/value lines (for piping)
    Tsv,
    /// Markdown tables
    Md,
}

impl OutputFormat {
    /// Parse a configured default format name
    pub fn from_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}
