//! `bendq config` command - Configuration management
//!
//! Shows the effective settings and edits the working-directory or global
//! config file.

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::helpers::Session;
use crate::cli::GlobalOpts;
use crate::core::config::LOCAL_CONFIG_FILE;
use crate::core::Config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration values and the table source
    Show(ShowArgs),

    /// Set a configuration value
    Set(SetArgs),

    /// Unset (remove) a configuration value
    Unset(UnsetArgs),

    /// Show paths to configuration files
    Path,

    /// List all available configuration keys
    Keys,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    /// Show only this key's value
    pub key: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Configuration key (e.g., tax_rate, data_dir)
    pub key: String,

    /// Value to set
    #[arg(allow_hyphen_values = true)]
    pub value: String,

    /// Set in global (user) config instead of ./bendq.yaml
    #[arg(long, short = 'g')]
    pub global: bool,
}

#[derive(clap::Args, Debug)]
pub struct UnsetArgs {
    /// Configuration key to remove
    pub key: String,

    /// Remove from global (user) config instead of ./bendq.yaml
    #[arg(long, short = 'g')]
    pub global: bool,
}

/// Valid configuration keys
const VALID_KEYS: &[(&str, &str)] = &[
    ("data_dir", "Directory with replacement table files"),
    ("tax_rate", "Consumption tax rate, e.g. 0.10"),
    ("default_variant", "Scheme for `bendq tables` (calc-sheet, v21)"),
    ("default_format", "Default output format (yaml, json, tsv, md)"),
];

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Show(args) => run_show(args, global),
        ConfigCommands::Set(args) => run_set(args),
        ConfigCommands::Unset(args) => run_unset(args),
        ConfigCommands::Path => run_path(),
        ConfigCommands::Keys => run_keys(),
    }
}

fn run_show(args: ShowArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::resolve(global)?;
    let config = &session.config;

    if let Some(key) = &args.key {
        if !VALID_KEYS.iter().any(|(k, _)| *k == key.as_str()) {
            return Err(unknown_key(key));
        }
        return match get_config_value(config, key) {
            Some(v) => {
                println!("{}", v);
                Ok(())
            }
            None => Err(miette::miette!("Key '{}' is not set", key)),
        };
    }

    println!("{}", style("Effective Configuration").bold().underlined());
    println!();
    for (key, _) in VALID_KEYS {
        print_config_value(key, get_config_value(config, key).as_deref());
    }
    println!(
        "  {}: {}",
        style("tables").cyan(),
        style(&session.source).yellow()
    );

    println!();
    println!("{}", style("Config Sources (in priority order):").dim());
    println!("  1. Command-line flags (--data-dir, --tax-rate)");
    println!("  2. Environment variables (BENDQ_DATA_DIR, BENDQ_TAX_RATE, BENDQ_VARIANT)");
    println!("  3. Working directory config (./{})", LOCAL_CONFIG_FILE);
    match Config::global_config_path() {
        Some(path) => println!("  4. Global config ({})", path.display()),
        None => println!("  4. Global config (unavailable)"),
    }

    Ok(())
}

fn run_set(args: SetArgs) -> Result<()> {
    if !VALID_KEYS.iter().any(|(k, _)| *k == args.key) {
        return Err(unknown_key(&args.key));
    }
    let config_path = config_path(args.global)?;
    let mut config_map = read_mapping(&config_path)?;

    config_map.insert(
        serde_yml::Value::String(args.key.clone()),
        parse_value(&args.key, &args.value),
    );

    // Reject values the loader would not accept
    let updated = serde_yml::Value::Mapping(config_map);
    let parsed: Config = serde_yml::from_value(updated.clone())
        .map_err(|e| miette::miette!("Invalid value for {}: {}", args.key, e))?;
    parsed.quote_settings()?;

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).into_diagnostic()?;
    }
    let yaml = serde_yml::to_string(&updated).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    println!(
        "{} Set {} {} {} in {}",
        style("✓").green(),
        style(&args.key).cyan(),
        style("→").dim(),
        style(&args.value).yellow(),
        config_path.display()
    );

    Ok(())
}

fn run_unset(args: UnsetArgs) -> Result<()> {
    let config_path = config_path(args.global)?;
    if !config_path.exists() {
        return Err(miette::miette!(
            "Config file does not exist: {}",
            config_path.display()
        ));
    }

    let mut config_map = read_mapping(&config_path)?;
    if config_map
        .remove(serde_yml::Value::String(args.key.clone()))
        .is_none()
    {
        return Err(miette::miette!("Key '{}' not found in config", args.key));
    }

    let yaml = serde_yml::to_string(&serde_yml::Value::Mapping(config_map)).into_diagnostic()?;
    fs::write(&config_path, yaml).into_diagnostic()?;

    println!(
        "{} Removed {} from {}",
        style("✓").green(),
        style(&args.key).cyan(),
        config_path.display()
    );

    Ok(())
}

fn run_path() -> Result<()> {
    println!("{}", style("Configuration file paths:").bold());
    println!();

    match Config::global_config_path() {
        Some(path) => print_path("Global:", &path),
        None => println!("  {} {}", style("Global:").cyan(), style("(unavailable)").dim()),
    }
    println!();
    print_path("Local:", Path::new(LOCAL_CONFIG_FILE));

    Ok(())
}

fn run_keys() -> Result<()> {
    println!("{}", style("Available configuration keys:").bold());
    println!();

    for (key, description) in VALID_KEYS {
        println!("  {:<20} {}", style(key).cyan(), style(description).dim());
    }

    println!();
    println!(
        "{}",
        style("Use 'bendq config set <key> <value>' to set a value.").dim()
    );

    Ok(())
}

// Helper functions

fn unknown_key(key: &str) -> miette::Report {
    let valid: Vec<&str> = VALID_KEYS.iter().map(|(k, _)| *k).collect();
    miette::miette!(
        help = format!("valid keys: {}", valid.join(", ")),
        "Unknown configuration key '{}'",
        key
    )
}

fn config_path(global: bool) -> Result<PathBuf> {
    if global {
        Config::global_config_path()
            .ok_or_else(|| miette::miette!("Could not determine global config directory"))
    } else {
        Ok(PathBuf::from(LOCAL_CONFIG_FILE))
    }
}

fn read_mapping(path: &Path) -> Result<serde_yml::Mapping> {
    if !path.exists() {
        return Ok(serde_yml::Mapping::new());
    }
    let content = fs::read_to_string(path).into_diagnostic()?;
    match serde_yml::from_str::<serde_yml::Value>(&content).into_diagnostic()? {
        serde_yml::Value::Mapping(map) => Ok(map),
        serde_yml::Value::Null => Ok(serde_yml::Mapping::new()),
        _ => Err(miette::miette!("{} is not a YAML mapping", path.display())),
    }
}

/// `tax_rate` is stored as a number; everything else as a string
fn parse_value(key: &str, value: &str) -> serde_yml::Value {
    match value.parse::<f64>() {
        Ok(n) if key == "tax_rate" => serde_yml::Value::Number(n.into()),
        _ => serde_yml::Value::String(value.to_string()),
    }
}

fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "data_dir" => config.data_dir.as_ref().map(|d| d.display().to_string()),
        "tax_rate" => Some(config.tax_rate().to_string()),
        "default_variant" => Some(config.variant().to_string()),
        "default_format" => config.default_format.clone(),
        _ => None,
    }
}

fn print_config_value(key: &str, value: Option<&str>) {
    if let Some(v) = value {
        println!("  {}: {}", style(key).cyan(), style(v).yellow());
    } else {
        println!("  {}: {}", style(key).cyan(), style("(not set)").dim());
    }
}

fn print_path(label: &str, path: &Path) {
    let indent = " ".repeat(label.len() + 3);
    println!("  {} {}", style(label).cyan(), path.display());
    if path.exists() {
        println!("{}{}", indent, style("(exists)").green());
    } else {
        println!("{}{}", indent, style("(not created)").dim());
    }
}
