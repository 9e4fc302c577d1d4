//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::error::QuoteError;
use crate::pricing::quote::{QuoteSettings, DEFAULT_TAX_RATE};
use crate::pricing::SchemeKind;

/// Name of the per-directory config file
pub const LOCAL_CONFIG_FILE: &str = "bendq.yaml";

/// bendq configuration with layered hierarchy
#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding replacement table files
    pub data_dir: Option<PathBuf>,

    /// Consumption tax rate (0.10 = 10%)
    pub tax_rate: Option<f64>,

    /// Scheme used by `bendq tables` when none is named
    pub default_variant: Option<SchemeKind>,

    /// Default output format
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (already in Default impl)

        // 2. Global user config (~/.config/bendq/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global) = Self::read_file(&global_path) {
                config.merge(global);
            }
        }

        // 3. Working directory config (./bendq.yaml)
        if let Some(local) = Self::read_file(Path::new(LOCAL_CONFIG_FILE)) {
            config.merge(local);
        }

        // 4. Environment variables
        config.merge(Self::from_env(|key| std::env::var(key).ok()));

        config
    }

    /// Read one config file; unreadable or malformed files are skipped
    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => {
                debug!(path = %path.display(), "loaded config file");
                Some(config)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring malformed config file");
                None
            }
        }
    }

    /// Settings from `BENDQ_*` environment variables
    fn from_env(var: impl Fn(&str) -> Option<String>) -> Config {
        let mut config = Config::default();
        if let Some(dir) = var("BENDQ_DATA_DIR").filter(|d| !d.is_empty()) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(rate) = var("BENDQ_TAX_RATE") {
            match rate.trim().parse::<f64>() {
                Ok(rate) => config.tax_rate = Some(rate),
                Err(_) => warn!(value = %rate, "ignoring non-numeric BENDQ_TAX_RATE"),
            }
        }
        if let Some(variant) = var("BENDQ_VARIANT") {
            match variant.parse::<SchemeKind>() {
                Ok(kind) => config.default_variant = Some(kind),
                Err(e) => warn!("ignoring BENDQ_VARIANT: {}", e),
            }
        }
        config
    }

    /// Get the path to the global config file
    pub fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "bendq")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        if other.tax_rate.is_some() {
            self.tax_rate = other.tax_rate;
        }
        if other.default_variant.is_some() {
            self.default_variant = other.default_variant;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }

    /// Effective tax rate
    pub fn tax_rate(&self) -> f64 {
        self.tax_rate.unwrap_or(DEFAULT_TAX_RATE)
    }

    /// Validated quote settings
    pub fn quote_settings(&self) -> Result<QuoteSettings, QuoteError> {
        QuoteSettings::with_tax_rate(self.tax_rate())
    }

    /// Scheme used when a command does not name one
    pub fn variant(&self) -> SchemeKind {
        self.default_variant.unwrap_or(SchemeKind::CalcSheet)
    }
}
