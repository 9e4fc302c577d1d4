//! Table sources
//!
//! The default tables ship inside the binary. A data directory with files of
//! the same names replaces them wholesale; files are never merged.

pub mod diagnostics;

use rust_embed::Embed;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::TableError;

#[derive(Embed)]
#[folder = "data/"]
struct EmbeddedTables;

/// Calc-sheet base price matrix and class bounds
pub const PRICES_FILE: &str = "prices.json";
/// Shape multipliers, quantity bands, densities
pub const RATES_FILE: &str = "rates.json";
/// Hole price bands by thickness
pub const HOLE_PRICES_FILE: &str = "hole_prices.json";
/// v2.1 per-shape base price table
pub const V21_TABLE_FILE: &str = "bending_price_table.csv";
/// v2.1 adjustment constants
pub const V21_RULES_FILE: &str = "v21_rules.json";
/// Calc-sheet evaluation cases
pub const EVALS_FILE: &str = "evals.json";

/// Where table files are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Tables compiled into the binary
    Embedded,
    /// A directory holding replacement table files
    Dir(PathBuf),
}

impl DataSource {
    pub fn from_dir(dir: Option<PathBuf>) -> Self {
        match dir {
            Some(dir) => DataSource::Dir(dir),
            None => DataSource::Embedded,
        }
    }

    /// Read a table file as UTF-8 text
    pub fn read(&self, name: &str) -> Result<String, TableError> {
        match self {
            DataSource::Embedded => {
                let file = EmbeddedTables::get(name)
                    .ok_or_else(|| TableError::Missing(PathBuf::from(name)))?;
                String::from_utf8(file.data.into_owned())
                    .map_err(|e| TableError::invalid(name, format!("not valid UTF-8: {}", e)))
            }
            DataSource::Dir(dir) => read_file(&dir.join(name)),
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Embedded => write!(f, "built-in tables"),
            DataSource::Dir(dir) => write!(f, "{}", dir.display()),
        }
    }
}

/// Read a table file from an explicit path
pub fn read_file(path: &Path) -> Result<String, TableError> {
    if !path.exists() {
        return Err(TableError::Missing(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_embedded_tables_present() {
        let source = DataSource::Embedded;
        for name in [
            PRICES_FILE,
            RATES_FILE,
            HOLE_PRICES_FILE,
            V21_TABLE_FILE,
            V21_RULES_FILE,
            EVALS_FILE,
        ] {
            let content = source.read(name).unwrap();
            assert!(!content.is_empty(), "{} is empty", name);
        }
    }

    #[test]
    fn test_dir_source_missing_file() {
        let dir = tempdir().unwrap();
        let source = DataSource::Dir(dir.path().to_path_buf());
        let err = source.read(PRICES_FILE).unwrap_err();
        assert!(matches!(err, TableError::Missing(_)));
    }

    #[test]
    fn test_dir_source_reads_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(RATES_FILE), "{}").unwrap();
        let source = DataSource::from_dir(Some(dir.path().to_path_buf()));
        assert_eq!(source.read(RATES_FILE).unwrap(), "{}");
    }
}
