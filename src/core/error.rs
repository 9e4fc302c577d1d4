//! Error types for quoting and table loading
//!
//! Quote-time errors are local to one calculation and never touch the loaded
//! tables. Load-time errors surface before any calculation runs.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::data::diagnostics::TableSyntaxError;

/// A single quote could not be computed
#[derive(Debug, Clone, PartialEq, Error, Diagnostic)]
pub enum QuoteError {
    #[error("Unknown shape: {shape}")]
    #[diagnostic(code(bendq::quote::unknown_shape), help("Known shapes: {known}"))]
    UnknownShape { shape: String, known: String },

    #[error("Unknown material: {material}")]
    #[diagnostic(code(bendq::quote::unknown_material), help("Known materials: {known}"))]
    UnknownMaterial { material: String, known: String },

    #[error("No unit weight for {material} at thickness {thickness_mm}mm")]
    #[diagnostic(
        code(bendq::quote::thickness_not_in_table),
        help("Tabulated thicknesses: {known}")
    )]
    ThicknessNotInTable {
        material: String,
        thickness_mm: f64,
        known: String,
    },

    #[error("Thickness {thickness_mm}mm is outside the hole price tiers")]
    #[diagnostic(code(bendq::quote::hole_thickness_out_of_range))]
    HoleThicknessOutOfRange { thickness_mm: f64 },

    #[error("Invalid {field}: {reason}")]
    #[diagnostic(code(bendq::quote::invalid_input))]
    InvalidInput { field: &'static str, reason: String },

    #[error("{option} is not supported by the {variant} scheme")]
    #[diagnostic(code(bendq::quote::unsupported_option))]
    UnsupportedOption {
        variant: &'static str,
        option: &'static str,
    },
}

impl QuoteError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        QuoteError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending input field
    pub fn field(&self) -> &'static str {
        match self {
            QuoteError::UnknownShape { .. } => "shape",
            QuoteError::UnknownMaterial { .. } => "material",
            QuoteError::ThicknessNotInTable { .. } => "thickness",
            QuoteError::HoleThicknessOutOfRange { .. } => "thickness",
            QuoteError::InvalidInput { field, .. } => *field,
            QuoteError::UnsupportedOption { option, .. } => *option,
        }
    }
}

/// Tables could not be loaded
#[derive(Debug, Error, Diagnostic)]
pub enum TableError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] TableSyntaxError),

    #[error("{file}: {reason}")]
    #[diagnostic(code(bendq::tables::invalid))]
    Invalid { file: String, reason: String },

    #[error("{file}: CSV error: {message}")]
    #[diagnostic(code(bendq::tables::csv))]
    Csv { file: String, message: String },

    #[error("Table file not found: {0}")]
    #[diagnostic(
        code(bendq::tables::missing),
        help("Check --data-dir / BENDQ_DATA_DIR, or omit it to use the built-in tables")
    )]
    Missing(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TableError {
    pub fn invalid(file: impl Into<String>, reason: impl Into<String>) -> Self {
        TableError::Invalid {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_error_names_field() {
        let err = QuoteError::UnknownShape {
            shape: "S曲げ".to_string(),
            known: "L曲げ".to_string(),
        };
        assert_eq!(err.field(), "shape");
        assert_eq!(err.to_string(), "Unknown shape: S曲げ");

        let err = QuoteError::invalid("quantity", "must be at least 1");
        assert_eq!(err.field(), "quantity");
        assert_eq!(err.to_string(), "Invalid quantity: must be at least 1");
    }

    #[test]
    fn test_diagnostic_codes() {
        let err = QuoteError::HoleThicknessOutOfRange { thickness_mm: -1.0 };
        let code = err.code().map(|c| c.to_string());
        assert_eq!(
            code.as_deref(),
            Some("bendq::quote::hole_thickness_out_of_range")
        );
    }

    #[test]
    fn test_table_error_display() {
        let err = TableError::invalid("prices.json", "基準価格 has 10 rows, expected 11");
        assert_eq!(err.to_string(), "prices.json: 基準価格 has 10 rows, expected 11");
    }
}
