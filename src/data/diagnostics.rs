//! Table parse diagnostics with source locations

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// JSON table that failed to parse, pointing at the offending location
#[derive(Debug, Error, Diagnostic)]
#[error("Malformed table {file}: {message}")]
#[diagnostic(code(bendq::tables::syntax))]
pub struct TableSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    file: String,

    /// The underlying error message
    message: String,
}

impl TableSyntaxError {
    /// Create a syntax error from a serde_json error
    pub fn from_json_error(err: &serde_json::Error, source: &str, filename: &str) -> Self {
        let offset = line_col_to_offset(source, err.line().max(1), err.column().max(1));
        let message = err.to_string();
        let help = generate_help(&message);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..offset.saturating_add(1)),
            help,
            file: filename.to_string(),
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Name of the table file
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Byte offset of the reported location
    pub fn offset(&self) -> usize {
        self.span.offset()
    }
}

/// Convert 1-based line/column to a byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    let mut line_start = 0;
    for (current_line, text) in source.split_inclusive('\n').enumerate() {
        if current_line + 1 == line {
            let within = text
                .char_indices()
                .nth(column.saturating_sub(1))
                .map(|(i, _)| i)
                .unwrap_or(text.len().saturating_sub(1));
            return line_start + within;
        }
        line_start += text.len();
    }
    source.len().saturating_sub(1)
}

/// Suggestions for the common hand-editing mistakes in table files
fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("trailing comma") {
        return Some("JSON does not allow a comma after the last item of a list or object.".to_string());
    }

    if msg_lower.contains("expected `,` or") {
        return Some("Separate items with commas: [1, 2, 3]".to_string());
    }

    if msg_lower.contains("key must be a string") {
        return Some("Object keys must be double-quoted: \"SS400\": 7.85".to_string());
    }

    if msg_lower.contains("missing field") {
        return Some("A required table is missing; compare with `bendq tables` output.".to_string());
    }

    if msg_lower.contains("invalid type") {
        return Some("Prices must be numbers; use null only where a value may be absent.".to_string());
    }

    None
}
