//! Logging setup
//!
//! Events go to stderr so stdout stays parseable in json/yaml/tsv modes.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable holding the log filter directive
pub const LOG_ENV: &str = "BENDQ_LOG";

/// Filter directive for a verbosity setting
///
/// `BENDQ_LOG` wins when set; otherwise `-v` shows debug events from this
/// crate and the default shows warnings only.
pub fn filter_directive(verbose: bool, env_value: Option<&str>) -> String {
    match env_value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(directive) => directive.to_string(),
        None if verbose => "bendq=debug,warn".to_string(),
        None => "warn".to_string(),
    }
}

/// Initialize tracing/logging
///
/// Can only be called once per process.
pub fn init_tracing(verbose: bool) {
    let env_value = std::env::var(LOG_ENV).ok();
    let directive = filter_directive(verbose, env_value.as_deref());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive(false, None), "warn");
        assert_eq!(filter_directive(true, None), "bendq=debug,warn");
        assert_eq!(filter_directive(true, Some("bendq=trace")), "bendq=trace");
        assert_eq!(filter_directive(false, Some("  ")), "warn");
    }
}
