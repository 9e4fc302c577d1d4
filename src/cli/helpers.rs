//! Shared helper functions for CLI commands

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::Config;
use crate::data::DataSource;
use crate::pricing::QuoteSettings;

/// Effective settings for one invocation
#[derive(Debug, Clone)]
pub struct Session {
    pub config: Config,
    pub source: DataSource,
    pub settings: QuoteSettings,
    pub format: OutputFormat,
}

impl Session {
    /// Layer command-line flags over the loaded configuration
    pub fn resolve(global: &GlobalOpts) -> miette::Result<Self> {
        Self::from_config(Config::load(), global)
    }

    pub fn from_config(mut config: Config, global: &GlobalOpts) -> miette::Result<Self> {
        config.merge(Config {
            data_dir: global.data_dir.clone(),
            tax_rate: global.tax_rate,
            ..Default::default()
        });
        let settings = config.quote_settings()?;
        let source = DataSource::from_dir(config.data_dir.clone());
        let format = match global.format {
            OutputFormat::Auto => config
                .default_format
                .as_deref()
                .and_then(OutputFormat::from_name)
                .unwrap_or(OutputFormat::Auto),
            explicit => explicit,
        };
        Ok(Self {
            config,
            source,
            settings,
            format,
        })
    }
}

/// Format a yen amount with thousands separators, e.g. `¥1,980`
pub fn format_yen(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    out.push('¥');
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a factor without trailing noise, e.g. `1.5`, `0.8`, `1.8`
pub fn format_factor(factor: f64) -> String {
    let rounded = (factor * 1e6).round() / 1e6;
    format!("{}", rounded)
}

/// Format a class bound; the open overflow bound shows as `∞`
pub fn format_number(value: f64) -> String {
    if value.is_infinite() {
        "∞".to_string()
    } else {
        format!("{}", value)
    }
}

/// Escape a field for tab-separated output
pub fn escape_tsv(s: &str) -> String {
    s.replace(['\t', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global() -> GlobalOpts {
        GlobalOpts {
            format: OutputFormat::Auto,
            quiet: false,
            verbose: false,
            data_dir: None,
            tax_rate: None,
        }
    }

    #[test]
    fn test_format_yen() {
        assert_eq!(format_yen(0), "¥0");
        assert_eq!(format_yen(300), "¥300");
        assert_eq!(format_yen(1980), "¥1,980");
        assert_eq!(format_yen(1234567), "¥1,234,567");
    }

    #[test]
    fn test_format_factor() {
        assert_eq!(format_factor(1.5), "1.5");
        assert_eq!(format_factor(1.7999999999999998), "1.8");
        assert_eq!(format_factor(1.0), "1");
    }

    #[test]
    fn test_escape_tsv() {
        assert_eq!(escape_tsv("a\tb\nc"), "a b c");
    }

    #[test]
    fn test_flags_override_config() {
        let config = Config {
            tax_rate: Some(0.08),
            default_format: Some("json".to_string()),
            ..Default::default()
        };
        let mut opts = global();
        opts.tax_rate = Some(0.05);
        let session = Session::from_config(config.clone(), &opts).unwrap();
        assert_eq!(session.settings.tax_rate, 0.05);
        assert_eq!(session.format, OutputFormat::Json);
        assert_eq!(session.source, DataSource::Embedded);

        opts.format = OutputFormat::Yaml;
        opts.data_dir = Some("tables".into());
        let session = Session::from_config(config, &opts).unwrap();
        assert_eq!(session.format, OutputFormat::Yaml);
        assert_eq!(session.source, DataSource::Dir("tables".into()));
    }

    #[test]
    fn test_negative_tax_rate_rejected() {
        let mut opts = global();
        opts.tax_rate = Some(-1.0);
        assert!(Session::from_config(Config::default(), &opts).is_err());
    }
}
