//! Structured logging.

use crate::config::LoggingSettings;
use std::path::PathBuf;

/// Default filter directive when none is configured.
pub const DEFAULT_FILTER: &str = "warn,dupcheck=info";

/// Filter directive used with `--verbose`.
pub const VERBOSE_FILTER: &str = "info,dupcheck=debug";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name; unknown names fall back to `Pretty`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging configuration.
///
/// # Environment Variables
///
/// | Variable | Description |
/// |----------|-------------|
/// | `DUPCHECK_LOG` | `EnvFilter` directive |
/// | `DUPCHECK_LOG_FORMAT` | `pretty` or `json` |
/// | `DUPCHECK_LOG_FILE` | Append logs to this file instead of stderr |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive.
    pub filter: String,
    /// Optional log file.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: DEFAULT_FILTER.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from environment variables.
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        Self::from_settings(None, verbose)
    }

    /// Builds logging configuration from config settings with env overrides.
    ///
    /// `verbose` raises the default filter; an explicit filter in the file
    /// or environment still wins.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let mut config = Self {
            format: settings
                .and_then(|s| s.format.as_deref())
                .map(LogFormat::parse)
                .unwrap_or_default(),
            filter: settings
                .and_then(|s| s.filter.clone())
                .unwrap_or_else(|| {
                    if verbose { VERBOSE_FILTER } else { DEFAULT_FILTER }.to_string()
                }),
            file: settings.and_then(|s| s.file.as_ref()).map(PathBuf::from),
        };

        if let Some(format) = parse_string_env("DUPCHECK_LOG_FORMAT") {
            config.format = LogFormat::parse(&format);
        }
        if let Some(filter) = parse_string_env("DUPCHECK_LOG") {
            config.filter = filter;
        }
        if let Some(file) = parse_string_env("DUPCHECK_LOG_FILE") {
            config.file = Some(PathBuf::from(file));
        }

        config
    }
}

fn parse_string_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("unknown"), LogFormat::Pretty);
    }

    #[test]
    fn test_settings_take_precedence_over_verbose() {
        let settings = LoggingSettings {
            format: Some("json".to_string()),
            filter: Some("dupcheck=trace".to_string()),
            file: Some("/tmp/dupcheck.log".to_string()),
        };
        let config = LoggingConfig::from_settings(Some(&settings), true);
        if std::env::var("DUPCHECK_LOG").is_err() {
            assert_eq!(config.filter, "dupcheck=trace");
        }
        if std::env::var("DUPCHECK_LOG_FORMAT").is_err() {
            assert_eq!(config.format, LogFormat::Json);
        }
    }

    #[test]
    fn test_verbose_default_filter() {
        if std::env::var("DUPCHECK_LOG").is_ok() {
            return;
        }
        assert_eq!(LoggingConfig::from_settings(None, true).filter, VERBOSE_FILTER);
        assert_eq!(LoggingConfig::from_settings(None, false).filter, DEFAULT_FILTER);
    }
}
