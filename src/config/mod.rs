//! Configuration management.
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! `DUPCHECK_*` environment variables.
//!
//! ```toml
//! database_path = "/var/lib/dupcheck/corpus.db"
//!
//! [dedup]
//! enabled = true
//! similarity_threshold = 80
//! scan_timeout_ms = 2000
//! prefilter_by_token_count = true
//!
//! [fetch]
//! timeout_ms = 30000
//! connect_timeout_ms = 3000
//! max_bytes = 104857600
//!
//! [storage]
//! unique_exact_digest = false
//!
//! [logging]
//! format = "json"
//! filter = "dupcheck=info"
//!
//! [metrics]
//! enabled = true
//! port = 9090
//! ```

use crate::fetch::FetchConfig;
use crate::services::deduplication::DeduplicationConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for dupcheck.
#[derive(Debug, Clone)]
pub struct DupcheckConfig {
    /// Path to the `SQLite` corpus database.
    pub database_path: PathBuf,
    /// Duplicate checker settings.
    pub dedup: DeduplicationConfig,
    /// Byte source settings.
    pub fetch: FetchConfig,
    /// Corpus store settings.
    pub storage: StorageConfig,
    /// Logging and metrics settings, resolved by [`crate::observability`].
    pub observability: ObservabilitySettings,
}

/// Corpus store configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageConfig {
    /// Reject a second entry with an exact digest already in the corpus.
    pub unique_exact_digest: bool,
}

/// Observability settings from the config file.
///
/// Environment overrides are applied when the settings are resolved.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservabilitySettings {
    /// Logging settings.
    pub logging: Option<LoggingSettings>,
    /// Metrics settings.
    pub metrics: Option<MetricsSettings>,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// Output format: `pretty` or `json`.
    pub format: Option<String>,
    /// `EnvFilter` directive, e.g. `dupcheck=debug`.
    pub filter: Option<String>,
    /// Log file path; logs go to stderr when unset.
    pub file: Option<String>,
}

/// `[metrics]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSettings {
    /// Whether metrics are recorded and exported.
    pub enabled: Option<bool>,
    /// Port for the Prometheus scrape endpoint.
    pub port: Option<u16>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Corpus database path.
    pub database_path: Option<String>,
    /// Duplicate checker settings.
    pub dedup: Option<ConfigFileDedup>,
    /// Byte source settings.
    pub fetch: Option<ConfigFileFetch>,
    /// Corpus store settings.
    pub storage: Option<ConfigFileStorage>,
    /// Logging settings.
    pub logging: Option<LoggingSettings>,
    /// Metrics settings.
    pub metrics: Option<MetricsSettings>,
}

/// `[dedup]` section.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileDedup {
    /// Enable duplicate checking.
    pub enabled: Option<bool>,
    /// Fuzzy similarity threshold (0-100).
    pub similarity_threshold: Option<u8>,
    /// Corpus scan deadline in milliseconds (0 disables).
    pub scan_timeout_ms: Option<u64>,
    /// Pre-filter fuzzy candidates by token count.
    pub prefilter_by_token_count: Option<bool>,
}

/// `[fetch]` section.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileFetch {
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
    /// Maximum file size in bytes.
    pub max_bytes: Option<u64>,
    /// HTTP user agent.
    pub user_agent: Option<String>,
}

/// `[storage]` section.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileStorage {
    /// Enforce a unique exact digest index.
    pub unique_exact_digest: Option<bool>,
}

impl Default for DupcheckConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            dedup: DeduplicationConfig::default(),
            fetch: FetchConfig::default(),
            storage: StorageConfig::default(),
            observability: ObservabilitySettings::default(),
        }
    }
}

impl DupcheckConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from `path`, or from the default location when
    /// `path` is `None`, then applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly given file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default(),
        };
        Ok(config.with_env_overrides())
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        Self::from_toml_str(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML.
    pub fn from_toml_str(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Searches `<config_dir>/dupcheck/config.toml`, then
    /// `~/.config/dupcheck/config.toml`; falls back to defaults.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join("dupcheck").join("config.toml");
        if platform_config.exists() {
            match Self::load_from_file(&platform_config) {
                Ok(config) => return config,
                Err(e) => tracing::debug!(error = %e, "Ignoring unreadable config file"),
            }
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("dupcheck")
            .join("config.toml");
        if xdg_config.exists() {
            if let Ok(config) = Self::load_from_file(&xdg_config) {
                return config;
            }
        }

        Self::default()
    }

    /// Applies `DUPCHECK_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(path) = std::env::var("DUPCHECK_DATABASE")
            .ok()
            .filter(|v| !v.trim().is_empty())
        {
            self.database_path = PathBuf::from(path);
        }
        if let Ok(v) = std::env::var("DUPCHECK_STORAGE_UNIQUE_EXACT_DIGEST") {
            let v = v.to_lowercase();
            self.storage.unique_exact_digest = v == "true" || v == "1" || v == "yes";
        }
        self.dedup = self.dedup.with_env_overrides();
        self.fetch = self.fetch.with_env_overrides();
        self
    }

    /// Converts a `ConfigFile` to `DupcheckConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(path) = file.database_path {
            config.database_path = PathBuf::from(path);
        }
        if let Some(dedup) = file.dedup {
            if let Some(v) = dedup.enabled {
                config.dedup.enabled = v;
            }
            if let Some(v) = dedup.similarity_threshold {
                config.dedup = config.dedup.with_similarity_threshold(v);
            }
            if let Some(ms) = dedup.scan_timeout_ms {
                config.dedup.scan_timeout = (ms > 0).then(|| Duration::from_millis(ms));
            }
            if let Some(v) = dedup.prefilter_by_token_count {
                config.dedup.prefilter_by_token_count = v;
            }
        }
        if let Some(fetch) = file.fetch {
            if let Some(v) = fetch.timeout_ms {
                config.fetch.timeout_ms = v;
            }
            if let Some(v) = fetch.connect_timeout_ms {
                config.fetch.connect_timeout_ms = v;
            }
            if let Some(v) = fetch.max_bytes {
                config.fetch.max_bytes = v;
            }
            if let Some(v) = fetch.user_agent {
                config.fetch.user_agent = v;
            }
        }
        if let Some(v) = file.storage.and_then(|s| s.unique_exact_digest) {
            config.storage.unique_exact_digest = v;
        }
        config.observability = ObservabilitySettings {
            logging: file.logging,
            metrics: file.metrics,
        };

        config
    }

    /// Sets the database path.
    #[must_use]
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Sets the duplicate checker configuration.
    #[must_use]
    pub fn with_dedup(mut self, dedup: DeduplicationConfig) -> Self {
        self.dedup = dedup;
        self
    }

    /// Sets the byte source configuration.
    #[must_use]
    pub fn with_fetch(mut self, fetch: FetchConfig) -> Self {
        self.fetch = fetch;
        self
    }

    /// Enables or disables the unique exact digest index.
    #[must_use]
    pub const fn with_unique_exact_digest(mut self, enabled: bool) -> Self {
        self.storage.unique_exact_digest = enabled;
        self
    }
}

fn default_database_path() -> PathBuf {
    crate::storage::get_user_data_dir().map_or_else(
        |_| PathBuf::from("dupcheck.db"),
        |dir| dir.join("corpus.db"),
    )
}
