//! Duplicate check configuration.
//!
//! This module defines configuration for the duplicate checker, including
//! the similarity threshold and corpus scan bounds.

use std::time::Duration;

/// Default fuzzy similarity threshold (inclusive, percent).
pub const DEFAULT_SIMILARITY_THRESHOLD: u8 = 80;

/// Configuration for the duplicate checker.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `DUPCHECK_DEDUP_ENABLED` | bool | `true` | Enable duplicate checking |
/// | `DUPCHECK_DEDUP_THRESHOLD` | u8 | `80` | Fuzzy similarity threshold (0-100) |
/// | `DUPCHECK_DEDUP_SCAN_TIMEOUT_MS` | u64 | unset | Corpus scan deadline (0 disables) |
/// | `DUPCHECK_DEDUP_PREFILTER` | bool | `true` | Pre-filter candidates by token count |
///
/// # Example
///
/// ```rust
/// use dupcheck::services::deduplication::DeduplicationConfig;
///
/// let config = DeduplicationConfig::default();
/// assert!(config.enabled);
/// assert_eq!(config.similarity_threshold, 80);
/// assert!(config.scan_timeout.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeduplicationConfig {
    /// Enable/disable duplicate checking entirely.
    ///
    /// When disabled every check returns a "not duplicate" verdict without
    /// fetching the file.
    pub enabled: bool,

    /// Fuzzy similarity score at or above which a file is a duplicate.
    pub similarity_threshold: u8,

    /// Deadline for the fuzzy corpus scan. `None` scans without a bound.
    ///
    /// When the deadline passes the scan stops and the check fails open.
    pub scan_timeout: Option<Duration>,

    /// Ask the store only for entries whose token count can score above zero.
    ///
    /// Never changes a verdict; only reduces the number of comparisons.
    pub prefilter_by_token_count: bool,
}

impl DeduplicationConfig {
    /// Creates a new configuration from environment variables.
    ///
    /// Falls back to defaults for any unset variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("DUPCHECK_DEDUP_ENABLED") {
            self.enabled = v.to_lowercase() != "false" && v != "0";
        }

        if let Some(threshold) = std::env::var("DUPCHECK_DEDUP_THRESHOLD")
            .ok()
            .and_then(|v| v.parse::<u8>().ok())
        {
            self.similarity_threshold = threshold.min(100);
        }

        if let Some(ms) = std::env::var("DUPCHECK_DEDUP_SCAN_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.scan_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        if let Ok(v) = std::env::var("DUPCHECK_DEDUP_PREFILTER") {
            self.prefilter_by_token_count = v.to_lowercase() != "false" && v != "0";
        }

        self
    }

    /// Returns true if `score` is high enough to flag a duplicate.
    #[must_use]
    pub const fn is_similar(&self, score: u8) -> bool {
        score >= self.similarity_threshold
    }

    /// Builder method to set enabled state.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Builder method to set the similarity threshold (clamped to 100).
    #[must_use]
    pub const fn with_similarity_threshold(mut self, threshold: u8) -> Self {
        self.similarity_threshold = if threshold > 100 { 100 } else { threshold };
        self
    }

    /// Builder method to set the corpus scan deadline.
    #[must_use]
    pub const fn with_scan_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Builder method to toggle the token-count pre-filter.
    #[must_use]
    pub const fn with_prefilter(mut self, enabled: bool) -> Self {
        self.prefilter_by_token_count = enabled;
        self
    }
}

impl Default for DeduplicationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            scan_timeout: None,
            prefilter_by_token_count: true,
        }
    }
}
