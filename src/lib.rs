//! # Dupcheck
//!
//! Content-addressed duplicate detection for uploaded files.
//!
//! Dupcheck decides whether an incoming file, or a near-identical variant,
//! already exists in a corpus of previously accepted files. Two layers run
//! in order and stop at the first match:
//!
//! - **Exact match**: SHA-256 digest lookup
//! - **Fuzzy match**: per-chunk XXH3 tokens compared position by position
//!
//! Infrastructure failures never block an upload: the checker fails open.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dupcheck::fetch::{FetchConfig, LocatorByteSource};
//! use dupcheck::services::deduplication::{DeduplicationConfig, DuplicateChecker};
//! use dupcheck::storage::InMemoryCorpus;
//! use std::sync::Arc;
//!
//! let checker = DuplicateChecker::new(
//!     Arc::new(LocatorByteSource::new(&FetchConfig::default())?),
//!     Arc::new(InMemoryCorpus::new()),
//!     DeduplicationConfig::default(),
//! );
//!
//! let verdict = checker.check("https://example.com/report.pdf", "user-42", None);
//! if verdict.is_duplicate {
//!     println!("Rejected: {}", verdict.reason.map(|r| r.to_string()).unwrap_or_default());
//! }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod fetch;
pub mod models;
pub mod observability;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::DupcheckConfig;
pub use fetch::{ByteSource, FetchError};
pub use models::{CorpusEntry, EntryId, FileDigest};
pub use services::deduplication::{
    DeduplicationConfig, DuplicateChecker, DuplicateReason, DuplicateVerdict, compute_digest,
    similarity,
};
pub use storage::{CorpusStore, InMemoryCorpus, SqliteCorpus};

/// Error type for dupcheck operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Malformed locators, config values or entry IDs |
/// | `OperationFailed` | Database queries fail, files cannot be read, init fails |
/// | `Fetch` | The byte source cannot deliver a file |
/// | `Conflict` | A unique digest constraint rejects a write |
/// | `Timeout` | A bounded operation (corpus scan) runs past its deadline |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    ///
    /// Raised when:
    /// - `SQLite` statements fail
    /// - Filesystem I/O errors occur
    /// - Observability components fail to initialize
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// Fetching file bytes failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A write conflicted with an existing record.
    ///
    /// Raised by the `SQLite` store when the unique `exact_digest` index
    /// is enabled and another entry already holds the same digest.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A bounded operation exceeded its deadline.
    #[error("operation '{operation}' timed out after {elapsed_ms}ms")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// Elapsed time when the deadline was detected.
        elapsed_ms: u64,
    },
}

/// Result type alias for dupcheck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Falls back to 0 if the system clock is before the Unix epoch.
///
/// # Examples
///
/// ```rust
/// use dupcheck::current_timestamp;
///
/// let ts = current_timestamp();
/// assert!(ts > 0);
/// ```
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("test error".to_string());
        assert_eq!(err.to_string(), "invalid input: test error");

        let err = Error::OperationFailed {
            operation: "test".to_string(),
            cause: "failed".to_string(),
        };
        assert_eq!(err.to_string(), "operation 'test' failed: failed");

        let err = Error::Conflict("digest already stored".to_string());
        assert_eq!(err.to_string(), "conflict: digest already stored");

        let err = Error::Timeout {
            operation: "fuzzy_scan".to_string(),
            elapsed_ms: 1500,
        };
        assert_eq!(
            err.to_string(),
            "operation 'fuzzy_scan' timed out after 1500ms"
        );
    }

    #[test]
    fn test_fetch_error_is_transparent() {
        let err: Error = FetchError::UnsupportedLocator("ftp://host/file".to_string()).into();
        assert_eq!(
            err.to_string(),
            FetchError::UnsupportedLocator("ftp://host/file".to_string()).to_string()
        );
    }
}
