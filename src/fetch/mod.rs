//! Byte sources for duplicate checks.
//!
//! A byte source turns a file locator into the file's bytes. Fetching is the
//! only network I/O a check performs and is always bounded by a timeout.
//!
//! | Source | Locators |
//! |--------|----------|
//! | [`HttpByteSource`] | `http://…`, `https://…` |
//! | [`FileByteSource`] | `file://…`, plain paths |
//! | [`LocatorByteSource`] | dispatches on the locator scheme |

mod file;
mod http;

pub use file::FileByteSource;
pub use http::{HttpByteSource, build_http_client};

use std::time::Duration;
use thiserror::Error;

/// Default fetch timeout (30 seconds).
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Default connect timeout (3 seconds).
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 3_000;

/// Default maximum file size (100 MiB).
pub const DEFAULT_MAX_BYTES: u64 = 100 * 1024 * 1024;

/// Failures while fetching file bytes.
///
/// Every variant is treated the same by the duplicate checker: the check
/// fails open.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The remote answered with a non-success status.
    #[error("fetch of '{locator}' returned status {status}")]
    Status {
        /// The requested locator.
        locator: String,
        /// HTTP status code.
        status: u16,
    },

    /// The fetch did not finish within the timeout.
    #[error("fetch of '{locator}' timed out after {timeout_ms}ms")]
    Timeout {
        /// The requested locator.
        locator: String,
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// Connection, TLS or protocol failure.
    #[error("fetch of '{locator}' failed: {cause}")]
    Transport {
        /// The requested locator.
        locator: String,
        /// The underlying cause.
        cause: String,
    },

    /// A local file could not be read.
    #[error("cannot read '{locator}': {source}")]
    Io {
        /// The requested locator.
        locator: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The locator scheme is not handled by this source.
    #[error("unsupported locator '{0}'")]
    UnsupportedLocator(String),

    /// The HTTP client could not be built from the fetch configuration.
    #[error("failed to build HTTP client: {0}")]
    ClientInit(String),

    /// The file exceeds the configured size limit.
    #[error("'{locator}' exceeds the {limit} byte limit")]
    TooLarge {
        /// The requested locator.
        locator: String,
        /// Configured limit in bytes.
        limit: u64,
    },
}

impl FetchError {
    /// Short label for metrics and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Timeout { .. } => "timeout",
            Self::Transport { .. } => "transport",
            Self::Io { .. } => "io",
            Self::UnsupportedLocator(_) => "unsupported_locator",
            Self::TooLarge { .. } => "too_large",
            Self::ClientInit(_) => "client_init",
        }
    }
}

/// Source of file bytes.
///
/// Implementations must be safe to share between concurrent checks.
pub trait ByteSource: Send + Sync {
    /// Fetches the full content behind `locator`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] on non-success status, timeout, transport or
    /// I/O failure, unsupported locator, or oversized content.
    fn fetch_bytes(&self, locator: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetch configuration.
///
/// # Environment Variables
///
/// | Variable | Type | Default | Description |
/// |----------|------|---------|-------------|
/// | `DUPCHECK_FETCH_TIMEOUT_MS` | u64 | `30000` | Whole-request timeout (0 disables) |
/// | `DUPCHECK_FETCH_CONNECT_TIMEOUT_MS` | u64 | `3000` | Connect timeout (0 disables) |
/// | `DUPCHECK_FETCH_MAX_BYTES` | u64 | `104857600` | Maximum file size |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
    /// Maximum accepted content size in bytes.
    pub max_bytes: u64,
    /// User agent sent with HTTP requests.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            max_bytes: DEFAULT_MAX_BYTES,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchConfig {
    /// Loads fetch configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = parse_u64_env("DUPCHECK_FETCH_TIMEOUT_MS") {
            self.timeout_ms = v;
        }
        if let Some(v) = parse_u64_env("DUPCHECK_FETCH_CONNECT_TIMEOUT_MS") {
            self.connect_timeout_ms = v;
        }
        if let Some(v) = parse_u64_env("DUPCHECK_FETCH_MAX_BYTES") {
            self.max_bytes = v;
        }
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sets the maximum content size.
    #[must_use]
    pub const fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

fn parse_u64_env(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Byte source that dispatches on the locator scheme.
///
/// `http://` and `https://` go to [`HttpByteSource`]; `file://` and plain
/// paths go to [`FileByteSource`]; any other `scheme://` is rejected.
pub struct LocatorByteSource {
    http: HttpByteSource,
    file: FileByteSource,
}

impl LocatorByteSource {
    /// Creates a dispatching source from a fetch configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientInit`] if the HTTP client cannot be built.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        Ok(Self {
            http: HttpByteSource::new(config)?,
            file: FileByteSource::new(config.max_bytes),
        })
    }
}

impl ByteSource for LocatorByteSource {
    fn fetch_bytes(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        match scheme_of(locator) {
            Some(scheme) if scheme.eq_ignore_ascii_case("http") => self.http.fetch_bytes(locator),
            Some(scheme) if scheme.eq_ignore_ascii_case("https") => self.http.fetch_bytes(locator),
            Some(scheme) if scheme.eq_ignore_ascii_case("file") => self.file.fetch_bytes(locator),
            Some(_) => Err(FetchError::UnsupportedLocator(locator.to_string())),
            None if locator.trim().is_empty() => {
                Err(FetchError::UnsupportedLocator(locator.to_string()))
            },
            None => self.file.fetch_bytes(locator),
        }
    }
}

/// Returns the scheme of a `scheme://…` locator.
fn scheme_of(locator: &str) -> Option<&str> {
    let (scheme, _) = locator.split_once("://")?;
    let valid = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}
