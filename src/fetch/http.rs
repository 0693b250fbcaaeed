//! HTTP byte source.

use super::{ByteSource, FetchConfig, FetchError};
use std::io::Read;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Builds a blocking HTTP client with the configured timeouts.
///
/// A zero timeout leaves the corresponding bound unset.
///
/// # Errors
///
/// Returns [`FetchError::ClientInit`] if the client cannot be built, e.g.
/// for an invalid user agent or a TLS backend failure.
pub fn build_http_client(config: &FetchConfig) -> Result<reqwest::blocking::Client, FetchError> {
    let mut builder = reqwest::blocking::Client::builder().user_agent(config.user_agent.clone());
    if config.timeout_ms > 0 {
        builder = builder.timeout(Duration::from_millis(config.timeout_ms));
    }
    if config.connect_timeout_ms > 0 {
        builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
    }

    builder.build().map_err(|err| {
        tracing::error!(error = %err, "Failed to build fetch HTTP client");
        FetchError::ClientInit(err.to_string())
    })
}

/// Fetches file bytes over HTTP(S) with a GET request.
pub struct HttpByteSource {
    client: reqwest::blocking::Client,
    timeout_ms: u64,
    max_bytes: u64,
}

impl HttpByteSource {
    /// Creates a source from a fetch configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::ClientInit`] if the HTTP client cannot be built.
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_http_client(config)?,
            timeout_ms: config.timeout_ms,
            max_bytes: config.max_bytes,
        })
    }

    fn classify(&self, locator: &str, err: &reqwest::Error) -> FetchError {
        let error_kind = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connect"
        } else if err.is_request() {
            "request"
        } else {
            "unknown"
        };
        tracing::warn!(
            locator = %locator,
            error = %err,
            error_kind = error_kind,
            "File fetch failed"
        );
        if err.is_timeout() {
            FetchError::Timeout {
                locator: locator.to_string(),
                timeout_ms: self.timeout_ms,
            }
        } else {
            FetchError::Transport {
                locator: locator.to_string(),
                cause: format!("{error_kind} error: {err}"),
            }
        }
    }
}

impl ByteSource for HttpByteSource {
    #[instrument(skip(self), fields(operation = "fetch_http"))]
    fn fetch_bytes(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        let start = Instant::now();
        let response = self
            .client
            .get(locator)
            .send()
            .map_err(|e| self.classify(locator, &e))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(locator = %locator, status = %status, "File fetch returned error status");
            return Err(FetchError::Status {
                locator: locator.to_string(),
                status: status.as_u16(),
            });
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes)
        {
            return Err(FetchError::TooLarge {
                locator: locator.to_string(),
                limit: self.max_bytes,
            });
        }

        let mut bytes = Vec::new();
        response
            .take(self.max_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(|e| {
                let timed_out = e.kind() == std::io::ErrorKind::TimedOut
                    || e.get_ref()
                        .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
                        .is_some_and(reqwest::Error::is_timeout);
                if timed_out {
                    FetchError::Timeout {
                        locator: locator.to_string(),
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    FetchError::Transport {
                        locator: locator.to_string(),
                        cause: format!("body read error: {e}"),
                    }
                }
            })?;

        if bytes.len() as u64 > self.max_bytes {
            return Err(FetchError::TooLarge {
                locator: locator.to_string(),
                limit: self.max_bytes,
            });
        }

        metrics::histogram!("dupcheck_fetch_duration_ms", "source" => "http")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::debug!(locator = %locator, bytes = bytes.len(), "Fetched file over HTTP");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::LocatorByteSource;
    use std::io::Write;
    use std::net::TcpListener;
    use std::thread;

    /// Serves one canned HTTP response on a local port and returns its URL.
    fn serve_once(response: &'static [u8], delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 4096];
                let _ = stream.read(&mut buf);
                thread::sleep(delay);
                let _ = stream.write_all(response);
                let _ = stream.flush();
            }
        });
        format!("http://{addr}/file.bin")
    }

    #[test]
    fn test_fetch_success() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
            Duration::ZERO,
        );
        let source = HttpByteSource::new(&FetchConfig::default()).unwrap();
        assert_eq!(source.fetch_bytes(&url).unwrap(), b"hello");
    }

    #[test]
    fn test_fetch_error_status() {
        let url = serve_once(
            b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            Duration::ZERO,
        );
        let source = HttpByteSource::new(&FetchConfig::default()).unwrap();
        let err = source.fetch_bytes(&url).unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[test]
    fn test_fetch_timeout() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\nConnection: close\r\n\r\nx",
            Duration::from_millis(1_500),
        );
        let config = FetchConfig::default().with_timeout(Duration::from_millis(200));
        let source = HttpByteSource::new(&config).unwrap();
        let err = source.fetch_bytes(&url).unwrap_err();
        assert!(matches!(err, FetchError::Timeout { timeout_ms: 200, .. }));
    }

    #[test]
    fn test_fetch_too_large() {
        let url = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\nConnection: close\r\n\r\n0123456789",
            Duration::ZERO,
        );
        let config = FetchConfig::default().with_max_bytes(4);
        let source = HttpByteSource::new(&config).unwrap();
        let err = source.fetch_bytes(&url).unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 4, .. }));
    }

    #[test]
    fn test_invalid_client_config_is_an_error() {
        let config = FetchConfig {
            user_agent: "dupcheck\nbroken".to_string(),
            ..FetchConfig::default()
        };
        let err = HttpByteSource::new(&config).err().unwrap();
        assert!(matches!(err, FetchError::ClientInit(_)));
        assert_eq!(err.kind(), "client_init");
        assert!(LocatorByteSource::new(&config).is_err());
    }

    #[test]
    fn test_fetch_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let source = HttpByteSource::new(&FetchConfig::default()).unwrap();
        let err = source.fetch_bytes(&format!("http://{addr}/gone")).unwrap_err();
        assert!(matches!(err, FetchError::Transport { .. }));
    }
}
