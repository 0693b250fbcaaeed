//! Local file byte source.

use super::{ByteSource, FetchError};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::instrument;

/// Reads file bytes from the local filesystem.
///
/// Accepts plain paths and `file://` URLs.
pub struct FileByteSource {
    max_bytes: u64,
}

impl FileByteSource {
    /// Creates a source that refuses files larger than `max_bytes`.
    #[must_use]
    pub const fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }
}

impl Default for FileByteSource {
    fn default() -> Self {
        Self::new(super::DEFAULT_MAX_BYTES)
    }
}

impl ByteSource for FileByteSource {
    #[instrument(skip(self), fields(operation = "fetch_file"))]
    fn fetch_bytes(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        let path = Path::new(locator.strip_prefix("file://").unwrap_or(locator));
        let io_err = |source| FetchError::Io {
            locator: locator.to_string(),
            source,
        };

        let file = File::open(path).map_err(io_err)?;
        let len = file.metadata().map_err(io_err)?.len();
        if len > self.max_bytes {
            return Err(FetchError::TooLarge {
                locator: locator.to_string(),
                limit: self.max_bytes,
            });
        }

        let mut bytes = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
        file.take(self.max_bytes.saturating_add(1))
            .read_to_end(&mut bytes)
            .map_err(io_err)?;
        if bytes.len() as u64 > self.max_bytes {
            return Err(FetchError::TooLarge {
                locator: locator.to_string(),
                limit: self.max_bytes,
            });
        }

        tracing::debug!(locator = %locator, bytes = bytes.len(), "Read local file");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3]).unwrap();

        let source = FileByteSource::default();
        let bytes = source.fetch_bytes(file.path().to_str().unwrap()).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let source = FileByteSource::default();
        assert!(source.fetch_bytes(file.path().to_str().unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.bin");

        let source = FileByteSource::default();
        let err = source.fetch_bytes(path.to_str().unwrap()).unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
        assert_eq!(err.kind(), "io");
    }

    #[test]
    fn test_size_limit() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 32]).unwrap();

        let source = FileByteSource::new(16);
        let err = source.fetch_bytes(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, FetchError::TooLarge { limit: 16, .. }));
    }
}
