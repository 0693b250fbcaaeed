//! Content digest calculation.
//!
//! Produces the exact SHA-256 digest and the chunked fuzzy digest of raw
//! bytes. Pure CPU work: no I/O except for [`DigestCalculator::compute_reader`],
//! which only reads from the reader it is given.

use crate::models::{FUZZY_CHUNK_SIZE, FUZZY_SEPARATOR, FileDigest};
use sha2::{Digest, Sha256};
use std::io::{self, Read};
use xxhash_rust::xxh3::xxh3_64;

/// Digest calculator for duplicate detection.
///
/// # Fuzzy digest
///
/// Content is split into consecutive 4096-byte chunks (the last one may be
/// shorter). Each chunk is hashed with XXH3-64 and the first 8 hex characters
/// of the hash become the chunk's token. Tokens are joined with `:` in chunk
/// order. A local edit therefore only changes the tokens of the chunks it
/// touches.
///
/// # Example
///
/// ```rust
/// use dupcheck::services::deduplication::DigestCalculator;
///
/// let digest = DigestCalculator::compute(b"hello world");
/// assert_eq!(digest.exact_digest.len(), 64); // SHA256 produces 64 hex chars
/// assert_eq!(digest.fuzzy_digest.len(), 8); // one chunk, one token
/// assert_eq!(digest.byte_length, 11);
/// ```
pub struct DigestCalculator;

impl DigestCalculator {
    /// Computes all digests of `bytes`.
    ///
    /// Empty input yields a zero byte length and an empty fuzzy digest.
    #[must_use]
    pub fn compute(bytes: &[u8]) -> FileDigest {
        let mut builder = DigestBuilder::new();
        builder.update(bytes);
        builder.finalize()
    }

    /// Computes all digests of a stream without buffering it whole.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by the reader.
    pub fn compute_reader<R: Read>(mut reader: R) -> io::Result<FileDigest> {
        let mut builder = DigestBuilder::new();
        let mut buffer = [0u8; 8192];
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            builder.update(&buffer[..read]);
        }
        Ok(builder.finalize())
    }

    /// Computes the lowercase hex SHA-256 of `bytes`.
    #[must_use]
    pub fn exact_digest(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Computes the encoded fuzzy digest of `bytes`.
    #[must_use]
    pub fn fuzzy_digest(bytes: &[u8]) -> String {
        let tokens: Vec<String> = bytes.chunks(FUZZY_CHUNK_SIZE).map(chunk_token).collect();
        tokens.join(&FUZZY_SEPARATOR.to_string())
    }
}

/// Computes all digests of `bytes`.
///
/// Shorthand for [`DigestCalculator::compute`].
#[must_use]
pub fn compute_digest(bytes: &[u8]) -> FileDigest {
    DigestCalculator::compute(bytes)
}

/// Incremental digest computation.
///
/// Produces the same [`FileDigest`] as [`DigestCalculator::compute`] no
/// matter how the input is split across [`update`](Self::update) calls.
pub struct DigestBuilder {
    sha: Sha256,
    pending: Vec<u8>,
    tokens: Vec<String>,
    byte_length: u64,
}

impl DigestBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sha: Sha256::new(),
            pending: Vec::with_capacity(FUZZY_CHUNK_SIZE),
            tokens: Vec::new(),
            byte_length: 0,
        }
    }

    /// Feeds more content.
    pub fn update(&mut self, mut bytes: &[u8]) {
        self.sha.update(bytes);
        self.byte_length += bytes.len() as u64;

        // Top up a partially filled chunk first.
        if !self.pending.is_empty() {
            let take = (FUZZY_CHUNK_SIZE - self.pending.len()).min(bytes.len());
            self.pending.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
            if self.pending.len() == FUZZY_CHUNK_SIZE {
                self.tokens.push(chunk_token(&self.pending));
                self.pending.clear();
            }
        }

        let mut chunks = bytes.chunks_exact(FUZZY_CHUNK_SIZE);
        for chunk in &mut chunks {
            self.tokens.push(chunk_token(chunk));
        }
        self.pending.extend_from_slice(chunks.remainder());
    }

    /// Finishes the computation.
    #[must_use]
    pub fn finalize(mut self) -> FileDigest {
        if !self.pending.is_empty() {
            self.tokens.push(chunk_token(&self.pending));
        }

        FileDigest {
            exact_digest: hex::encode(self.sha.finalize()),
            fuzzy_digest: self.tokens.join(&FUZZY_SEPARATOR.to_string()),
            byte_length: self.byte_length,
        }
    }
}

impl Default for DigestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Token for a single chunk: the top 32 bits of its XXH3-64 hash as 8 hex chars.
fn chunk_token(chunk: &[u8]) -> String {
    format!("{:08x}", xxh3_64(chunk) >> 32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FUZZY_TOKEN_LEN;
    use std::io::Cursor;

    fn patterned(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[test]
    fn test_exact_digest_produces_64_char_hex() {
        let hash = DigestCalculator::exact_digest(b"test content");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, hash.to_lowercase());
    }

    #[test]
    fn test_known_sha256_vector() {
        assert_eq!(
            DigestCalculator::exact_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            DigestCalculator::exact_digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_empty_content() {
        let digest = DigestCalculator::compute(&[]);
        assert_eq!(digest.byte_length, 0);
        assert_eq!(digest.fuzzy_digest, "");
        assert_eq!(digest.token_count(), 0);
        // Empty input still has a valid exact digest
        assert_eq!(digest.exact_digest.len(), 64);
    }

    #[test]
    fn test_ten_thousand_bytes_yield_three_tokens() {
        let digest = DigestCalculator::compute(&patterned(10_000));
        assert_eq!(digest.token_count(), 3);
        assert_eq!(digest.byte_length, 10_000);
    }

    #[test]
    fn test_chunk_boundaries() {
        assert_eq!(DigestCalculator::compute(&patterned(1)).token_count(), 1);
        assert_eq!(DigestCalculator::compute(&patterned(4096)).token_count(), 1);
        assert_eq!(DigestCalculator::compute(&patterned(4097)).token_count(), 2);
        assert_eq!(DigestCalculator::compute(&patterned(8192)).token_count(), 2);
    }

    #[test]
    fn test_tokens_are_short_hex() {
        let digest = DigestCalculator::compute(&patterned(20_000));
        for token in digest.tokens() {
            assert_eq!(token.len(), FUZZY_TOKEN_LEN);
            assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
            assert!(!token.contains(FUZZY_SEPARATOR));
        }
    }

    #[test]
    fn test_same_content_same_digest() {
        let bytes = patterned(12_345);
        assert_eq!(
            DigestCalculator::compute(&bytes),
            DigestCalculator::compute(&bytes)
        );
    }

    #[test]
    fn test_local_edit_changes_one_token() {
        let original = patterned(5 * FUZZY_CHUNK_SIZE);
        let mut edited = original.clone();
        edited[2 * FUZZY_CHUNK_SIZE + 10] ^= 0xff;

        let a = DigestCalculator::compute(&original);
        let b = DigestCalculator::compute(&edited);
        assert_ne!(a.exact_digest, b.exact_digest);

        let changed: Vec<usize> = a
            .tokens()
            .zip(b.tokens())
            .enumerate()
            .filter(|(_, (x, y))| x != y)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(changed, vec![2]);
    }

    #[test]
    fn test_fuzzy_digest_matches_builder() {
        let bytes = patterned(9_999);
        assert_eq!(
            DigestCalculator::fuzzy_digest(&bytes),
            DigestCalculator::compute(&bytes).fuzzy_digest
        );
    }

    #[test]
    fn test_builder_split_independent() {
        let bytes = patterned(3 * FUZZY_CHUNK_SIZE + 777);
        let whole = DigestCalculator::compute(&bytes);

        for split in [1, 100, 4095, 4096, 4097, 9000] {
            let mut builder = DigestBuilder::new();
            for piece in bytes.chunks(split) {
                builder.update(piece);
            }
            assert_eq!(builder.finalize(), whole, "split size {split}");
        }
    }

    #[test]
    fn test_compute_reader_matches_compute() {
        let bytes = patterned(50_000);
        let streamed = DigestCalculator::compute_reader(Cursor::new(&bytes)).unwrap();
        assert_eq!(streamed, DigestCalculator::compute(&bytes));
    }

    #[test]
    fn test_compute_digest_shorthand() {
        assert_eq!(compute_digest(b"abc"), DigestCalculator::compute(b"abc"));
    }
}
