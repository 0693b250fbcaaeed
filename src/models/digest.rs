//! File digest value type and its string encodings.

use serde::{Deserialize, Serialize};

/// Size in bytes of a fuzzy digest chunk.
pub const FUZZY_CHUNK_SIZE: usize = 4096;

/// Length in hex characters of a single fuzzy digest token.
pub const FUZZY_TOKEN_LEN: usize = 8;

/// Separator between fuzzy digest tokens. Never appears inside a token.
pub const FUZZY_SEPARATOR: char = ':';

/// Digests of a file's content.
///
/// Computed once by the digest calculator and never mutated afterwards.
///
/// # Example
///
/// ```rust
/// use dupcheck::compute_digest;
///
/// let digest = compute_digest(&[7u8; 10_000]);
/// assert_eq!(digest.exact_digest.len(), 64);
/// assert_eq!(digest.token_count(), 3);
/// assert_eq!(digest.byte_length, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileDigest {
    /// Lowercase hex SHA-256 of the full content.
    pub exact_digest: String,

    /// Colon-joined per-chunk tokens, in chunk order.
    ///
    /// Empty only when the content is empty.
    pub fuzzy_digest: String,

    /// Total number of bytes hashed.
    pub byte_length: u64,
}

impl FileDigest {
    /// Iterates the fuzzy digest tokens in chunk order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        fuzzy_tokens(&self.fuzzy_digest)
    }

    /// Number of fuzzy digest tokens.
    ///
    /// Equals `ceil(byte_length / 4096)`.
    #[must_use]
    pub fn token_count(&self) -> usize {
        fuzzy_token_count(&self.fuzzy_digest)
    }

    /// Returns true if no bytes were hashed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.byte_length == 0
    }
}

/// Splits an encoded fuzzy digest into its tokens.
///
/// An empty digest yields no tokens.
pub(crate) fn fuzzy_tokens(fuzzy: &str) -> impl Iterator<Item = &str> {
    fuzzy
        .split(FUZZY_SEPARATOR)
        .filter(move |_| !fuzzy.is_empty())
}

/// Counts the tokens of an encoded fuzzy digest.
pub(crate) fn fuzzy_token_count(fuzzy: &str) -> usize {
    if fuzzy.is_empty() {
        0
    } else {
        fuzzy.matches(FUZZY_SEPARATOR).count() + 1
    }
}
