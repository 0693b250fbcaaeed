//! Corpus entry types and identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::digest::{FileDigest, fuzzy_token_count};

/// Identifier of a stored resource in the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// Creates a new entry ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Parses a caller-supplied entry ID, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidInput`] if the ID is blank.
    pub fn parse(id: &str) -> crate::Result<Self> {
        let id = id.trim();
        if id.is_empty() {
            return Err(crate::Error::InvalidInput(
                "entry ID must not be empty".to_string(),
            ));
        }
        Ok(Self(id.to_string()))
    }

    /// Generates a fresh, time-ordered entry ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A previously accepted resource and its stored digests.
///
/// Owned by the corpus store; the duplicate checker only reads entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    /// Identifier of the stored resource.
    pub id: EntryId,
    /// Lowercase hex SHA-256 of the resource.
    pub exact_digest: String,
    /// Encoded fuzzy digest. Entries stored before fuzzy digests existed lack one.
    pub fuzzy_digest: Option<String>,
    /// Size of the resource in bytes.
    pub byte_length: u64,
    /// Store timestamp (Unix epoch seconds).
    pub stored_at: u64,
}

impl CorpusEntry {
    /// Builds an entry from a computed digest.
    #[must_use]
    pub fn from_digest(id: EntryId, digest: &FileDigest, stored_at: u64) -> Self {
        Self {
            id,
            exact_digest: digest.exact_digest.clone(),
            fuzzy_digest: Some(digest.fuzzy_digest.clone()),
            byte_length: digest.byte_length,
            stored_at,
        }
    }

    /// Number of fuzzy tokens, or 0 when no fuzzy digest is stored.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.fuzzy_digest.as_deref().map_or(0, fuzzy_token_count)
    }
}
