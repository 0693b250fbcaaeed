//! Corpus store trait.
//!
//! The corpus store persists the digests of accepted resources and answers
//! the duplicate checker's lookups.
//!
//! # Available Implementations
//!
//! | Backend | Use Case | Scan Order |
//! |---------|----------|------------|
//! | `InMemoryCorpus` | Tests; embedding | Insertion order |
//! | `SqliteCorpus` | Default; embedded | `rowid` (insertion order) |
//!
//! # Consistency
//!
//! The checker reads the corpus without locks or transactions. Two
//! concurrent uploads of the same new file can both pass the check and both
//! be stored. `SqliteCorpus` can enforce a unique `exact_digest` index as a
//! backstop, in which case the second write fails with
//! [`crate::Error::Conflict`].

use crate::Result;
use crate::models::{CorpusEntry, EntryId, FileDigest};

/// Inclusive token-count bounds for fuzzy scan candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenCountRange {
    /// Smallest accepted token count.
    pub min: usize,
    /// Largest accepted token count.
    pub max: usize,
}

impl TokenCountRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    /// Returns true if `count` lies within the range.
    #[must_use]
    pub const fn contains(&self, count: usize) -> bool {
        count >= self.min && count <= self.max
    }
}

/// Trait for corpus stores.
///
/// # Implementor Notes
///
/// - Methods use `&self` to enable sharing via `Arc<dyn CorpusStore>`
/// - Use interior mutability (e.g., `Mutex<Connection>`) for mutable state
/// - Listing methods must return entries in a stable order; the checker
///   reports the first qualifying entry in that order
/// - `exclude` must never appear in any lookup result
pub trait CorpusStore: Send + Sync {
    /// Finds an entry whose exact digest equals `exact_digest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be queried.
    fn find_by_exact_digest(
        &self,
        exact_digest: &str,
        exclude: Option<&EntryId>,
    ) -> Result<Option<CorpusEntry>>;

    /// Lists every entry that has a fuzzy digest, in corpus order.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be queried.
    fn list_entries_with_fuzzy_digest(&self, exclude: Option<&EntryId>)
    -> Result<Vec<CorpusEntry>>;

    /// Stores `digest` for `entry_id`, replacing any digest already stored
    /// for that entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails, or [`crate::Error::Conflict`]
    /// if a uniqueness constraint rejects it.
    fn store_digest(&self, entry_id: &EntryId, digest: &FileDigest) -> Result<()>;

    /// Retrieves an entry by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be queried.
    fn get(&self, entry_id: &EntryId) -> Result<Option<CorpusEntry>>;

    /// Returns the number of stored entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be queried.
    fn count(&self) -> Result<usize>;

    /// Lists fuzzy scan candidates whose token count lies in `range`, in
    /// corpus order.
    ///
    /// The default filters [`list_entries_with_fuzzy_digest`](Self::list_entries_with_fuzzy_digest);
    /// stores with an index on token count should override it.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying storage cannot be queried.
    fn list_fuzzy_candidates(
        &self,
        exclude: Option<&EntryId>,
        range: TokenCountRange,
    ) -> Result<Vec<CorpusEntry>> {
        Ok(self
            .list_entries_with_fuzzy_digest(exclude)?
            .into_iter()
            .filter(|entry| range.contains(entry.token_count()))
            .collect())
    }
}
