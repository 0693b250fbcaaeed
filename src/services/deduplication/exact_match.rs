//! Exact match layer.
//!
//! Detects byte-identical files by looking up the SHA-256 digest in the
//! corpus.

use crate::Result;
use crate::models::{EntryId, FileDigest};
use crate::storage::traits::CorpusStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

/// Checker for byte-identical files via SHA-256 digest lookup.
///
/// # Example
///
/// ```rust
/// use dupcheck::services::deduplication::{ExactMatchChecker, compute_digest};
/// use dupcheck::storage::{CorpusStore, InMemoryCorpus};
/// use dupcheck::EntryId;
/// use std::sync::Arc;
///
/// let corpus = Arc::new(InMemoryCorpus::new());
/// let digest = compute_digest(b"quarterly report");
/// corpus.store_digest(&EntryId::new("doc-1"), &digest).unwrap();
///
/// let checker = ExactMatchChecker::new(corpus);
/// assert_eq!(checker.check(&digest, None).unwrap(), Some(EntryId::new("doc-1")));
/// ```
pub struct ExactMatchChecker<C: CorpusStore> {
    corpus: Arc<C>,
}

impl<C: CorpusStore> ExactMatchChecker<C> {
    /// Creates a new exact match checker.
    #[must_use]
    pub const fn new(corpus: Arc<C>) -> Self {
        Self { corpus }
    }

    /// Returns the ID of a corpus entry with the same exact digest.
    ///
    /// `exclude` is never returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the corpus query fails.
    #[instrument(
        skip(self, digest),
        fields(
            operation = "exact_match_check",
            byte_length = digest.byte_length
        )
    )]
    #[allow(clippy::cast_precision_loss)] // Precision loss acceptable for duration metrics
    pub fn check(&self, digest: &FileDigest, exclude: Option<&EntryId>) -> Result<Option<EntryId>> {
        let start = Instant::now();

        let hit = self
            .corpus
            .find_by_exact_digest(&digest.exact_digest, exclude)?;

        let duration_ms = start.elapsed().as_millis();
        metrics::histogram!(
            "dupcheck_check_duration_ms",
            "layer" => "exact",
            "found" => if hit.is_some() { "true" } else { "false" }
        )
        .record(duration_ms as f64);

        match hit {
            Some(entry) => {
                tracing::debug!(
                    entry_id = %entry.id,
                    duration_ms = %duration_ms,
                    "Exact match found"
                );
                Ok(Some(entry.id))
            },
            None => {
                tracing::debug!(duration_ms = %duration_ms, "No exact match found");
                Ok(None)
            },
        }
    }
}
