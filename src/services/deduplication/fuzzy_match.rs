//! Fuzzy match layer.
//!
//! Scans corpus entries that carry a fuzzy digest, in corpus order, and
//! reports the first one whose similarity reaches the threshold.

use crate::models::{EntryId, FileDigest};
use crate::storage::traits::{CorpusStore, TokenCountRange};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

use super::config::DeduplicationConfig;
use super::similarity::{comparable_token_range, similarity};

/// A corpus entry that reached the similarity threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    /// The matched entry.
    pub entry_id: EntryId,
    /// Similarity score (0 to 100).
    pub score: u8,
}

/// Checker for near-identical files via fuzzy digest comparison.
///
/// The scan is earliest-match: the first entry at or above the threshold
/// wins even if a later entry would score higher.
///
/// With a non-zero threshold the scan skips work that cannot change the
/// outcome: an empty candidate digest scores 0 against everything, and with
/// the token-count pre-filter enabled only entries inside
/// [`comparable_token_range`] are requested from the store.
pub struct FuzzyMatchChecker<C: CorpusStore> {
    corpus: Arc<C>,
    config: DeduplicationConfig,
}

impl<C: CorpusStore> FuzzyMatchChecker<C> {
    /// Creates a new fuzzy match checker.
    #[must_use]
    pub fn new(corpus: Arc<C>, config: &DeduplicationConfig) -> Self {
        Self {
            corpus,
            config: config.clone(),
        }
    }

    /// Returns the first corpus entry similar enough to `digest`.
    ///
    /// `exclude` is never returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the corpus query fails, or [`Error::Timeout`] if
    /// the scan deadline passes before the scan finishes.
    #[instrument(
        skip(self, digest),
        fields(
            operation = "fuzzy_match_check",
            token_count = digest.token_count(),
            threshold = self.config.similarity_threshold
        )
    )]
    #[allow(clippy::cast_precision_loss)] // Precision loss acceptable for duration metrics
    pub fn check(&self, digest: &FileDigest, exclude: Option<&EntryId>) -> Result<Option<FuzzyMatch>> {
        let start = Instant::now();
        let token_count = digest.token_count();

        let candidates = if self.config.similarity_threshold == 0 {
            self.corpus.list_entries_with_fuzzy_digest(exclude)?
        } else {
            let Some((min, max)) = comparable_token_range(token_count) else {
                tracing::debug!("Empty fuzzy digest, skipping corpus scan");
                return Ok(None);
            };
            if self.config.prefilter_by_token_count {
                self.corpus
                    .list_fuzzy_candidates(exclude, TokenCountRange::new(min, max))?
            } else {
                self.corpus.list_entries_with_fuzzy_digest(exclude)?
            }
        };

        tracing::debug!(candidates = candidates.len(), "Scanning corpus");

        let mut compared = 0usize;
        let mut found = None;
        for entry in candidates {
            if let Some(deadline) = self.config.scan_timeout {
                let elapsed = start.elapsed();
                if elapsed >= deadline {
                    tracing::warn!(
                        compared = compared,
                        elapsed_ms = elapsed.as_millis(),
                        "Fuzzy scan deadline exceeded"
                    );
                    return Err(Error::Timeout {
                        operation: "fuzzy_match_check".to_string(),
                        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    });
                }
            }

            let Some(stored) = entry.fuzzy_digest.as_deref() else {
                continue;
            };
            compared += 1;
            let score = similarity(&digest.fuzzy_digest, stored);
            if self.config.is_similar(score) {
                found = Some(FuzzyMatch {
                    entry_id: entry.id,
                    score,
                });
                break;
            }
        }

        let duration_ms = start.elapsed().as_millis();
        metrics::histogram!(
            "dupcheck_check_duration_ms",
            "layer" => "fuzzy",
            "found" => if found.is_some() { "true" } else { "false" }
        )
        .record(duration_ms as f64);
        metrics::histogram!("dupcheck_fuzzy_candidates_compared").record(compared as f64);

        match &found {
            Some(hit) => tracing::debug!(
                entry_id = %hit.entry_id,
                score = hit.score,
                compared = compared,
                duration_ms = %duration_ms,
                "Fuzzy match found"
            ),
            None => tracing::debug!(
                compared = compared,
                duration_ms = %duration_ms,
                "No fuzzy match above threshold"
            ),
        }

        Ok(found)
    }
}
