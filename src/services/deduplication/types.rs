//! Duplicate check result types.
//!
//! This module defines the verdict returned by a duplicate check.

use crate::models::{EntryId, FileDigest};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of a duplicate check.
///
/// Built fresh for every check and never persisted by the checker.
///
/// # Example
///
/// ```rust
/// use dupcheck::services::deduplication::{DuplicateReason, DuplicateVerdict};
/// use dupcheck::EntryId;
///
/// let verdict = DuplicateVerdict::similar_file(EntryId::new("doc-7"), 91, 12);
///
/// assert!(verdict.is_duplicate);
/// assert_eq!(verdict.similarity_score, Some(91));
/// assert_eq!(verdict.reason, Some(DuplicateReason::SimilarFile { score: 91 }));
/// assert_eq!(verdict.reason_text().as_deref(), Some("similar file (91% match)"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateVerdict {
    /// Whether the file is a duplicate.
    pub is_duplicate: bool,

    /// Why the file was flagged, or why the check could not run.
    pub reason: Option<DuplicateReason>,

    /// The corpus entry the file matched.
    pub matched_entry_id: Option<EntryId>,

    /// Fuzzy similarity score (0 to 100).
    ///
    /// Set for fuzzy matches and for completed checks with no match (0).
    pub similarity_score: Option<u8>,

    /// Duration of the check in milliseconds.
    pub check_duration_ms: u64,

    /// Digest computed during the check.
    ///
    /// Lets the caller persist the digest after accepting the file without
    /// hashing it again. `None` when the bytes could not be fetched.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub digest: Option<FileDigest>,
}

impl DuplicateVerdict {
    /// Creates a verdict for a completed check that found no duplicate.
    #[must_use]
    pub const fn not_duplicate(duration_ms: u64) -> Self {
        Self {
            is_duplicate: false,
            reason: None,
            matched_entry_id: None,
            similarity_score: Some(0),
            check_duration_ms: duration_ms,
            digest: None,
        }
    }

    /// Creates a verdict for a byte-identical match.
    #[must_use]
    pub const fn identical_file(entry_id: EntryId, duration_ms: u64) -> Self {
        Self {
            is_duplicate: true,
            reason: Some(DuplicateReason::IdenticalFile),
            matched_entry_id: Some(entry_id),
            similarity_score: None,
            check_duration_ms: duration_ms,
            digest: None,
        }
    }

    /// Creates a verdict for a fuzzy match at `score` percent.
    #[must_use]
    pub const fn similar_file(entry_id: EntryId, score: u8, duration_ms: u64) -> Self {
        Self {
            is_duplicate: true,
            reason: Some(DuplicateReason::SimilarFile { score }),
            matched_entry_id: Some(entry_id),
            similarity_score: Some(score),
            check_duration_ms: duration_ms,
            digest: None,
        }
    }

    /// Creates a fail-open verdict: the check could not complete, so the
    /// file is allowed through.
    #[must_use]
    pub const fn check_failed(duration_ms: u64) -> Self {
        Self {
            is_duplicate: false,
            reason: Some(DuplicateReason::CheckFailed),
            matched_entry_id: None,
            similarity_score: None,
            check_duration_ms: duration_ms,
            digest: None,
        }
    }

    /// Creates a verdict for a check skipped because deduplication is disabled.
    #[must_use]
    pub const fn skipped(duration_ms: u64) -> Self {
        Self {
            is_duplicate: false,
            reason: None,
            matched_entry_id: None,
            similarity_score: None,
            check_duration_ms: duration_ms,
            digest: None,
        }
    }

    /// Attaches the digest computed during the check.
    #[must_use]
    pub fn with_digest(mut self, digest: FileDigest) -> Self {
        self.digest = Some(digest);
        self
    }

    /// Human-readable reason, as shown to the uploader.
    #[must_use]
    pub fn reason_text(&self) -> Option<String> {
        self.reason.map(|r| r.to_string())
    }

    /// Returns true if this verdict came from the fail-open path.
    #[must_use]
    pub const fn failed_open(&self) -> bool {
        matches!(self.reason, Some(DuplicateReason::CheckFailed))
    }
}

impl Default for DuplicateVerdict {
    fn default() -> Self {
        Self::not_duplicate(0)
    }
}

/// Why a verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DuplicateReason {
    /// Exact digest matches a corpus entry.
    IdenticalFile,

    /// Fuzzy digest similarity reached the threshold.
    SimilarFile {
        /// Similarity score (0 to 100).
        score: u8,
    },

    /// The check failed and the upload is allowed.
    CheckFailed,
}

impl fmt::Display for DuplicateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdenticalFile => write!(f, "identical file"),
            Self::SimilarFile { score } => write!(f, "similar file ({score}% match)"),
            Self::CheckFailed => write!(f, "duplicate check failed - allowing upload"),
        }
    }
}

/// Trait for duplicate checking.
///
/// Allows for different implementations (e.g., mock for testing).
pub trait Deduplicator: Send + Sync {
    /// Checks whether the file at `locator` duplicates a corpus entry.
    ///
    /// `exclude` names an entry that must never be reported, used when
    /// re-checking a resource that is already in the corpus.
    fn check_duplicate(
        &self,
        locator: &str,
        actor_id: &str,
        exclude: Option<&EntryId>,
    ) -> DuplicateVerdict;
}
