//! Recording accepted uploads.
//!
//! The duplicate checker never writes to the corpus. Once the caller has
//! accepted a file it persists the digest computed during the check, so the
//! next upload of the same content is caught.

use crate::fetch::ByteSource;
use crate::models::EntryId;
use crate::services::deduplication::{DuplicateChecker, DuplicateVerdict};
use crate::storage::traits::CorpusStore;
use serde::Serialize;
use std::fmt;
use tracing::instrument;

/// What happened when recording an accepted upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceOutcome {
    /// The digest was stored for the entry.
    Stored,
    /// The store rejected the write; the upload stays accepted.
    StoreFailed,
    /// Nothing to store: the verdict was a duplicate or carried no digest.
    Skipped,
}

impl fmt::Display for AcceptanceOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored => write!(f, "stored"),
            Self::StoreFailed => write!(f, "store_failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Stores the digest of an accepted upload against `entry_id`.
///
/// Duplicates and verdicts without a digest (fetch failed, checking
/// disabled) are skipped. A failed write is logged and counted but never
/// propagated: losing a digest only weakens future checks.
#[instrument(skip(store, verdict), fields(operation = "record_acceptance", entry_id = %entry_id))]
pub fn record_acceptance<C: CorpusStore + ?Sized>(
    store: &C,
    entry_id: &EntryId,
    verdict: &DuplicateVerdict,
) -> AcceptanceOutcome {
    if verdict.is_duplicate {
        tracing::debug!("Verdict is a duplicate, nothing to record");
        return AcceptanceOutcome::Skipped;
    }
    let Some(digest) = verdict.digest.as_ref() else {
        tracing::debug!("Verdict carries no digest, nothing to record");
        return AcceptanceOutcome::Skipped;
    };

    match store.store_digest(entry_id, digest) {
        Ok(()) => {
            tracing::debug!(byte_length = digest.byte_length, "Recorded digest for accepted upload");
            AcceptanceOutcome::Stored
        },
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Failed to store digest, upload stays accepted"
            );
            metrics::counter!("dupcheck_digest_store_failures_total").increment(1);
            AcceptanceOutcome::StoreFailed
        },
    }
}

/// Checks the file at `locator` and, when it is accepted, records its
/// digest under `entry_id`.
///
/// A disabled checker does not fetch, so the file is fetched and digested
/// here instead; otherwise every file accepted while checking is off would
/// stay invisible to later checks. A fail-open verdict is not retried.
#[instrument(
    skip(checker, store),
    fields(operation = "ingest", entry_id = %entry_id)
)]
pub fn ingest<S: ByteSource, C: CorpusStore>(
    checker: &DuplicateChecker<S, C>,
    store: &C,
    locator: &str,
    actor_id: &str,
    entry_id: &EntryId,
) -> (DuplicateVerdict, AcceptanceOutcome) {
    let mut verdict = checker.check(locator, actor_id, None);

    if !verdict.is_duplicate && verdict.digest.is_none() && !checker.is_enabled() {
        match checker.digest_locator(locator) {
            Ok(digest) => verdict = verdict.with_digest(digest),
            Err(e) => tracing::warn!(
                error = %e,
                "Failed to digest accepted file, it will not be recorded"
            ),
        }
    }

    let outcome = record_acceptance(store, entry_id, &verdict);
    (verdict, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FileByteSource;
    use crate::services::deduplication::{DeduplicationConfig, compute_digest};
    use crate::storage::{InMemoryCorpus, SqliteCorpus};
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn file_with(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn checker_for(
        store: &Arc<InMemoryCorpus>,
        enabled: bool,
    ) -> DuplicateChecker<FileByteSource, InMemoryCorpus> {
        DuplicateChecker::new(
            Arc::new(FileByteSource::default()),
            Arc::clone(store),
            DeduplicationConfig::default().with_enabled(enabled),
        )
    }

    #[test]
    fn test_stores_unique_verdict() {
        let store = InMemoryCorpus::new();
        let digest = compute_digest(b"accepted");
        let verdict = DuplicateVerdict::not_duplicate(1).with_digest(digest.clone());

        let outcome = record_acceptance(&store, &EntryId::new("new"), &verdict);
        assert_eq!(outcome, AcceptanceOutcome::Stored);
        let stored = store.get(&EntryId::new("new")).unwrap().unwrap();
        assert_eq!(stored.exact_digest, digest.exact_digest);
        assert_eq!(stored.fuzzy_digest.as_deref(), Some(digest.fuzzy_digest.as_str()));
    }

    #[test]
    fn test_skips_duplicate() {
        let store = InMemoryCorpus::new();
        let verdict = DuplicateVerdict::identical_file(EntryId::new("old"), 1)
            .with_digest(compute_digest(b"dup"));

        let outcome = record_acceptance(&store, &EntryId::new("new"), &verdict);
        assert_eq!(outcome, AcceptanceOutcome::Skipped);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_skips_without_digest() {
        let store = InMemoryCorpus::new();
        let verdict = DuplicateVerdict::check_failed(1);

        let outcome = record_acceptance(&store, &EntryId::new("new"), &verdict);
        assert_eq!(outcome, AcceptanceOutcome::Skipped);
    }

    #[test]
    fn test_store_failure_is_swallowed() {
        let store = SqliteCorpus::in_memory()
            .unwrap()
            .enforce_unique_exact_digest()
            .unwrap();
        let digest = compute_digest(b"same");
        store.store_digest(&EntryId::new("first"), &digest).unwrap();

        let verdict = DuplicateVerdict::not_duplicate(1).with_digest(digest);
        let outcome = record_acceptance(&store, &EntryId::new("second"), &verdict);
        assert_eq!(outcome, AcceptanceOutcome::StoreFailed);
        assert_eq!(outcome.to_string(), "store_failed");
    }

    #[test]
    fn test_ingest_stores_unique_file() {
        let store = Arc::new(InMemoryCorpus::new());
        let file = file_with(b"first upload");
        let locator = file.path().to_string_lossy().to_string();

        let (verdict, outcome) =
            ingest(&checker_for(&store, true), store.as_ref(), &locator, "user-1", &EntryId::new("one"));
        assert!(!verdict.is_duplicate);
        assert_eq!(outcome, AcceptanceOutcome::Stored);

        let (verdict, outcome) =
            ingest(&checker_for(&store, true), store.as_ref(), &locator, "user-1", &EntryId::new("two"));
        assert_eq!(verdict.matched_entry_id, Some(EntryId::new("one")));
        assert_eq!(outcome, AcceptanceOutcome::Skipped);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_ingest_records_while_checking_disabled() {
        let store = Arc::new(InMemoryCorpus::new());
        let file = file_with(b"accepted while checks were off");
        let locator = file.path().to_string_lossy().to_string();

        let (verdict, outcome) =
            ingest(&checker_for(&store, false), store.as_ref(), &locator, "user-1", &EntryId::new("off"));
        assert!(!verdict.is_duplicate);
        assert!(verdict.digest.is_some());
        assert_eq!(outcome, AcceptanceOutcome::Stored);
        assert_eq!(store.count().unwrap(), 1);

        let verdict = checker_for(&store, true).check(&locator, "user-2", None);
        assert!(verdict.is_duplicate);
        assert_eq!(verdict.matched_entry_id, Some(EntryId::new("off")));
    }

    #[test]
    fn test_ingest_does_not_record_unreadable_file() {
        let store = Arc::new(InMemoryCorpus::new());
        let dir = tempfile::TempDir::new().unwrap();
        let locator = dir.path().join("missing.bin").to_string_lossy().to_string();

        for enabled in [true, false] {
            let (_, outcome) = ingest(
                &checker_for(&store, enabled),
                store.as_ref(),
                &locator,
                "user-1",
                &EntryId::new("gone"),
            );
            assert_eq!(outcome, AcceptanceOutcome::Skipped);
        }
        assert_eq!(store.count().unwrap(), 0);
    }
}
