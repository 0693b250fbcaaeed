//! Duplicate checker orchestrator.
//!
//! Runs one check as a fixed sequence of states:
//! 1. **Fetch**: read the file bytes and compute the [`FileDigest`]
//! 2. **Exact match**: SHA-256 digest lookup
//! 3. **Fuzzy match**: earliest corpus entry at or above the threshold
//!
//! Evaluation short-circuits on the first match. Any fetch or corpus failure
//! ends the check in the fail-open state: the file is reported as not a
//! duplicate with reason [`DuplicateReason::CheckFailed`].

use crate::fetch::ByteSource;
use crate::models::{EntryId, FileDigest};
use crate::storage::traits::CorpusStore;
use crate::Error;
use std::sync::Arc;
use std::time::Instant;
use tracing::instrument;

use super::config::DeduplicationConfig;
use super::exact_match::ExactMatchChecker;
use super::fuzzy_match::FuzzyMatchChecker;
use super::hasher::compute_digest;
use super::types::{Deduplicator, DuplicateReason, DuplicateVerdict};

/// Service for duplicate checking.
///
/// Stateless between checks; share it behind an [`Arc`] to run checks
/// concurrently.
///
/// # Example
///
/// ```rust
/// use dupcheck::fetch::FileByteSource;
/// use dupcheck::services::deduplication::{DeduplicationConfig, DuplicateChecker};
/// use dupcheck::storage::InMemoryCorpus;
/// use std::sync::Arc;
///
/// let checker = DuplicateChecker::new(
///     Arc::new(FileByteSource::default()),
///     Arc::new(InMemoryCorpus::new()),
///     DeduplicationConfig::default(),
/// );
///
/// let verdict = checker.check_bytes(b"fresh upload", "user-42", None);
/// assert!(!verdict.is_duplicate);
/// assert_eq!(verdict.similarity_score, Some(0));
/// ```
pub struct DuplicateChecker<S: ByteSource, C: CorpusStore> {
    config: DeduplicationConfig,
    source: Arc<S>,
    exact_match: ExactMatchChecker<C>,
    fuzzy_match: FuzzyMatchChecker<C>,
}

impl<S: ByteSource, C: CorpusStore> DuplicateChecker<S, C> {
    /// Creates a new duplicate checker.
    #[must_use]
    pub fn new(source: Arc<S>, corpus: Arc<C>, config: DeduplicationConfig) -> Self {
        let exact_match = ExactMatchChecker::new(Arc::clone(&corpus));
        let fuzzy_match = FuzzyMatchChecker::new(corpus, &config);

        Self {
            config,
            source,
            exact_match,
            fuzzy_match,
        }
    }

    /// Checks whether the file at `locator` duplicates a corpus entry.
    ///
    /// `actor_id` identifies the uploader for tracing only. `exclude` names
    /// an entry that must never be reported, used when re-checking a
    /// resource that is already in the corpus.
    ///
    /// Never fails: infrastructure errors produce a fail-open verdict.
    #[instrument(
        skip(self, locator, actor_id),
        fields(
            operation = "dedup_check",
            locator = %locator,
            actor_id = %actor_id,
            byte_length = tracing::field::Empty
        )
    )]
    pub fn check(&self, locator: &str, actor_id: &str, exclude: Option<&EntryId>) -> DuplicateVerdict {
        let start = Instant::now();

        if !self.config.enabled {
            tracing::debug!("Duplicate checking disabled, skipping check");
            return self.finish(DuplicateVerdict::skipped(elapsed_ms(start)), "skipped");
        }

        let bytes = match self.source.fetch_bytes(locator) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    error_kind = e.kind(),
                    "File fetch failed, allowing upload"
                );
                return self.fail_open("fetch", start);
            },
        };
        tracing::Span::current().record("byte_length", bytes.len());

        let digest = compute_digest(&bytes);
        drop(bytes);
        self.run_layers(digest, exclude, start)
    }

    /// Checks already-fetched file bytes.
    ///
    /// When checking is disabled the verdict is skipped but still carries
    /// the digest, so the caller can record the accepted file.
    #[instrument(
        skip(self, bytes, actor_id),
        fields(
            operation = "dedup_check_bytes",
            actor_id = %actor_id,
            byte_length = bytes.len()
        )
    )]
    pub fn check_bytes(
        &self,
        bytes: &[u8],
        actor_id: &str,
        exclude: Option<&EntryId>,
    ) -> DuplicateVerdict {
        let start = Instant::now();
        let digest = compute_digest(bytes);
        if !self.config.enabled {
            return self
                .finish(DuplicateVerdict::skipped(elapsed_ms(start)), "skipped")
                .with_digest(digest);
        }
        self.run_layers(digest, exclude, start)
    }

    /// Checks a precomputed digest.
    ///
    /// When checking is disabled the verdict is skipped but still carries
    /// the digest.
    #[instrument(
        skip(self, digest, actor_id),
        fields(
            operation = "dedup_check_digest",
            actor_id = %actor_id,
            byte_length = digest.byte_length
        )
    )]
    pub fn check_digest(
        &self,
        digest: &FileDigest,
        actor_id: &str,
        exclude: Option<&EntryId>,
    ) -> DuplicateVerdict {
        let start = Instant::now();
        if !self.config.enabled {
            return self
                .finish(DuplicateVerdict::skipped(elapsed_ms(start)), "skipped")
                .with_digest(digest.clone());
        }
        self.run_layers(digest.clone(), exclude, start)
    }

    /// Fetches the file at `locator` and computes its digest without
    /// consulting the corpus.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] if the byte source cannot deliver the file.
    #[instrument(skip(self), fields(operation = "digest_locator"))]
    pub fn digest_locator(&self, locator: &str) -> crate::Result<FileDigest> {
        let bytes = self.source.fetch_bytes(locator)?;
        Ok(compute_digest(&bytes))
    }

    /// Returns true if duplicate checking is enabled.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &DeduplicationConfig {
        &self.config
    }

    fn run_layers(
        &self,
        digest: FileDigest,
        exclude: Option<&EntryId>,
        start: Instant,
    ) -> DuplicateVerdict {
        if let Some(verdict) = self.check_exact_match(&digest, exclude, start) {
            return verdict.with_digest(digest);
        }

        if let Some(verdict) = self.check_fuzzy_match(&digest, exclude, start) {
            return verdict.with_digest(digest);
        }

        let duration_ms = elapsed_ms(start);
        tracing::debug!(duration_ms = duration_ms, "No duplicate found");
        self.finish(DuplicateVerdict::not_duplicate(duration_ms), "unique")
            .with_digest(digest)
    }

    /// Runs the exact match layer. `None` means continue to the next layer.
    fn check_exact_match(
        &self,
        digest: &FileDigest,
        exclude: Option<&EntryId>,
        start: Instant,
    ) -> Option<DuplicateVerdict> {
        match self.exact_match.check(digest, exclude) {
            Ok(Some(entry_id)) => {
                tracing::info!(entry_id = %entry_id, "Identical file found");
                metrics::counter!("dupcheck_duplicates_total", "reason" => "identical").increment(1);
                let verdict = DuplicateVerdict::identical_file(entry_id, elapsed_ms(start));
                Some(self.finish(verdict, "duplicate"))
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Exact match lookup failed, allowing upload");
                Some(self.fail_open("corpus", start))
            },
        }
    }

    /// Runs the fuzzy match layer. `None` means no match.
    fn check_fuzzy_match(
        &self,
        digest: &FileDigest,
        exclude: Option<&EntryId>,
        start: Instant,
    ) -> Option<DuplicateVerdict> {
        match self.fuzzy_match.check(digest, exclude) {
            Ok(Some(hit)) => {
                tracing::info!(entry_id = %hit.entry_id, score = hit.score, "Similar file found");
                metrics::counter!("dupcheck_duplicates_total", "reason" => "similar").increment(1);
                let verdict = DuplicateVerdict::similar_file(hit.entry_id, hit.score, elapsed_ms(start));
                Some(self.finish(verdict, "duplicate"))
            },
            Ok(None) => None,
            Err(e @ Error::Timeout { .. }) => {
                tracing::warn!(error = %e, "Corpus scan timed out, allowing upload");
                Some(self.fail_open("timeout", start))
            },
            Err(e) => {
                tracing::warn!(error = %e, "Corpus scan failed, allowing upload");
                Some(self.fail_open("corpus", start))
            },
        }
    }

    fn fail_open(&self, cause: &'static str, start: Instant) -> DuplicateVerdict {
        metrics::counter!("dupcheck_fail_open_total", "cause" => cause).increment(1);
        self.finish(DuplicateVerdict::check_failed(elapsed_ms(start)), "failed_open")
    }

    /// Records final metrics for a check.
    #[allow(clippy::cast_precision_loss)]
    #[allow(clippy::unused_self)]
    fn finish(&self, verdict: DuplicateVerdict, result: &'static str) -> DuplicateVerdict {
        metrics::counter!("dupcheck_checks_total", "result" => result).increment(1);
        metrics::histogram!("dupcheck_check_duration_ms", "layer" => "total")
            .record(verdict.check_duration_ms as f64);
        verdict
    }
}

/// Implementation of the Deduplicator trait.
impl<S: ByteSource, C: CorpusStore> Deduplicator for DuplicateChecker<S, C> {
    fn check_duplicate(
        &self,
        locator: &str,
        actor_id: &str,
        exclude: Option<&EntryId>,
    ) -> DuplicateVerdict {
        self.check(locator, actor_id, exclude)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use crate::models::CorpusEntry;
    use crate::storage::InMemoryCorpus;
    use crate::storage::traits::TokenCountRange;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    /// Byte source backed by a map; unknown locators fail with a 404.
    #[derive(Default)]
    struct MapSource {
        files: HashMap<String, Vec<u8>>,
        fetches: AtomicUsize,
    }

    impl MapSource {
        fn with(files: &[(&str, Vec<u8>)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), v.clone()))
                    .collect(),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    impl ByteSource for MapSource {
        fn fetch_bytes(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.files.get(locator).cloned().ok_or_else(|| FetchError::Status {
                locator: locator.to_string(),
                status: 404,
            })
        }
    }

    /// Corpus whose every query fails.
    struct BrokenCorpus;

    impl CorpusStore for BrokenCorpus {
        fn find_by_exact_digest(&self, _: &str, _: Option<&EntryId>) -> crate::Result<Option<CorpusEntry>> {
            Err(Error::OperationFailed {
                operation: "find_by_exact_digest".to_string(),
                cause: "database is locked".to_string(),
            })
        }

        fn list_entries_with_fuzzy_digest(&self, _: Option<&EntryId>) -> crate::Result<Vec<CorpusEntry>> {
            Err(Error::OperationFailed {
                operation: "list_entries_with_fuzzy_digest".to_string(),
                cause: "database is locked".to_string(),
            })
        }

        fn store_digest(&self, _: &EntryId, _: &FileDigest) -> crate::Result<()> {
            Ok(())
        }

        fn get(&self, _: &EntryId) -> crate::Result<Option<CorpusEntry>> {
            Ok(None)
        }

        fn count(&self) -> crate::Result<usize> {
            Ok(0)
        }
    }

    /// Corpus where exact lookups work but the fuzzy listing fails.
    struct ScanFailsCorpus(InMemoryCorpus);

    impl CorpusStore for ScanFailsCorpus {
        fn find_by_exact_digest(&self, d: &str, e: Option<&EntryId>) -> crate::Result<Option<CorpusEntry>> {
            self.0.find_by_exact_digest(d, e)
        }

        fn list_entries_with_fuzzy_digest(&self, _: Option<&EntryId>) -> crate::Result<Vec<CorpusEntry>> {
            Err(Error::OperationFailed {
                operation: "list_entries_with_fuzzy_digest".to_string(),
                cause: "disk I/O error".to_string(),
            })
        }

        fn list_fuzzy_candidates(&self, e: Option<&EntryId>, _: TokenCountRange) -> crate::Result<Vec<CorpusEntry>> {
            self.list_entries_with_fuzzy_digest(e)
        }

        fn store_digest(&self, id: &EntryId, d: &FileDigest) -> crate::Result<()> {
            self.0.store_digest(id, d)
        }

        fn get(&self, id: &EntryId) -> crate::Result<Option<CorpusEntry>> {
            self.0.get(id)
        }

        fn count(&self) -> crate::Result<usize> {
            self.0.count()
        }
    }

    fn patterned(len: usize, seed: u8) -> Vec<u8> {
        (0..len)
            .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
            .collect()
    }

    fn checker_with_corpus(
        files: &[(&str, Vec<u8>)],
        corpus: Arc<InMemoryCorpus>,
    ) -> DuplicateChecker<MapSource, InMemoryCorpus> {
        DuplicateChecker::new(
            Arc::new(MapSource::with(files)),
            corpus,
            DeduplicationConfig::default(),
        )
    }

    #[test]
    fn test_unique_file() {
        let checker = checker_with_corpus(&[("new", patterned(9_000, 1))], Arc::new(InMemoryCorpus::new()));
        let verdict = checker.check("new", "user-1", None);

        assert!(!verdict.is_duplicate);
        assert!(verdict.reason.is_none());
        assert_eq!(verdict.similarity_score, Some(0));
        assert_eq!(verdict.digest.map(|d| d.byte_length), Some(9_000));
    }

    #[test]
    fn test_identical_file() {
        let bytes = patterned(10_000, 7);
        let corpus = Arc::new(InMemoryCorpus::new());
        corpus
            .store_digest(&EntryId::new("original"), &compute_digest(&bytes))
            .unwrap();

        let checker = checker_with_corpus(&[("upload", bytes)], corpus);
        let verdict = checker.check("upload", "user-1", None);

        assert!(verdict.is_duplicate);
        assert_eq!(verdict.reason, Some(DuplicateReason::IdenticalFile));
        assert_eq!(verdict.matched_entry_id, Some(EntryId::new("original")));
        assert!(verdict.similarity_score.is_none());
    }

    #[test]
    fn test_similar_file() {
        let original = patterned(5 * 4096, 3);
        let mut edited = original.clone();
        edited[4 * 4096 + 10] ^= 0xff;

        let corpus = Arc::new(InMemoryCorpus::new());
        corpus
            .store_digest(&EntryId::new("original"), &compute_digest(&original))
            .unwrap();

        let checker = checker_with_corpus(&[("edited", edited)], corpus);
        let verdict = checker.check("edited", "user-1", None);

        assert!(verdict.is_duplicate);
        assert_eq!(verdict.reason, Some(DuplicateReason::SimilarFile { score: 80 }));
        assert_eq!(verdict.similarity_score, Some(80));
        assert_eq!(verdict.reason_text().as_deref(), Some("similar file (80% match)"));
    }

    #[test]
    fn test_fetch_failure_fails_open() {
        let checker = checker_with_corpus(&[], Arc::new(InMemoryCorpus::new()));
        let verdict = checker.check("missing", "user-1", None);

        assert!(!verdict.is_duplicate);
        assert!(verdict.failed_open());
        assert!(verdict.digest.is_none());
        assert_eq!(
            verdict.reason_text().as_deref(),
            Some("duplicate check failed - allowing upload")
        );
    }

    #[test]
    fn test_corpus_failure_fails_open() {
        let checker = DuplicateChecker::new(
            Arc::new(MapSource::with(&[("f", b"bytes".to_vec())])),
            Arc::new(BrokenCorpus),
            DeduplicationConfig::default(),
        );
        let verdict = checker.check("f", "user-1", None);
        assert!(!verdict.is_duplicate);
        assert!(verdict.failed_open());
    }

    #[test]
    fn test_exact_match_survives_scan_failure() {
        let inner = InMemoryCorpus::new();
        inner
            .store_digest(&EntryId::new("dup"), &compute_digest(b"same bytes"))
            .unwrap();
        let checker = DuplicateChecker::new(
            Arc::new(MapSource::with(&[("f", b"same bytes".to_vec()), ("g", b"other".to_vec())])),
            Arc::new(ScanFailsCorpus(inner)),
            DeduplicationConfig::default(),
        );

        assert_eq!(
            checker.check("f", "user-1", None).reason,
            Some(DuplicateReason::IdenticalFile)
        );
        assert!(checker.check("g", "user-1", None).failed_open());
    }

    #[test]
    fn test_disabled_skips_fetch() {
        let source = Arc::new(MapSource::with(&[("f", b"bytes".to_vec())]));
        let checker = DuplicateChecker::new(
            Arc::clone(&source),
            Arc::new(InMemoryCorpus::new()),
            DeduplicationConfig::default().with_enabled(false),
        );

        let verdict = checker.check("f", "user-1", None);
        assert!(!verdict.is_duplicate);
        assert!(verdict.reason.is_none());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
        assert!(!checker.is_enabled());
    }

    #[test]
    fn test_disabled_keeps_digest_at_hand() {
        let bytes = patterned(5_000, 4);
        let corpus = Arc::new(InMemoryCorpus::new());
        corpus
            .store_digest(&EntryId::new("same"), &compute_digest(&bytes))
            .unwrap();
        let checker = DuplicateChecker::new(
            Arc::new(MapSource::default()),
            corpus,
            DeduplicationConfig::default().with_enabled(false),
        );

        let verdict = checker.check_bytes(&bytes, "user-1", None);
        assert!(!verdict.is_duplicate);
        assert!(verdict.similarity_score.is_none());
        assert_eq!(verdict.digest, Some(compute_digest(&bytes)));

        let verdict = checker.check_digest(&compute_digest(&bytes), "user-1", None);
        assert_eq!(verdict.digest.map(|d| d.byte_length), Some(5_000));
    }

    #[test]
    fn test_digest_locator() {
        let bytes = patterned(4_097, 8);
        let checker = checker_with_corpus(&[("f", bytes.clone())], Arc::new(InMemoryCorpus::new()));

        let digest = checker.digest_locator("f").unwrap();
        assert_eq!(digest, compute_digest(&bytes));
        assert_eq!(digest.token_count(), 2);

        let err = checker.digest_locator("missing").unwrap_err();
        assert!(matches!(err, Error::Fetch(FetchError::Status { status: 404, .. })));
    }

    #[test]
    fn test_exclude_own_entry() {
        let bytes = patterned(12_000, 9);
        let corpus = Arc::new(InMemoryCorpus::new());
        corpus
            .store_digest(&EntryId::new("self"), &compute_digest(&bytes))
            .unwrap();

        let checker = checker_with_corpus(&[("f", bytes)], corpus);
        let verdict = checker.check("f", "user-1", Some(&EntryId::new("self")));
        assert!(!verdict.is_duplicate);
        assert!(verdict.matched_entry_id.is_none());
    }

    #[test]
    fn test_check_digest_and_bytes_agree() {
        let bytes = patterned(6_000, 2);
        let corpus = Arc::new(InMemoryCorpus::new());
        corpus
            .store_digest(&EntryId::new("e"), &compute_digest(&bytes))
            .unwrap();
        let checker = checker_with_corpus(&[], corpus);

        let from_bytes = checker.check_bytes(&bytes, "user-1", None);
        let from_digest = checker.check_digest(&compute_digest(&bytes), "user-1", None);
        assert_eq!(from_bytes.matched_entry_id, from_digest.matched_entry_id);
        assert_eq!(from_bytes.reason, from_digest.reason);
    }

    #[test]
    fn test_concurrent_checks() {
        let corpus = Arc::new(InMemoryCorpus::new());
        corpus
            .store_digest(&EntryId::new("known"), &compute_digest(&patterned(8_192, 5)))
            .unwrap();
        let checker = Arc::new(checker_with_corpus(
            &[("known", patterned(8_192, 5)), ("fresh", patterned(8_192, 6))],
            corpus,
        ));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let checker = Arc::clone(&checker);
                thread::spawn(move || {
                    let locator = if i % 2 == 0 { "known" } else { "fresh" };
                    (i, checker.check(locator, "user", None))
                })
            })
            .collect();

        for handle in handles {
            let (i, verdict) = handle.join().unwrap();
            assert_eq!(verdict.is_duplicate, i % 2 == 0);
        }
    }
}
