//! In-memory corpus store.

use crate::models::{CorpusEntry, EntryId, FileDigest};
use crate::storage::traits::CorpusStore;
use crate::{Result, current_timestamp};
use std::sync::{PoisonError, RwLock};

/// Corpus store held in process memory.
///
/// Entries keep insertion order; storing a digest again for an existing
/// entry replaces it in place.
#[derive(Debug, Default)]
pub struct InMemoryCorpus {
    entries: RwLock<Vec<CorpusEntry>>,
}

impl InMemoryCorpus {
    /// Creates an empty corpus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a corpus pre-populated with `entries`, in order.
    #[must_use]
    pub fn with_entries(entries: Vec<CorpusEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Inserts a raw entry, e.g. one without a fuzzy digest.
    pub fn insert(&self, entry: CorpusEntry) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<CorpusEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_excluded(entry: &CorpusEntry, exclude: Option<&EntryId>) -> bool {
    exclude.is_none_or(|id| &entry.id != id)
}

impl CorpusStore for InMemoryCorpus {
    fn find_by_exact_digest(
        &self,
        exact_digest: &str,
        exclude: Option<&EntryId>,
    ) -> Result<Option<CorpusEntry>> {
        Ok(self
            .read()
            .iter()
            .find(|e| e.exact_digest == exact_digest && not_excluded(e, exclude))
            .cloned())
    }

    fn list_entries_with_fuzzy_digest(
        &self,
        exclude: Option<&EntryId>,
    ) -> Result<Vec<CorpusEntry>> {
        Ok(self
            .read()
            .iter()
            .filter(|e| e.fuzzy_digest.is_some() && not_excluded(e, exclude))
            .cloned()
            .collect())
    }

    fn store_digest(&self, entry_id: &EntryId, digest: &FileDigest) -> Result<()> {
        self.insert(CorpusEntry::from_digest(
            entry_id.clone(),
            digest,
            current_timestamp(),
        ));
        Ok(())
    }

    fn get(&self, entry_id: &EntryId) -> Result<Option<CorpusEntry>> {
        Ok(self.read().iter().find(|e| &e.id == entry_id).cloned())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.read().len())
    }
}
