//! SQLite-backed corpus store.

use crate::models::{CorpusEntry, EntryId, FileDigest};
use crate::storage::traits::{CorpusStore, TokenCountRange};
use crate::{Error, Result, current_timestamp};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use super::connection::{acquire_lock, configure_connection};
use super::metrics::record_operation_metrics;

const ENTRY_COLUMNS: &str = "entry_id, exact_digest, fuzzy_digest, byte_length, stored_at";

/// Token count derived from a non-empty `fuzzy_digest`: `n` tokens of 8
/// hex chars joined by `n - 1` separators.
const TOKEN_COUNT_SQL: &str = "(length(fuzzy_digest) + 1) / 9";

/// SQLite-backed corpus store.
///
/// Entries are scanned in `rowid` order, which is insertion order; storing
/// a digest again for an existing entry updates it in place and keeps its
/// position.
///
/// # Example
///
/// ```rust
/// use dupcheck::storage::{CorpusStore, SqliteCorpus};
/// use dupcheck::{EntryId, compute_digest};
///
/// let corpus = SqliteCorpus::in_memory()?;
/// let digest = compute_digest(b"quarterly report");
/// corpus.store_digest(&EntryId::new("doc-1"), &digest)?;
///
/// let hit = corpus.find_by_exact_digest(&digest.exact_digest, None)?;
/// assert_eq!(hit.map(|e| e.id), Some(EntryId::new("doc-1")));
/// # Ok::<(), dupcheck::Error>(())
/// ```
pub struct SqliteCorpus {
    /// Connection to the `SQLite` database.
    conn: Mutex<Connection>,
    /// Path to the `SQLite` database (None for in-memory).
    db_path: Option<PathBuf>,
}

impl SqliteCorpus {
    /// Opens (or creates) a corpus database at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::OperationFailed {
                operation: "create_corpus_dir".to_string(),
                cause: format!("{}: {e}", parent.display()),
            })?;
        }

        let conn = Connection::open(&db_path).map_err(|e| Error::OperationFailed {
            operation: "open_sqlite".to_string(),
            cause: e.to_string(),
        })?;

        let corpus = Self {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        };

        corpus.initialize()?;
        Ok(corpus)
    }

    /// Creates an in-memory corpus (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_sqlite_memory".to_string(),
            cause: e.to_string(),
        })?;

        let corpus = Self {
            conn: Mutex::new(conn),
            db_path: None,
        };

        corpus.initialize()?;
        Ok(corpus)
    }

    /// Adds a unique index on `exact_digest`.
    ///
    /// Afterwards a second entry with an already stored exact digest is
    /// rejected with [`Error::Conflict`]. This is the backstop for two
    /// concurrent uploads of the same new file both passing the check.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be created, e.g. because the
    /// corpus already holds duplicate exact digests.
    pub fn enforce_unique_exact_digest(self) -> Result<Self> {
        {
            let conn = acquire_lock(&self.conn);
            conn.execute(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_corpus_exact_unique
                 ON corpus_digests(exact_digest)",
                [],
            )
            .map_err(|e| Error::OperationFailed {
                operation: "create_unique_exact_index".to_string(),
                cause: e.to_string(),
            })?;
        }
        Ok(self)
    }

    /// Returns the database path.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Initializes the database schema.
    fn initialize(&self) -> Result<()> {
        let conn = acquire_lock(&self.conn);
        configure_connection(&conn)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS corpus_digests (
                entry_id TEXT PRIMARY KEY,
                exact_digest TEXT NOT NULL,
                fuzzy_digest TEXT,
                token_count INTEGER NOT NULL DEFAULT 0,
                byte_length INTEGER NOT NULL,
                stored_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_corpus_exact ON corpus_digests(exact_digest);
            CREATE INDEX IF NOT EXISTS idx_corpus_token_count ON corpus_digests(token_count);",
        )
        .map_err(|e| Error::OperationFailed {
            operation: "initialize_corpus_schema".to_string(),
            cause: e.to_string(),
        })?;

        // Rows written without a token count keep the column default of 0.
        let backfilled = conn
            .execute(
                &format!(
                    "UPDATE corpus_digests SET token_count = {TOKEN_COUNT_SQL}
                     WHERE fuzzy_digest IS NOT NULL AND fuzzy_digest != '' AND token_count = 0"
                ),
                [],
            )
            .map_err(|e| Error::OperationFailed {
                operation: "backfill_token_count".to_string(),
                cause: e.to_string(),
            })?;
        if backfilled > 0 {
            tracing::info!(rows = backfilled, "Backfilled corpus token counts");
        }
        Ok(())
    }

    fn query_entries(
        &self,
        operation: &'static str,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<CorpusEntry>> {
        let start = Instant::now();
        let result = {
            let conn = acquire_lock(&self.conn);
            conn.prepare(sql).and_then(|mut stmt| {
                stmt.query_map(params, entry_from_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()
            })
        };
        record_operation_metrics(operation, start, &result);
        result.map_err(|e| query_error(operation, &e))
    }
}

impl CorpusStore for SqliteCorpus {
    fn find_by_exact_digest(
        &self,
        exact_digest: &str,
        exclude: Option<&EntryId>,
    ) -> Result<Option<CorpusEntry>> {
        let start = Instant::now();
        let result = {
            let conn = acquire_lock(&self.conn);
            conn.query_row(
                &format!(
                    "SELECT {ENTRY_COLUMNS} FROM corpus_digests
                     WHERE exact_digest = ?1 AND (?2 IS NULL OR entry_id != ?2)
                     ORDER BY rowid LIMIT 1"
                ),
                params![exact_digest, exclude.map(EntryId::as_str)],
                entry_from_row,
            )
            .optional()
        };
        record_operation_metrics("find_by_exact_digest", start, &result);
        result.map_err(|e| query_error("find_by_exact_digest", &e))
    }

    fn list_entries_with_fuzzy_digest(
        &self,
        exclude: Option<&EntryId>,
    ) -> Result<Vec<CorpusEntry>> {
        self.query_entries(
            "list_entries_with_fuzzy_digest",
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM corpus_digests
                 WHERE fuzzy_digest IS NOT NULL AND (?1 IS NULL OR entry_id != ?1)
                 ORDER BY rowid"
            ),
            params![exclude.map(EntryId::as_str)],
        )
    }

    fn list_fuzzy_candidates(
        &self,
        exclude: Option<&EntryId>,
        range: TokenCountRange,
    ) -> Result<Vec<CorpusEntry>> {
        self.query_entries(
            "list_fuzzy_candidates",
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM corpus_digests
                 WHERE fuzzy_digest IS NOT NULL AND (?1 IS NULL OR entry_id != ?1)
                   AND (token_count BETWEEN ?2 AND ?3
                        OR (token_count = 0 AND fuzzy_digest != ''))
                 ORDER BY rowid"
            ),
            params![
                exclude.map(EntryId::as_str),
                to_sql_int(range.min),
                to_sql_int(range.max)
            ],
        )
    }

    fn store_digest(&self, entry_id: &EntryId, digest: &FileDigest) -> Result<()> {
        let start = Instant::now();
        let result = {
            let conn = acquire_lock(&self.conn);
            conn.execute(
                "INSERT INTO corpus_digests
                    (entry_id, exact_digest, fuzzy_digest, token_count, byte_length, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(entry_id) DO UPDATE SET
                    exact_digest = excluded.exact_digest,
                    fuzzy_digest = excluded.fuzzy_digest,
                    token_count = excluded.token_count,
                    byte_length = excluded.byte_length,
                    stored_at = excluded.stored_at",
                params![
                    entry_id.as_str(),
                    digest.exact_digest,
                    digest.fuzzy_digest,
                    to_sql_int(digest.token_count()),
                    i64::try_from(digest.byte_length).unwrap_or(i64::MAX),
                    i64::try_from(current_timestamp()).unwrap_or(i64::MAX),
                ],
            )
        };
        record_operation_metrics("store_digest", start, &result);

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(Error::Conflict(format!(
                    "exact digest {} is already stored for another entry",
                    digest.exact_digest
                )))
            },
            Err(e) => Err(query_error("store_digest", &e)),
        }
    }

    fn get(&self, entry_id: &EntryId) -> Result<Option<CorpusEntry>> {
        let start = Instant::now();
        let result = {
            let conn = acquire_lock(&self.conn);
            conn.query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM corpus_digests WHERE entry_id = ?1"),
                params![entry_id.as_str()],
                entry_from_row,
            )
            .optional()
        };
        record_operation_metrics("get", start, &result);
        result.map_err(|e| query_error("get", &e))
    }

    fn count(&self) -> Result<usize> {
        let start = Instant::now();
        let result = {
            let conn = acquire_lock(&self.conn);
            conn.query_row("SELECT COUNT(*) FROM corpus_digests", [], |row| {
                row.get::<_, i64>(0)
            })
        };
        record_operation_metrics("count", start, &result);
        result
            .map(|n| usize::try_from(n).unwrap_or(0))
            .map_err(|e| query_error("count", &e))
    }
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<CorpusEntry> {
    let byte_length: i64 = row.get(3)?;
    let stored_at: i64 = row.get(4)?;
    Ok(CorpusEntry {
        id: EntryId::new(row.get::<_, String>(0)?),
        exact_digest: row.get(1)?,
        fuzzy_digest: row.get(2)?,
        byte_length: u64::try_from(byte_length).unwrap_or(0),
        stored_at: u64::try_from(stored_at).unwrap_or(0),
    })
}

fn to_sql_int(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn query_error(operation: &str, e: &rusqlite::Error) -> Error {
    Error::OperationFailed {
        operation: operation.to_string(),
        cause: e.to_string(),
    }
}
