//! Storage layer abstraction.
//!
//! The corpus store persists the digests of accepted resources:
//! - **In-memory**: `RwLock<Vec<_>>`, for tests and embedding
//! - **`SQLite`**: durable single-file store with token-count index

// Allow significant_drop_tightening - dropping database connections slightly early
// provides no meaningful benefit.
#![allow(clippy::significant_drop_tightening)]

mod memory;
pub mod sqlite;
pub mod traits;

pub use memory::InMemoryCorpus;
pub use sqlite::SqliteCorpus;
pub use traits::{CorpusStore, TokenCountRange};

use crate::{Error, Result};
use std::path::PathBuf;

/// Returns the user-level data directory for dupcheck
/// (e.g. `~/.local/share/dupcheck` on Linux).
///
/// # Errors
///
/// Returns an error if the user data directory cannot be determined.
pub fn get_user_data_dir() -> Result<PathBuf> {
    directories::BaseDirs::new()
        .map(|b| b.data_local_dir().join("dupcheck"))
        .ok_or_else(|| Error::OperationFailed {
            operation: "get_user_data_dir".to_string(),
            cause: "Could not determine user data directory".to_string(),
        })
}
