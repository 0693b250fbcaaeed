//! Command handlers module.
//!
//! - `check.rs`: digest, compare, check and ingest
//! - `status.rs`: corpus and configuration status

mod check;
mod status;

pub use check::{cmd_check, cmd_compare, cmd_digest, cmd_ingest};
pub use status::cmd_status;

use dupcheck::storage::SqliteCorpus;
use dupcheck::DupcheckConfig;

/// Opens the configured corpus database.
fn open_corpus(config: &DupcheckConfig) -> dupcheck::Result<SqliteCorpus> {
    let corpus = SqliteCorpus::new(&config.database_path)?;
    if config.storage.unique_exact_digest {
        corpus.enforce_unique_exact_digest()
    } else {
        Ok(corpus)
    }
}
