//! `SQLite` corpus store.
//!
//! - [`connection`]: lock acquisition with poison recovery, pragma setup
//! - [`metrics`]: per-operation counters and latency histograms
//! - [`corpus`]: the [`SqliteCorpus`] store itself

mod connection;
mod corpus;
mod metrics;

pub use connection::{BUSY_TIMEOUT_MS, acquire_lock, configure_connection};
pub use corpus::SqliteCorpus;
pub use metrics::record_operation_metrics;
