//! Business logic services.
//!
//! Services orchestrate byte sources and corpus stores and provide the
//! high-level operations: checking an upload and recording an accepted one.

pub mod acceptance;
pub mod deduplication;

pub use acceptance::{AcceptanceOutcome, record_acceptance};
pub use deduplication::{DeduplicationConfig, DuplicateChecker};
