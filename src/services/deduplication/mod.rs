//! Duplicate detection for uploaded files.
//!
//! This module provides two-layer duplicate checking:
//! 1. **Exact match**: SHA-256 digest lookup
//! 2. **Fuzzy match**: position-aligned comparison of per-chunk tokens
//!
//! The checker short-circuits on the first match and fails open when the
//! file or the corpus cannot be read.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                       DuplicateChecker                        │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────┐ │
//! │  │ ByteSource   │  │ ExactMatch   │  │ FuzzyMatch           │ │
//! │  │              │─▶│ Checker      │─▶│ Checker              │ │
//! │  │ fetch bytes, │  │              │  │                      │ │
//! │  │ compute      │  │ SHA-256      │  │ token similarity,    │ │
//! │  │ FileDigest   │  │ lookup       │  │ earliest match >= 80 │ │
//! │  └──────────────┘  └──────────────┘  └──────────────────────┘ │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use dupcheck::fetch::{FetchConfig, LocatorByteSource};
//! use dupcheck::services::deduplication::{DeduplicationConfig, DuplicateChecker};
//! use dupcheck::storage::SqliteCorpus;
//! use std::sync::Arc;
//!
//! let corpus = Arc::new(SqliteCorpus::new("corpus.db")?);
//! let checker = DuplicateChecker::new(
//!     Arc::new(LocatorByteSource::new(&FetchConfig::default())?),
//!     corpus,
//!     DeduplicationConfig::default(),
//! );
//!
//! let verdict = checker.check("https://cdn.example.com/report.pdf", "user-42", None);
//! if verdict.is_duplicate {
//!     println!("Rejected: {}", verdict.reason_text().unwrap_or_default());
//! }
//! ```

mod config;
mod exact_match;
mod fuzzy_match;
mod hasher;
mod service;
mod similarity;
mod types;

pub use config::{DEFAULT_SIMILARITY_THRESHOLD, DeduplicationConfig};
pub use exact_match::ExactMatchChecker;
pub use fuzzy_match::{FuzzyMatch, FuzzyMatchChecker};
pub use hasher::{DigestBuilder, DigestCalculator, compute_digest};
pub use service::DuplicateChecker;
pub use similarity::{ComparisonError, comparable_token_range, similarity, try_similarity};
pub use types::{Deduplicator, DuplicateReason, DuplicateVerdict};
