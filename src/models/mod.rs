//! Data models for dupcheck.
//!
//! This module contains the value types shared by the digest calculator,
//! the duplicate checker and the corpus stores.

mod corpus;
mod digest;

pub use corpus::{CorpusEntry, EntryId};
pub use digest::{FUZZY_CHUNK_SIZE, FUZZY_SEPARATOR, FUZZY_TOKEN_LEN, FileDigest};
