//! Storage backend traits.

mod corpus;

pub use corpus::{CorpusStore, TokenCountRange};
