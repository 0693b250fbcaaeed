//! Digest, compare, check and ingest commands.

use dupcheck::fetch::{ByteSource, LocatorByteSource};
use dupcheck::services::acceptance::{AcceptanceOutcome, ingest};
use dupcheck::services::deduplication::{DuplicateChecker, DuplicateVerdict, compute_digest, similarity};
use dupcheck::{DupcheckConfig, EntryId, FileDigest};
use serde::Serialize;
use std::sync::Arc;

use super::open_corpus;

/// Output of `compare`.
#[derive(Serialize)]
struct Comparison {
    a: FileDigest,
    b: FileDigest,
    identical: bool,
    similarity: u8,
}

/// Output of `ingest`.
#[derive(Serialize)]
struct Ingestion {
    entry_id: Option<EntryId>,
    outcome: AcceptanceOutcome,
    verdict: DuplicateVerdict,
}

/// Prints the digest of a file.
pub fn cmd_digest(config: &DupcheckConfig, locator: &str) -> Result<(), Box<dyn std::error::Error>> {
    let source = LocatorByteSource::new(&config.fetch)?;
    let digest = compute_digest(&source.fetch_bytes(locator)?);
    println!("{}", serde_json::to_string_pretty(&digest)?);
    Ok(())
}

/// Prints the similarity of two files.
pub fn cmd_compare(
    config: &DupcheckConfig,
    a: &str,
    b: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = LocatorByteSource::new(&config.fetch)?;
    let a = compute_digest(&source.fetch_bytes(a)?);
    let b = compute_digest(&source.fetch_bytes(b)?);

    let comparison = Comparison {
        identical: a.exact_digest == b.exact_digest,
        similarity: similarity(&a.fuzzy_digest, &b.fuzzy_digest),
        a,
        b,
    };
    println!("{}", serde_json::to_string_pretty(&comparison)?);
    Ok(())
}

/// Checks a file against the corpus and prints the verdict.
pub fn cmd_check(
    config: &DupcheckConfig,
    locator: &str,
    actor: &str,
    exclude: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let checker = DuplicateChecker::new(
        Arc::new(LocatorByteSource::new(&config.fetch)?),
        Arc::new(open_corpus(config)?),
        config.dedup.clone(),
    );

    let exclude = exclude.as_deref().map(EntryId::parse).transpose()?;
    let verdict = checker.check(locator, actor, exclude.as_ref());
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}

/// Checks a file and stores its digest when it is not a duplicate.
pub fn cmd_ingest(
    config: &DupcheckConfig,
    locator: &str,
    id: Option<String>,
    actor: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let corpus = Arc::new(open_corpus(config)?);
    let checker = DuplicateChecker::new(
        Arc::new(LocatorByteSource::new(&config.fetch)?),
        Arc::clone(&corpus),
        config.dedup.clone(),
    );

    let entry_id = match id.as_deref() {
        Some(id) => EntryId::parse(id)?,
        None => EntryId::generate(),
    };
    let (verdict, outcome) = ingest(&checker, corpus.as_ref(), locator, actor, &entry_id);
    let ingestion = Ingestion {
        entry_id: (outcome == AcceptanceOutcome::Stored).then_some(entry_id),
        outcome,
        verdict,
    };

    println!("{}", serde_json::to_string_pretty(&ingestion)?);
    Ok(())
}
