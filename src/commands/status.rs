//! Status command.

use dupcheck::storage::CorpusStore;
use dupcheck::DupcheckConfig;

use super::open_corpus;

/// Shows corpus size and effective configuration.
pub fn cmd_status(config: &DupcheckConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("Dupcheck Status");
    println!("===============");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    let db_status = if config.database_path.exists() {
        "Available"
    } else {
        "Will be created on first use"
    };
    println!("Corpus Database: {db_status}");
    println!("  Path: {}", config.database_path.display());
    if config.database_path.exists() {
        let corpus = open_corpus(config)?;
        println!("  Entries: {}", corpus.count()?);
    }
    println!(
        "  Unique exact digest: {}",
        if config.storage.unique_exact_digest { "enforced" } else { "off" }
    );
    println!();

    let dedup = &config.dedup;
    println!("Duplicate Checking: {}", if dedup.enabled { "Enabled" } else { "Disabled" });
    println!("  Similarity threshold: {}%", dedup.similarity_threshold);
    println!(
        "  Token-count pre-filter: {}",
        if dedup.prefilter_by_token_count { "on" } else { "off" }
    );
    match dedup.scan_timeout {
        Some(timeout) => println!("  Scan deadline: {}ms", timeout.as_millis()),
        None => println!("  Scan deadline: none"),
    }
    println!();

    let fetch = &config.fetch;
    println!("Fetch:");
    println!("  Timeout: {}ms", fetch.timeout_ms);
    println!("  Connect timeout: {}ms", fetch.connect_timeout_ms);
    println!("  Max bytes: {}", fetch.max_bytes);

    Ok(())
}
