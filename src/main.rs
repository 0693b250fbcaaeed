//! Binary entry point for dupcheck.
//!
//! This binary provides the CLI interface for the duplicate detection engine.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

mod commands;

use clap::{Parser, Subcommand};
use dupcheck::DupcheckConfig;
use dupcheck::observability::{self, InitOptions};
use std::path::PathBuf;
use std::process::ExitCode;

/// Dupcheck - content-addressed duplicate detection for uploaded files.
#[derive(Parser)]
#[command(name = "dupcheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the corpus database (overrides configuration).
    #[arg(long, global = true, env = "DUPCHECK_DATABASE")]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Print the digest of a file.
    Digest {
        /// File path, file:// URL or http(s) URL.
        locator: String,
    },

    /// Print the fuzzy similarity of two files.
    Compare {
        /// First file; the size divergence check is relative to it.
        a: String,
        /// Second file.
        b: String,
    },

    /// Check a file against the corpus.
    Check {
        /// File path, file:// URL or http(s) URL.
        locator: String,

        /// Uploader identity, recorded in logs.
        #[arg(long, default_value = "cli")]
        actor: String,

        /// Corpus entry to ignore (re-checking an existing resource).
        #[arg(long)]
        exclude: Option<String>,
    },

    /// Check a file and, if it is not a duplicate, add it to the corpus.
    Ingest {
        /// File path, file:// URL or http(s) URL.
        locator: String,

        /// Entry ID to store the digest under (default: a new UUID v7).
        #[arg(long)]
        id: Option<String>,

        /// Uploader identity, recorded in logs.
        #[arg(long, default_value = "cli")]
        actor: String,
    },

    /// Show corpus size and effective configuration.
    Status,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match DupcheckConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };
    if let Some(database) = cli.database.clone() {
        config.database_path = database;
    }

    let verbose = cli.verbose;
    let telemetry = match observability::init_from_config(
        &config.observability,
        InitOptions {
            verbose,
            metrics_expose: false,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    let result = run_command(cli, &config);

    if verbose {
        if let Some(rendered) = telemetry.render_metrics() {
            eprintln!("{rendered}");
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
fn run_command(cli: Cli, config: &DupcheckConfig) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Digest { locator } => commands::cmd_digest(config, &locator),
        Commands::Compare { a, b } => commands::cmd_compare(config, &a, &b),
        Commands::Check {
            locator,
            actor,
            exclude,
        } => commands::cmd_check(config, &locator, &actor, exclude),
        Commands::Ingest { locator, id, actor } => {
            commands::cmd_ingest(config, &locator, id, &actor)
        },
        Commands::Status => commands::cmd_status(config),
    }
}
