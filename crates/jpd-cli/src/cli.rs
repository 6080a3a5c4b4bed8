//! CLI argument parsing using clap derive

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// jpd-sync - Reconcile product-discovery records with repository issues
#[derive(Parser, Debug)]
#[command(name = "jpd-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Plan a sync pass over snapshot files without writing anything
    ///
    /// Mappings using `function:` are rejected; custom functions can only be
    /// registered through the library.
    ///
    /// Examples:
    ///   jpd-sync plan -c sync.yaml -r records.json
    ///   jpd-sync plan -c sync.yaml -r records.json -i issues.json --json
    Plan {
        /// Sync configuration (.yaml, .yml, .toml or .json)
        #[arg(short, long, env = "JPD_SYNC_CONFIG")]
        config: PathBuf,

        /// JSON array of source records
        #[arg(short, long)]
        records: PathBuf,

        /// JSON array of existing destination issues
        #[arg(short, long)]
        issues: Option<PathBuf>,
    },

    /// Decode the sync state block and task list of an issue body
    Inspect {
        /// File holding the issue body
        body: PathBuf,
    },

    /// Show the mapped output and sync hash for one source record
    ///
    /// Mappings using `function:` are rejected; custom functions can only be
    /// registered through the library.
    Render {
        /// Sync configuration (.yaml, .yml, .toml or .json)
        #[arg(short, long, env = "JPD_SYNC_CONFIG")]
        config: PathBuf,

        /// JSON file holding one source record
        #[arg(short, long)]
        record: PathBuf,
    },
}
