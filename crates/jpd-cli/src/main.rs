//! jpd-sync CLI
//!
//! Offline tooling around the reconciliation engine: plan a pass over
//! snapshot files, inspect issue bodies, and preview mapped output.

mod cli;
mod commands;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}: failed to initialize logging: {e}", "warning".yellow().bold());
    }
    tracing::debug!("Verbose mode enabled");

    match cli.command {
        Some(cmd) => execute_command(cmd, cli.json),
        None => {
            // No command provided - show help hint
            println!("{} product discovery to issue sync", "jpd-sync".green().bold());
            println!();
            println!("Run {} for available commands.", "jpd-sync --help".cyan());
            Ok(())
        }
    }
}

fn execute_command(cmd: Commands, json: bool) -> Result<()> {
    match cmd {
        Commands::Plan {
            config,
            records,
            issues,
        } => commands::run_plan(&config, &records, issues.as_deref(), json),
        Commands::Inspect { body } => commands::run_inspect(&body, json),
        Commands::Render { config, record } => commands::run_render(&config, &record, json),
    }
}
