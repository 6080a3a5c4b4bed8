//! `plan`: dry-run a pass over snapshot files

use colored::Colorize;
use std::path::Path;
use std::sync::Arc;

use jpd_core::{SyncAction, SyncConfig, SyncEngine, SyncOptions, SyncReport};
use jpd_gateway::{ConnectionCache, Issue, MemoryIssueStore, MemorySourceStore, SourceRecord};

use crate::error::{CliError, Result};

use super::{read_json, reject_function_mappings};

/// Run a dry-run pass with both sides loaded from JSON snapshots.
pub fn run_plan(config: &Path, records: &Path, issues: Option<&Path>, json: bool) -> Result<()> {
    let config = SyncConfig::load(config)?;
    reject_function_mappings(&config)?;
    let records: Vec<SourceRecord> = read_json(records)?;
    let issues: Vec<Issue> = match issues {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let ttl = config.cache.connection_ttl();
    let mut engine = SyncEngine::new(
        config,
        Arc::new(MemorySourceStore::from_records(records)),
        Arc::new(MemoryIssueStore::from_issues(issues)),
        Arc::new(ConnectionCache::new(ttl)),
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(engine.run(SyncOptions { dry_run: true }))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.is_success() {
        Ok(())
    } else {
        Err(CliError::user(format!(
            "{} record(s) failed to sync",
            report.failures.len()
        )))
    }
}

fn print_report(report: &SyncReport) {
    println!("{} Planning sync pass (dry run)...", "=>".blue().bold());

    for outcome in report.records.iter().chain(&report.orphans) {
        let marker = match outcome.action {
            SyncAction::Create => "+".green(),
            SyncAction::UpdateDownstream | SyncAction::UpdateUpstream => "~".yellow(),
            SyncAction::Skip => "=".dimmed(),
            SyncAction::LeaveOrphan => "?".magenta(),
        };
        println!("   {} {}", marker, outcome.describe(report.dry_run));
        if let Some(link) = &outcome.parent {
            println!(
                "     {} task list of #{}: {:?}",
                "-".dimmed(),
                link.parent,
                link.change
            );
        }
        for warning in &outcome.warnings {
            println!("     {} {}", "!".yellow(), warning);
        }
    }

    for failure in &report.failures {
        println!(
            "   {} {}: {}",
            "x".red().bold(),
            failure.jpd_key.cyan(),
            failure.error
        );
    }

    println!();
    let label = if report.is_success() {
        "OK".green().bold()
    } else {
        "FAILED".red().bold()
    };
    println!("{} {}", label, report.summary());
}
