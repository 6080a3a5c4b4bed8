//! `render`: preview the mapped output of one record

use colored::Colorize;
use serde_json::json;
use std::path::Path;

use jpd_blocks::{SyncMetadata, compose};
use jpd_core::SyncConfig;
use jpd_core::sync::render_record;
use jpd_gateway::SourceRecord;
use jpd_transform::Transformer;

use crate::error::Result;

use super::{read_json, reject_function_mappings};

/// Render a record as a new, unparented issue.
pub fn run_render(config: &Path, record: &Path, json: bool) -> Result<()> {
    let config = SyncConfig::load(config)?;
    reject_function_mappings(&config)?;
    let record: SourceRecord = read_json(record)?;

    let rendered = render_record(&Transformer::new(), &config.mapping, &record)?;
    let link = config.source.original_link(&record.key);
    let parts = rendered.body_parts(&record.key, None, link.as_deref());
    let hash = rendered.sync_hash(&parts, rendered.state);
    let metadata = SyncMetadata::new(record.key.as_str(), record.updated, hash.as_str())
        .with_parent(record.parent_key.clone())
        .with_original_link(link.clone());
    let body = compose(&parts, None, &metadata);

    if json {
        let value = json!({
            "jpd_key": record.key,
            "title": rendered.title,
            "labels": rendered.labels,
            "state": rendered.state,
            "status": rendered.status,
            "sync_hash": hash,
            "body": body,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{} {}", "title:".bold(), rendered.title);
    println!("{} {}", "state:".bold(), rendered.state);
    if !rendered.labels.is_empty() {
        println!("{} {}", "labels:".bold(), rendered.labels.join(", "));
    }
    println!("{} {}", "sync_hash:".bold(), hash.dimmed());
    println!();
    println!("{body}");
    Ok(())
}
