//! `inspect`: decode a stored issue body

use colored::Colorize;
use serde_json::json;
use std::path::Path;

use jpd_blocks::{decode, listed_items, parent_number};

use crate::error::Result;

pub fn run_inspect(body_path: &Path, json: bool) -> Result<()> {
    let body = std::fs::read_to_string(body_path)?;
    let metadata = decode(&body);
    let parent = parent_number(&body);
    let items = listed_items(&body);

    if json {
        let value = json!({
            "metadata": metadata.as_ref().map(|m| json!({
                "jpd_id": m.jpd_id,
                "jpd_updated": m.jpd_updated.to_rfc3339(),
                "sync_hash": m.sync_hash,
                "parent_jpd_id": m.parent_jpd_id,
                "original_link": m.original_link,
            })),
            "parent": parent,
            "children": items.iter().map(|i| json!({
                "number": i.number,
                "checked": i.checked,
                "title": i.title,
            })).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match &metadata {
        Some(m) => {
            println!("{} Managed issue for {}", "OK".green().bold(), m.jpd_id.cyan());
            println!("   jpd_updated:   {}", m.jpd_updated.to_rfc3339());
            println!("   sync_hash:     {}", m.sync_hash);
            if let Some(parent_key) = &m.parent_jpd_id {
                println!("   parent_jpd_id: {parent_key}");
            }
            if let Some(link) = &m.original_link {
                println!("   original_link: {link}");
            }
        }
        None => println!(
            "{} No sync state block found; issue is not managed",
            "UNMANAGED".yellow().bold()
        ),
    }

    if let Some(parent) = parent {
        println!("   parent issue:  #{parent}");
    }
    if !items.is_empty() {
        println!("   children:");
        for item in &items {
            let mark = if item.checked { "[x]".green() } else { "[ ]".normal() };
            println!("     {} #{} {}", mark, item.number, item.title);
        }
    }
    Ok(())
}
