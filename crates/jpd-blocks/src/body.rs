//! Visible body layout for managed issues.
//!
//! A managed issue body is laid out as:
//!
//! ```text
//! <rendered body>
//!
//! Parent: #12
//!
//! _Synced from [DISC-42](https://...)_
//!
//! <!-- jpd-sync-tasklist -->
//! ## Subtasks
//! - [ ] #31 child
//!
//! <!-- jpd-sync-metadata ... -->
//! ```
//!
//! The `Parent:` line is the hierarchy link walked for depth checks.

use regex::Regex;
use std::sync::LazyLock;

use crate::metadata::{self, SyncMetadata};
use crate::tasklist;

static PARENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Parent: #(\d+)\s*$").expect("Invalid parent regex"));

/// Issue number referenced by the body's `Parent: #N` line.
pub fn parent_number(body: &str) -> Option<u64> {
    PARENT_REGEX
        .captures(body)
        .and_then(|caps| caps[1].parse().ok())
}

pub fn parent_line(number: u64) -> String {
    format!("Parent: #{number}")
}

/// Inputs for the generated part of a body
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyParts<'a> {
    /// Body text rendered from the source record
    pub content: &'a str,
    pub source_key: &'a str,
    /// Destination number of the parent issue, when linked
    pub parent: Option<u64>,
    pub original_link: Option<&'a str>,
}

/// Render the generated part of a body (no task list, no state block).
///
/// This is the text covered by the sync hash.
pub fn render_visible(parts: &BodyParts<'_>) -> String {
    let mut sections: Vec<String> = Vec::new();

    let content = parts.content.trim();
    if !content.is_empty() {
        sections.push(content.to_string());
    }
    if let Some(parent) = parts.parent {
        sections.push(parent_line(parent));
    }
    if let Some(link) = parts.original_link {
        sections.push(format!("_Synced from [{}]({link})_", parts.source_key));
    }

    sections.join("\n\n")
}

/// Assemble a full body.
///
/// `task_section` is the list carried over from the previous body, so a
/// regeneration keeps every checkbox exactly as it was.
pub fn compose(parts: &BodyParts<'_>, task_section: Option<&str>, meta: &SyncMetadata) -> String {
    let mut body = render_visible(parts);
    if let Some(section) = task_section {
        body = tasklist::attach_section(&body, section);
    }
    metadata::encode(&body, meta)
}

/// Regenerate a body from a stale one, keeping its task list.
pub fn regenerate(stale: &str, parts: &BodyParts<'_>, meta: &SyncMetadata) -> String {
    let section = tasklist::extract_section(stale);
    compose(parts, section.as_deref(), meta)
}
