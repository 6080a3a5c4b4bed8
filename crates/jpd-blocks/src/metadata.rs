//! Sync state block embedded in destination issue bodies.
//!
//! The block is an HTML comment, invisible once the body is rendered:
//!
//! ```text
//! <!-- jpd-sync-metadata
//! jpd_id: DISC-42
//! jpd_updated: 2024-05-01T10:00:00Z
//! sync_hash: 9f86d081884c7d65...
//! parent_jpd_id: DISC-7
//! original_link: https://example.atlassian.net/browse/DISC-42
//! -->
//! ```
//!
//! It is the only durable record of which source item an issue belongs to.

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// Marker string following `<!--`. Also used as the full-text search term
/// for discovering managed issues.
pub const METADATA_MARKER: &str = "jpd-sync-metadata";

const COMMENT_OPEN: &str = "<!--";
const COMMENT_CLOSE: &str = "-->";

static START_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<!--\s*jpd-sync-metadata\b").expect("Invalid metadata marker regex")
});

/// Decoded contents of a sync state block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncMetadata {
    /// Source record key
    pub jpd_id: String,
    /// Source record's last-modified timestamp at the time of the last write
    pub jpd_updated: DateTime<Utc>,
    /// Hash of the mapped output at the time of the last write
    pub sync_hash: String,
    /// Source key of the parent record, when hierarchical
    pub parent_jpd_id: Option<String>,
    /// Link back to the source record
    pub original_link: Option<String>,
}

impl SyncMetadata {
    pub fn new(
        jpd_id: impl Into<String>,
        jpd_updated: DateTime<Utc>,
        sync_hash: impl Into<String>,
    ) -> Self {
        Self {
            jpd_id: jpd_id.into(),
            jpd_updated,
            sync_hash: sync_hash.into(),
            parent_jpd_id: None,
            original_link: None,
        }
    }

    pub fn with_parent(mut self, parent: Option<String>) -> Self {
        self.parent_jpd_id = parent;
        self
    }

    pub fn with_original_link(mut self, link: Option<String>) -> Self {
        self.original_link = link;
        self
    }

    /// Render the complete comment block. Key order is fixed.
    pub fn to_block(&self) -> String {
        let mut out = format!("{COMMENT_OPEN} {METADATA_MARKER}\n");
        push_line(&mut out, "jpd_id", &self.jpd_id);
        push_line(
            &mut out,
            "jpd_updated",
            &self
                .jpd_updated
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        );
        push_line(&mut out, "sync_hash", &self.sync_hash);
        if let Some(parent) = &self.parent_jpd_id {
            push_line(&mut out, "parent_jpd_id", parent);
        }
        if let Some(link) = &self.original_link {
            push_line(&mut out, "original_link", link);
        }
        out.push_str(COMMENT_CLOSE);
        out
    }

    /// Parse the inside of a block (everything between the marker and `-->`).
    ///
    /// Unknown keys are ignored. `sync_hash` may be absent in hand-edited
    /// blocks; it then reads as empty and forces an update on the next pass.
    pub fn parse(content: &str) -> Result<Self> {
        let mut jpd_id = None;
        let mut jpd_updated = None;
        let mut sync_hash = None;
        let mut parent_jpd_id = None;
        let mut original_link = None;

        for (i, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                return Err(Error::InvalidLine {
                    line: i + 1,
                    message: format!("expected 'key: value', got '{line}'"),
                });
            };
            let value = value.trim();
            let value = (!value.is_empty()).then(|| value.to_string());

            match key.trim() {
                "jpd_id" => jpd_id = value,
                "jpd_updated" => jpd_updated = value,
                "sync_hash" => sync_hash = value,
                "parent_jpd_id" => parent_jpd_id = value,
                "original_link" => original_link = value,
                _ => {}
            }
        }

        let jpd_id = jpd_id.ok_or(Error::MissingKey { key: "jpd_id" })?;
        let updated = jpd_updated.ok_or(Error::MissingKey { key: "jpd_updated" })?;

        Ok(Self {
            jpd_id,
            jpd_updated: parse_timestamp(&updated)?,
            sync_hash: sync_hash.unwrap_or_default(),
            parent_jpd_id,
            original_link,
        })
    }
}

/// Location of a state block inside a body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataBlock<'a> {
    /// Byte range of the whole comment, markers included
    pub span: Range<usize>,
    /// Text between the marker and the closing `-->`
    pub content: &'a str,
}

/// Find the first well-formed state block in `body`.
///
/// A candidate whose comment would swallow another `<!--` is skipped, so a
/// stray or truncated marker earlier in the body cannot capture a later block.
pub fn find_block(body: &str) -> Option<MetadataBlock<'_>> {
    for start in START_REGEX.find_iter(body) {
        let rest = &body[start.end()..];
        let Some(close) = rest.find(COMMENT_CLOSE) else {
            continue;
        };
        let content = &rest[..close];
        if content.contains(COMMENT_OPEN) {
            continue;
        }
        return Some(MetadataBlock {
            span: start.start()..start.end() + close + COMMENT_CLOSE.len(),
            content,
        });
    }
    None
}

/// Decode the state block from a body.
///
/// Returns `None` when there is no block or it cannot be parsed; such an
/// issue is treated as unmanaged rather than as an error.
pub fn decode(body: &str) -> Option<SyncMetadata> {
    let block = find_block(body)?;
    match SyncMetadata::parse(block.content) {
        Ok(meta) => Some(meta),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring unparseable sync metadata block");
            None
        }
    }
}

/// Write `metadata` into `body`.
///
/// An existing block is replaced in place; otherwise the block is appended
/// after a blank line.
pub fn encode(body: &str, metadata: &SyncMetadata) -> String {
    let block = metadata.to_block();
    match find_block(body) {
        Some(existing) => {
            let mut out = String::with_capacity(body.len() + block.len());
            out.push_str(&body[..existing.span.start]);
            out.push_str(&block);
            out.push_str(&body[existing.span.end..]);
            out
        }
        None => {
            let trimmed = body.trim_end();
            if trimmed.is_empty() {
                block
            } else {
                format!("{trimmed}\n\n{block}")
            }
        }
    }
}

/// Remove the state block, returning the visible body.
pub fn strip(body: &str) -> String {
    match find_block(body) {
        Some(block) => {
            let before = body[..block.span.start].trim_end();
            let after = body[block.span.end..].trim_start_matches(['\r', '\n']);
            match (before.is_empty(), after.is_empty()) {
                (_, true) => before.to_string(),
                (true, false) => after.to_string(),
                (false, false) => format!("{before}\n\n{after}"),
            }
        }
        None => body.to_string(),
    }
}

/// Parse an ISO-8601 timestamp, accepting both `+00:00` and `+0000` offsets.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::InvalidTimestamp {
            value: value.to_string(),
            message: e.to_string(),
        })
}

fn push_line(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push_str(": ");
    out.push_str(&sanitize(value));
    out.push('\n');
}

/// Values live on one line inside an HTML comment.
fn sanitize(value: &str) -> String {
    value
        .replace(['\r', '\n'], " ")
        .replace(COMMENT_CLOSE, "-- >")
        .replace(COMMENT_OPEN, "< !--")
}
