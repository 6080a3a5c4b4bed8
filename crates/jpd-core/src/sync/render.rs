//! Mapped output of a source record and its sync hash

use jpd_blocks::{BodyParts, render_visible};
use jpd_gateway::{IssueState, SourceRecord};
use jpd_transform::{FieldMapping, Transformer, display_value, value_to_strings};
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::config::MappingConfig;
use crate::{Error, Result};

/// Destination values produced from one source record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rendered {
    pub title: String,
    /// Body text before layout (no parent line, footer, task list or state block)
    pub content: String,
    /// Flattened, deduplicated and sorted
    pub labels: Vec<String>,
    pub state: IssueState,
    /// Raw upstream status, when a status mapping is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Run every configured mapping against `record`.
///
/// # Errors
///
/// Any mapping failure, or an empty title, fails the record.
pub fn render_record(
    transformer: &Transformer,
    mapping: &MappingConfig,
    record: &SourceRecord,
) -> Result<Rendered> {
    let view = record.to_view();

    let title = transformer
        .transform_to_string(&mapping.title, &view)?
        .trim()
        .to_string();
    if title.is_empty() {
        return Err(Error::MissingRequiredField {
            key: record.key.clone(),
            field: "title",
        });
    }

    let content = match &mapping.body {
        Some(body) => transformer.transform_to_string(body, &view)?,
        None => String::new(),
    };

    let mut labels = BTreeSet::new();
    for label in &mapping.labels {
        labels.extend(value_to_strings(&transformer.transform(label, &view)?));
    }

    let (state, status) = match &mapping.status {
        Some(status_mapping) => {
            let raw = transformer.transform(&FieldMapping::field(status_mapping.field.as_str()), &view)?;
            let status = display_value(&raw);
            (status_mapping.state_for(&status), Some(status).filter(|s| !s.is_empty()))
        }
        None => (IssueState::Open, None),
    };

    Ok(Rendered {
        title,
        content,
        labels: labels.into_iter().collect(),
        state,
        status,
    })
}

impl Rendered {
    pub fn body_parts<'a>(
        &'a self,
        source_key: &'a str,
        parent: Option<u64>,
        original_link: Option<&'a str>,
    ) -> BodyParts<'a> {
        BodyParts {
            content: &self.content,
            source_key,
            parent,
            original_link,
        }
    }

    /// Hex SHA-256 over the title, the visible body, the labels, `state` and
    /// the parent number.
    ///
    /// `state` is passed separately because the state finally written may
    /// differ from the mapped one when the destination wins a conflict.
    pub fn sync_hash(&self, parts: &BodyParts<'_>, state: IssueState) -> String {
        let canonical = json!({
            "title": self.title,
            "body": render_visible(parts),
            "labels": self.labels,
            "state": state,
            "parent": parts.parent,
        });
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
