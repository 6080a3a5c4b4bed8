//! Record types exchanged with the two stores

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// An item from the upstream product-discovery tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub key: String,
    pub updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_key: Option<String>,
    /// Typed field values as returned by the source API
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl SourceRecord {
    pub fn new(key: impl Into<String>, updated: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            updated,
            parent_key: None,
            fields: Map::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_key = Some(parent.into());
        self
    }

    /// JSON view used by field mappings: `key`, `updated`, `parentKey`, `fields`.
    pub fn to_view(&self) -> Value {
        json!({
            "key": self.key,
            "updated": self.updated.to_rfc3339(),
            "parentKey": self.parent_key,
            "fields": self.fields,
        })
    }
}

/// Upstream search request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceQuery {
    /// Query-language string, e.g. `project = DISC ORDER BY key`
    pub jql: String,
    #[serde(default)]
    pub fields: Vec<String>,
    /// Overall cap on the number of records returned across all pages
    pub max_results: usize,
}

/// One page of upstream search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourcePage {
    pub records: Vec<SourceRecord>,
    /// Token for the next page; `None` on the last page
    pub next_page_token: Option<String>,
}

/// Open/closed state of a destination issue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    #[default]
    Open,
    Closed,
}

impl IssueState {
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for IssueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An issue in the downstream code-hosting tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// Apply a patch locally, as the destination would.
    pub fn patched(&self, patch: &IssuePatch, now: DateTime<Utc>) -> Issue {
        let mut issue = self.clone();
        if let Some(title) = &patch.title {
            issue.title = title.clone();
        }
        if let Some(body) = &patch.body {
            issue.body = body.clone();
        }
        if let Some(state) = patch.state {
            issue.state = state;
        }
        if let Some(labels) = &patch.labels {
            issue.labels = labels.clone();
        }
        issue.updated_at = now;
        issue
    }
}

/// Fields for a new issue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueDraft {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub state: IssueState,
}

/// Partial update; `None` leaves the field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssuePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<IssueState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl IssuePatch {
    pub fn body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.state.is_none() && self.labels.is_none()
    }
}

/// A comment on either side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn view_exposes_fields_for_mappings() {
        let record = SourceRecord::new("K-1", Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
            .with_field("summary", json!("Login bug"))
            .with_parent("K-0");
        let view = record.to_view();
        assert_eq!(view["key"], "K-1");
        assert_eq!(view["parentKey"], "K-0");
        assert_eq!(view["fields"]["summary"], "Login bug");
    }

    #[test]
    fn patch_applies_only_set_fields() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let issue = Issue {
            number: 1,
            title: "Old".into(),
            body: "b".into(),
            state: IssueState::Closed,
            labels: vec!["x".into()],
            updated_at: t0,
        };
        let patched = issue.patched(
            &IssuePatch {
                title: Some("New".into()),
                ..Default::default()
            },
            t1,
        );
        assert_eq!(patched.title, "New");
        assert_eq!(patched.state, IssueState::Closed);
        assert_eq!(patched.body, "b");
        assert_eq!(patched.updated_at, t1);
    }

    #[test]
    fn issue_state_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&IssueState::Closed).unwrap(), "\"closed\"");
    }
}
