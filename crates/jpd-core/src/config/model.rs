//! Typed configuration sections

use jpd_gateway::{IssueState, RetryPolicy, SourceQuery};
use jpd_transform::FieldMapping;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use jpd_blocks::DEFAULT_SECTION_TITLE;

fn default_max_results() -> usize {
    1_000
}

fn default_true() -> bool {
    true
}

fn default_section_title() -> String {
    DEFAULT_SECTION_TITLE.to_string()
}

fn default_connection_ttl_secs() -> u64 {
    300
}

/// Complete configuration for one source query and one destination repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub source: SourceConfig,
    pub mapping: MappingConfig,
    #[serde(default)]
    pub hierarchy: HierarchyConfig,
    #[serde(default)]
    pub sync: SyncSection,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Which upstream records take part in a pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Query-language string selecting the candidate set
    pub query: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Web root of the source tracker, used for back-links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

impl SourceConfig {
    pub fn to_query(&self) -> SourceQuery {
        SourceQuery {
            jql: self.query.clone(),
            fields: self.fields.clone(),
            max_results: self.max_results,
        }
    }

    /// `<base_url>/browse/<key>`, when a base URL is configured.
    pub fn original_link(&self, key: &str) -> Option<String> {
        self.base_url
            .as_deref()
            .map(|base| format!("{}/browse/{key}", base.trim_end_matches('/')))
    }
}

/// Field mappings from a source record to issue fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConfig {
    pub title: FieldMapping,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<FieldMapping>,
    #[serde(default)]
    pub labels: Vec<FieldMapping>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StatusMapping>,
}

impl MappingConfig {
    /// `(target, function path)` for every mapping that calls a function.
    pub fn function_mappings(&self) -> Vec<(&'static str, &str)> {
        let mut found = Vec::new();
        if let Some(path) = self.title.function_path() {
            found.push(("title", path));
        }
        if let Some(path) = self.body.as_ref().and_then(FieldMapping::function_path) {
            found.push(("body", path));
        }
        found.extend(
            self.labels
                .iter()
                .filter_map(FieldMapping::function_path)
                .map(|path| ("labels", path)),
        );
        found
    }
}

/// Upstream status values that close the destination issue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusMapping {
    /// Field path holding the status, e.g. `fields.status`
    pub field: String,
    #[serde(default)]
    pub closed: Vec<String>,
}

impl StatusMapping {
    /// Case-insensitive match against the `closed` list.
    pub fn state_for(&self, status: &str) -> IssueState {
        let status = status.trim();
        if self.closed.iter().any(|c| c.eq_ignore_ascii_case(status)) {
            IssueState::Closed
        } else {
            IssueState::Open
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Heading used when a parent has no task list yet
    #[serde(default = "default_section_title")]
    pub section_title: String,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            section_title: default_section_title(),
        }
    }
}

/// Direction of a pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    #[default]
    OneWay,
    Bidirectional,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncSection {
    #[serde(default)]
    pub direction: Direction,
    /// Mirror destination comments upstream (bidirectional only)
    #[serde(default)]
    pub comments: bool,
    #[serde(default)]
    pub state_to_status: StateToStatus,
    #[serde(default)]
    pub dry_run: bool,
}

impl SyncSection {
    pub fn is_bidirectional(&self) -> bool {
        self.direction == Direction::Bidirectional
    }
}

/// Upstream status written back for each destination state
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateToStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed: Option<String>,
}

impl StateToStatus {
    pub fn status_for(&self, state: IssueState) -> Option<&str> {
        match state {
            IssueState::Open => self.open.as_deref(),
            IssueState::Closed => self.closed.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_connection_ttl_secs")]
    pub connection_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            connection_ttl_secs: default_connection_ttl_secs(),
        }
    }
}

impl CacheConfig {
    pub fn connection_ttl(&self) -> Duration {
        Duration::from_secs(self.connection_ttl_secs)
    }
}
