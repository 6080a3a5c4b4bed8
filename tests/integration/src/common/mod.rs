//! Shared harness: an engine wired to in-memory stores

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use jpd_core::{SyncConfig, SyncEngine, SyncOptions, SyncReport};
use jpd_gateway::{ConnectionCache, MemoryIssueStore, MemorySourceStore, SourceRecord};
use serde_json::json;
use std::sync::Arc;

pub const ONE_WAY: &str = r#"
source:
  query: project = K
  base_url: https://example.atlassian.net
mapping:
  title: "{{fields.summary | trim}}"
  body: fields.description
  labels:
    - fields.labels
  status:
    field: fields.status
    closed: [Done]
"#;

pub fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
}

pub fn record(key: &str, summary: &str) -> SourceRecord {
    SourceRecord::new(key, at(9))
        .with_field("summary", json!(summary))
        .with_field("status", json!({ "value": "To Do" }))
}

pub fn child(key: &str, summary: &str, parent: &str) -> SourceRecord {
    record(key, summary).with_parent(parent)
}

pub struct Harness {
    yaml: String,
    pub source: Arc<MemorySourceStore>,
    pub issues: Arc<MemoryIssueStore>,
    pub engine: SyncEngine,
}

impl Harness {
    pub fn new(yaml: &str, records: Vec<SourceRecord>) -> Self {
        let config = SyncConfig::from_yaml(yaml).unwrap();
        let source = Arc::new(MemorySourceStore::from_records(records));
        let issues = Arc::new(MemoryIssueStore::new());
        let engine = SyncEngine::new(
            config,
            source.clone(),
            issues.clone(),
            Arc::new(ConnectionCache::default()),
        );
        Self {
            yaml: yaml.to_string(),
            source,
            issues,
            engine,
        }
    }

    /// Point a fresh engine at a new candidate set, keeping the destination.
    pub fn replace_source(&mut self, records: Vec<SourceRecord>) {
        self.source = Arc::new(MemorySourceStore::from_records(records));
        self.engine = SyncEngine::new(
            SyncConfig::from_yaml(&self.yaml).unwrap(),
            self.source.clone(),
            self.issues.clone(),
            Arc::new(ConnectionCache::default()),
        );
    }

    pub fn one_way(records: Vec<SourceRecord>) -> Self {
        Self::new(ONE_WAY, records)
    }

    pub async fn pass(&mut self) -> SyncReport {
        self.engine.run(SyncOptions::default()).await.unwrap()
    }

    pub async fn dry_pass(&mut self) -> SyncReport {
        self.engine.run(SyncOptions { dry_run: true }).await.unwrap()
    }

    /// Destination number assigned to a source key, read from its state block.
    pub fn number_of(&self, key: &str) -> u64 {
        self.issues
            .issues()
            .into_iter()
            .find(|i| jpd_blocks::decode(&i.body).is_some_and(|m| m.jpd_id == key))
            .map(|i| i.number)
            .unwrap_or_else(|| panic!("no issue for {key}"))
    }
}
