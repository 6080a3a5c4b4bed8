//! Sync configuration
//!
//! A single file describes one source query and how its records map onto
//! destination issues. YAML, TOML and JSON are accepted; the format is taken
//! from the file extension.
//!
//! ```yaml
//! source:
//!   query: project = DISC ORDER BY key
//!   base_url: https://example.atlassian.net
//! mapping:
//!   title: "{{fields.summary | trim}}"
//!   body: fields.description
//!   labels:
//!     - fields.labels
//!   status:
//!     field: fields.status
//!     closed: [Done, "Won't do"]
//! sync:
//!   direction: bidirectional
//!   comments: true
//!   state_to_status:
//!     open: In Progress
//!     closed: Done
//! ```

mod loader;
mod model;

pub use loader::{ConfigFormat, parse_as};
pub use model::{
    CacheConfig, Direction, HierarchyConfig, MappingConfig, SourceConfig, StateToStatus,
    StatusMapping, SyncConfig, SyncSection,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use jpd_gateway::IssueState;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    const YAML: &str = r#"
source:
  query: project = DISC
  base_url: https://example.atlassian.net/
mapping:
  title: "{{fields.summary}}"
  body: fields.description
  labels:
    - fields.labels
    - field: fields.priority
      values:
        High: "priority: high"
  status:
    field: fields.status
    closed: [Done]
sync:
  direction: bidirectional
  state_to_status:
    closed: Done
"#;

    #[test]
    fn yaml_with_defaults() {
        let config = SyncConfig::from_yaml(YAML).unwrap();

        assert_eq!(config.source.max_results, 1_000);
        assert_eq!(config.mapping.labels.len(), 2);
        assert!(config.hierarchy.enabled);
        assert_eq!(config.hierarchy.section_title, "Subtasks");
        assert!(config.sync.is_bidirectional());
        assert!(!config.sync.comments);
        assert_eq!(config.sync.state_to_status.status_for(IssueState::Closed), Some("Done"));
        assert_eq!(config.sync.state_to_status.status_for(IssueState::Open), None);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.cache.connection_ttl().as_secs(), 300);
    }

    #[test]
    fn original_link_trims_trailing_slash() {
        let config = SyncConfig::from_yaml(YAML).unwrap();
        assert_eq!(
            config.source.original_link("DISC-1").as_deref(),
            Some("https://example.atlassian.net/browse/DISC-1")
        );
    }

    #[test]
    fn status_mapping_ignores_case() {
        let mapping = StatusMapping {
            field: "fields.status".into(),
            closed: vec!["Done".into()],
        };
        assert_eq!(mapping.state_for("done"), IssueState::Closed);
        assert_eq!(mapping.state_for("In Progress"), IssueState::Open);
    }

    #[test]
    fn function_mappings_are_listed_by_target() {
        let config = SyncConfig::from_yaml(
            r#"
source:
  query: project = DISC
mapping:
  title:
    function: fns/title
  body: fields.description
  labels:
    - fields.labels
    - function: fns/size
"#,
        )
        .unwrap();
        assert_eq!(
            config.mapping.function_mappings(),
            vec![("title", "fns/title"), ("labels", "fns/size")]
        );
        assert!(SyncConfig::from_yaml(YAML).unwrap().mapping.function_mappings().is_empty());
    }

    #[test]
    fn load_detects_format_from_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("sync.toml");
        std::fs::write(
            &toml_path,
            r#"
[source]
query = "project = DISC"

[mapping]
title = "fields.summary"

[sync]
direction = "one-way"
"#,
        )
        .unwrap();
        let config = SyncConfig::load(&toml_path).unwrap();
        assert_eq!(config.sync.direction, Direction::OneWay);

        let json_path = dir.path().join("sync.json");
        std::fs::write(
            &json_path,
            r#"{"source": {"query": "q", "max_results": 5}, "mapping": {"title": "fields.summary"}}"#,
        )
        .unwrap();
        assert_eq!(SyncConfig::load(&json_path).unwrap().source.max_results, 5);
    }

    #[test]
    fn load_errors_are_fatal() {
        let dir = tempfile::tempdir().unwrap();

        let missing = SyncConfig::load(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(missing, Error::ConfigNotFound { .. }));

        let ini = dir.path().join("sync.ini");
        std::fs::write(&ini, "x").unwrap();
        assert!(matches!(
            SyncConfig::load(&ini).unwrap_err(),
            Error::UnsupportedFormat { .. }
        ));

        let bad = dir.path().join("sync.yaml");
        std::fs::write(&bad, "source: [").unwrap();
        let err = SyncConfig::load(&bad).unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("YAML"));
    }

    #[test]
    fn format_detection() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")).unwrap(), ConfigFormat::Yaml);
        assert!(ConfigFormat::from_path(Path::new("noext")).is_err());
    }
}
