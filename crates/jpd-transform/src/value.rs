//! Field path resolution and value shaping
//!
//! Paths use dot nesting with optional array indexes:
//!
//! ```text
//! fields.summary
//! fields.labels[0]
//! fields.components[1].name
//! ```
//!
//! A path that does not resolve yields `None`; absent data is never an error.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// Matches one dot-separated segment: a key followed by zero or more `[n]` indexes.
static SEGMENT_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^\[\]]*)((?:\[\d+\])*)$").expect("Invalid path segment regex")
});

static INDEX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)\]").expect("Invalid index regex"));

/// One step of a parsed field path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Parse a field path into segments.
///
/// # Errors
///
/// Returns [`Error::InvalidPath`] for empty paths, unbalanced brackets or
/// non-numeric indexes.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(Error::invalid_path(path, "path is empty"));
    }

    let mut segments = Vec::new();
    for part in trimmed.split('.') {
        let caps = SEGMENT_REGEX
            .captures(part)
            .ok_or_else(|| Error::invalid_path(path, format!("malformed segment '{part}'")))?;

        let key = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let indexes = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        if key.is_empty() && indexes.is_empty() {
            return Err(Error::invalid_path(path, "empty segment"));
        }
        if !key.is_empty() {
            segments.push(PathSegment::Key(key.to_string()));
        }
        for index in INDEX_REGEX.captures_iter(indexes) {
            let n = index[1]
                .parse::<usize>()
                .map_err(|e| Error::invalid_path(path, e.to_string()))?;
            segments.push(PathSegment::Index(n));
        }
    }

    Ok(segments)
}

/// Resolve a path against a JSON value.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Result<Option<&'a Value>> {
    let segments = parse_path(path)?;
    Ok(resolve_segments(root, &segments))
}

pub fn resolve_segments<'a>(root: &'a Value, segments: &[PathSegment]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
            (PathSegment::Index(i), Value::Array(items)) => items.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Unwrap select-field shapes into plain values.
///
/// - `{"value": "High"}` becomes `"High"`
/// - `[{"value": "a"}, {"value": "b"}]` becomes `["a", "b"]`
/// - user objects (`{"displayName": ..}`) become the display name
///
/// Everything else is returned unchanged.
pub fn unwrap_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(inner) = map.get("value") {
                unwrap_value(inner)
            } else if let Some(Value::String(name)) = map.get("displayName") {
                Value::String(name.clone())
            } else {
                value.clone()
            }
        }
        Value::Array(items) => Value::Array(items.iter().map(unwrap_value).collect()),
        other => other.clone(),
    }
}

/// Render a value the way templates print it.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// Flatten a mapped value into a list of non-empty strings.
///
/// Used for label mappings, where a single mapping may produce one label or many.
pub fn value_to_strings(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().flat_map(value_to_strings).collect(),
        other => {
            let s = display_value(other);
            let s = s.trim();
            if s.is_empty() {
                Vec::new()
            } else {
                vec![s.to_string()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_nested_path_with_indexes() {
        let segments = parse_path("fields.labels[1][0].name").unwrap();
        assert_eq!(
            segments,
            vec![
                PathSegment::Key("fields".into()),
                PathSegment::Key("labels".into()),
                PathSegment::Index(1),
                PathSegment::Index(0),
                PathSegment::Key("name".into()),
            ]
        );
    }

    #[test]
    fn parse_rejects_malformed_index() {
        assert!(parse_path("fields.labels[x]").is_err());
        assert!(parse_path("fields..summary").is_err());
        assert!(parse_path("  ").is_err());
    }

    #[test]
    fn resolve_missing_is_none() {
        let record = json!({"fields": {"summary": "x"}});
        assert!(resolve(&record, "fields.nope").unwrap().is_none());
        assert!(resolve(&record, "fields.summary[0]").unwrap().is_none());
    }

    #[test]
    fn unwrap_select_shapes() {
        assert_eq!(unwrap_value(&json!({"value": "High"})), json!("High"));
        assert_eq!(
            unwrap_value(&json!([{"value": "a"}, {"value": "b"}])),
            json!(["a", "b"])
        );
        assert_eq!(
            unwrap_value(&json!({"displayName": "Ada", "accountId": "1"})),
            json!("Ada")
        );
        assert_eq!(unwrap_value(&json!(3)), json!(3));
    }

    #[test]
    fn value_to_strings_flattens_and_drops_empty() {
        let v = json!(["a", ["b", ""], null, 4]);
        assert_eq!(value_to_strings(&v), vec!["a", "b", "4"]);
    }
}
