//! Field mapping specs and the [`Transformer`]

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::Result;
use crate::function::{FunctionLoader, FunctionRegistry};
use crate::template;
use crate::value::{display_value, resolve, unwrap_value};

/// How a destination value is produced from a source record.
///
/// A bare string is a template when it contains `{{`, otherwise a field path:
///
/// ```yaml
/// title: "{{fields.summary | trim}}"
/// body:
///   template: "{{fields.description}}"
/// labels:
///   - fields.labels
///   - field: fields.priority
///     values:
///       High: "priority: high"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldMapping {
    Shorthand(String),
    Detailed(MappingSpec),
}

/// Explicit mapping form. When several strategies are set the first in
/// `function`, `template`, lookup (`field` + `values`), `field` wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, Value>,
}

impl FieldMapping {
    pub fn field(path: impl Into<String>) -> Self {
        Self::Detailed(MappingSpec {
            field: Some(path.into()),
            ..Default::default()
        })
    }

    pub fn template(template: impl Into<String>) -> Self {
        Self::Detailed(MappingSpec {
            template: Some(template.into()),
            ..Default::default()
        })
    }

    pub fn function(path: impl Into<String>) -> Self {
        Self::Detailed(MappingSpec {
            function: Some(path.into()),
            ..Default::default()
        })
    }

    /// Function path when this mapping calls a registered function.
    pub fn function_path(&self) -> Option<&str> {
        match self {
            Self::Detailed(spec) => spec.function.as_deref(),
            Self::Shorthand(_) => None,
        }
    }

    pub fn lookup<K, V>(path: impl Into<String>, table: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Self::Detailed(MappingSpec {
            field: Some(path.into()),
            values: table
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Default::default()
        })
    }
}

/// Which resolution strategy a mapping uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Function,
    Template,
    Lookup,
    Field,
    Empty,
}

impl MappingSpec {
    pub fn strategy(&self) -> Strategy {
        if self.function.is_some() {
            Strategy::Function
        } else if self.template.is_some() {
            Strategy::Template
        } else if self.field.is_some() && !self.values.is_empty() {
            Strategy::Lookup
        } else if self.field.is_some() {
            Strategy::Field
        } else {
            Strategy::Empty
        }
    }
}

/// Maps source records to destination values.
///
/// Stateless apart from the function cache.
#[derive(Debug, Default)]
pub struct Transformer {
    functions: FunctionRegistry,
}

impl Transformer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(loader: impl FunctionLoader + 'static) -> Self {
        Self {
            functions: FunctionRegistry::new(loader),
        }
    }

    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Resolve `mapping` against `record`.
    ///
    /// Missing fields yield `Value::Null` (or `""` for templates).
    pub fn transform(&self, mapping: &FieldMapping, record: &Value) -> Result<Value> {
        match mapping {
            FieldMapping::Shorthand(s) if template::is_template(s) => {
                template::render(s, record).map(Value::String)
            }
            FieldMapping::Shorthand(path) => field_value(record, path),
            FieldMapping::Detailed(spec) => self.transform_spec(spec, record),
        }
    }

    /// Resolve a mapping and render the result as a string.
    pub fn transform_to_string(&self, mapping: &FieldMapping, record: &Value) -> Result<String> {
        self.transform(mapping, record).map(|v| display_value(&v))
    }

    fn transform_spec(&self, spec: &MappingSpec, record: &Value) -> Result<Value> {
        match spec.strategy() {
            Strategy::Function => {
                let path = spec.function.as_deref().unwrap_or_default();
                self.functions.call(path, record)
            }
            Strategy::Template => {
                let template = spec.template.as_deref().unwrap_or_default();
                template::render(template, record).map(Value::String)
            }
            Strategy::Lookup => {
                let raw = field_value(record, spec.field.as_deref().unwrap_or_default())?;
                Ok(lookup(&spec.values, raw))
            }
            Strategy::Field => field_value(record, spec.field.as_deref().unwrap_or_default()),
            Strategy::Empty => Ok(Value::Null),
        }
    }
}

/// Convenience wrapper using a transformer with no custom functions.
pub fn transform(mapping: &FieldMapping, record: &Value) -> Result<Value> {
    Transformer::new().transform(mapping, record)
}

fn field_value(record: &Value, path: &str) -> Result<Value> {
    Ok(resolve(record, path)?
        .map(unwrap_value)
        .unwrap_or(Value::Null))
}

fn lookup(table: &BTreeMap<String, Value>, raw: Value) -> Value {
    match raw {
        Value::Array(items) => Value::Array(items.into_iter().map(|v| lookup(table, v)).collect()),
        Value::Null => Value::Null,
        other => table
            .get(&display_value(&other))
            .cloned()
            .unwrap_or(other),
    }
}
