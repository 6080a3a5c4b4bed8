//! Template filters
//!
//! Filters are applied left to right after the placeholder path is resolved:
//! `{{fields.title | trim | lowercase | replace(" ", "-")}}`.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::value::display_value;

static SLUG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("Invalid slug regex"));

/// A parsed template filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Lowercase,
    Uppercase,
    Slugify,
    Trim,
    Replace { from: String, to: String },
    Join { separator: String },
}

impl Filter {
    /// Parse a single filter expression such as `trim` or `replace(a,b)`.
    pub fn parse(expr: &str) -> Result<Self> {
        let expr = expr.trim();
        let (name, raw_args) = match expr.find('(') {
            Some(open) => {
                let Some(inner) = expr[open + 1..].strip_suffix(')') else {
                    return Err(Error::invalid_template(
                        open,
                        format!("unclosed argument list in filter '{expr}'"),
                    ));
                };
                (expr[..open].trim(), Some(inner))
            }
            None => (expr, None),
        };

        match name {
            "lowercase" => no_args(name, raw_args).map(|_| Self::Lowercase),
            "uppercase" => no_args(name, raw_args).map(|_| Self::Uppercase),
            "slugify" => no_args(name, raw_args).map(|_| Self::Slugify),
            "trim" => no_args(name, raw_args).map(|_| Self::Trim),
            "replace" => {
                let args = parse_args(raw_args.unwrap_or_default());
                if args.len() != 2 {
                    return Err(Error::FilterArity {
                        name: name.to_string(),
                        expected: 2,
                        actual: args.len(),
                    });
                }
                let mut args = args.into_iter();
                let from = args.next().unwrap_or_default();
                let to = args.next().unwrap_or_default();
                Ok(Self::Replace { from, to })
            }
            "join" => {
                let inner = raw_args.unwrap_or(", ");
                // Unquoted separators are taken verbatim so `join(, )` works.
                let separator = if starts_quoted(inner) {
                    parse_args(inner).into_iter().next().unwrap_or_default()
                } else {
                    inner.to_string()
                };
                Ok(Self::Join { separator })
            }
            other => Err(Error::UnknownFilter {
                name: other.to_string(),
            }),
        }
    }

    /// Apply the filter to a resolved value.
    ///
    /// String filters applied to an array transform each element; `join`
    /// collapses an array into a single string.
    pub fn apply(&self, value: Value) -> Value {
        match self {
            Self::Join { separator } => match value {
                Value::Array(items) => Value::String(
                    items
                        .iter()
                        .map(display_value)
                        .filter(|s| !s.is_empty())
                        .collect::<Vec<_>>()
                        .join(separator),
                ),
                other => Value::String(display_value(&other)),
            },
            _ => match value {
                Value::Array(items) => {
                    Value::Array(items.into_iter().map(|item| self.apply(item)).collect())
                }
                Value::Null => Value::Null,
                other => Value::String(self.apply_str(&display_value(&other))),
            },
        }
    }

    fn apply_str(&self, input: &str) -> String {
        match self {
            Self::Lowercase => input.to_lowercase(),
            Self::Uppercase => input.to_uppercase(),
            Self::Trim => input.trim().to_string(),
            Self::Slugify => slugify(input),
            Self::Replace { from, to } => {
                if from.is_empty() {
                    input.to_string()
                } else {
                    input.replace(from.as_str(), to)
                }
            }
            Self::Join { .. } => input.to_string(),
        }
    }
}

/// Lowercase, collapse every run of non-alphanumerics into `-`, trim dashes.
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    SLUG_REGEX
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

fn no_args(name: &str, raw_args: Option<&str>) -> Result<()> {
    match raw_args {
        Some(args) if !args.trim().is_empty() => Err(Error::FilterArity {
            name: name.to_string(),
            expected: 0,
            actual: parse_args(args).len(),
        }),
        _ => Ok(()),
    }
}

fn starts_quoted(s: &str) -> bool {
    matches!(s.trim_start().chars().next(), Some('"') | Some('\''))
}

/// Split a comma-separated argument list, honouring single and double quotes.
///
/// Unquoted arguments are trimmed; quoted arguments are kept verbatim.
fn parse_args(inner: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut was_quoted = false;

    for c in inner.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '"' | '\'' => {
                    if current.trim().is_empty() {
                        current.clear();
                    }
                    quote = Some(c);
                    was_quoted = true;
                }
                c if was_quoted && c.is_whitespace() => {}
                ',' => {
                    args.push(finish_arg(&current, was_quoted));
                    current.clear();
                    was_quoted = false;
                }
                _ => current.push(c),
            },
        }
    }
    if !inner.trim().is_empty() {
        args.push(finish_arg(&current, was_quoted));
    }
    args
}

fn finish_arg(raw: &str, quoted: bool) -> String {
    if quoted {
        raw.to_string()
    } else {
        raw.trim().to_string()
    }
}
