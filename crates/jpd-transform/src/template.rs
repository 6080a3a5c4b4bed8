//! `{{path | filter}}` template rendering

use serde_json::Value;

use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::value::{display_value, parse_path, resolve_segments, unwrap_value};

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

/// Whether a string contains at least one placeholder.
pub fn is_template(s: &str) -> bool {
    s.contains(OPEN)
}

/// Render a template against a record.
///
/// Placeholders that resolve to nothing render as the empty string.
///
/// # Errors
///
/// Returns an error for unterminated placeholders, malformed paths and
/// unknown filters.
pub fn render(template: &str, record: &Value) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut cursor = 0;

    while let Some(rel_open) = template[cursor..].find(OPEN) {
        let open = cursor + rel_open;
        out.push_str(&template[cursor..open]);

        let expr_start = open + OPEN.len();
        let Some(rel_close) = template[expr_start..].find(CLOSE) else {
            return Err(Error::invalid_template(open, "unterminated placeholder"));
        };
        let close = expr_start + rel_close;

        let value = evaluate(&template[expr_start..close], record, open)?;
        out.push_str(&display_value(&value));

        cursor = close + CLOSE.len();
    }

    out.push_str(&template[cursor..]);
    Ok(out)
}

/// Evaluate a single placeholder expression (without braces).
pub fn evaluate(expr: &str, record: &Value, position: usize) -> Result<Value> {
    let mut parts = split_pipes(expr).into_iter();
    let path = parts.next().unwrap_or_default();
    if path.trim().is_empty() {
        return Err(Error::invalid_template(position, "empty placeholder"));
    }

    let segments = parse_path(path)?;
    let mut value = resolve_segments(record, &segments)
        .map(unwrap_value)
        .unwrap_or(Value::Null);

    for part in parts {
        value = Filter::parse(part)?.apply(value);
    }
    Ok(value)
}

/// Split on `|` outside quotes and parentheses.
fn split_pipes(expr: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in expr.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, '|') if depth == 0 => {
                parts.push(&expr[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&expr[start..]);
    parts
}
