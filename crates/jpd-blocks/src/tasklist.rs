//! Child task lists inside parent issue bodies.
//!
//! A parent lists its children as a markdown checklist in a section opened
//! by a hidden marker, placed after the rendered content and before the
//! state block:
//!
//! ```text
//! <!-- jpd-sync-tasklist -->
//! ## Subtasks
//! - [ ] #12 Design export dialog
//! - [x] #13 Add CSV writer
//! ```
//!
//! The header must be one of [`SECTION_SYNONYMS`]. The marked checklist is
//! the only index of children; checklists in the rendered content are never
//! touched, even under a synonym heading. Edits are
//! line based so every line other than the one being inserted or toggled is
//! preserved byte for byte.

use regex::Regex;
use std::sync::LazyLock;

use crate::metadata;

/// Section title used when a parent has no task list yet.
pub const DEFAULT_SECTION_TITLE: &str = "Subtasks";

/// Hidden line opening the projected task list section.
pub const SECTION_MARKER: &str = "<!-- jpd-sync-tasklist -->";

static ITEM_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*- \[([ xX])\] #(\d+)(?:\s+(.*?))?\s*$").expect("Invalid task item regex")
});

/// Any checklist line, including ones not referencing an issue.
static CHECKLIST_LINE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*] \[[ xX]\]").expect("Invalid checklist regex"));

/// Accepted section titles, compared case-insensitively.
pub const SECTION_SYNONYMS: &[&str] = &["Subtasks", "Sub-tasks", "Sub-issues", "Child issues", "Tasks"];

static HEADING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#{2,3}\s+(.+?)\s*$").expect("Invalid heading regex"));

/// `## <synonym>` or `### <synonym>`.
pub fn is_section_header(line: &str) -> bool {
    HEADING_REGEX.captures(line.trim()).is_some_and(|caps| {
        SECTION_SYNONYMS
            .iter()
            .any(|title| title.eq_ignore_ascii_case(&caps[1]))
    })
}

/// One `- [ ] #N title` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskItem {
    pub number: u64,
    pub checked: bool,
    pub title: String,
    /// 0-based line index within the body
    pub line: usize,
}

/// What [`ensure_item`] did to the body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemChange {
    Inserted,
    Toggled,
    Unchanged,
}

impl ItemChange {
    pub fn is_changed(self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

fn parse_item(line: &str, index: usize) -> Option<TaskItem> {
    let caps = ITEM_REGEX.captures(line)?;
    let number = caps[2].parse().ok()?;
    Some(TaskItem {
        number,
        checked: &caps[1] != " ",
        title: caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
        line: index,
    })
}

/// All checklist items referencing an issue number, in body order.
///
/// This includes items written by hand in the rendered content; see
/// [`listed_items`] for the projected children only.
pub fn parse_items(body: &str) -> Vec<TaskItem> {
    body.split('\n')
        .enumerate()
        .filter_map(|(i, line)| parse_item(line, i))
        .collect()
}

/// Items of the projected task list section, in body order.
pub fn listed_items(body: &str) -> Vec<TaskItem> {
    let lines: Vec<&str> = body.split('\n').collect();
    let Some(section) = find_section_in(body, &lines) else {
        return Vec::new();
    };
    (section.start..section.end)
        .filter_map(|i| parse_item(lines[i], i))
        .collect()
}

/// Issue numbers of all listed children, in body order, without duplicates.
pub fn child_numbers(body: &str) -> Vec<u64> {
    let mut seen = Vec::new();
    for item in listed_items(body) {
        if !seen.contains(&item.number) {
            seen.push(item.number);
        }
    }
    seen
}

/// Line span of the task list section: marker, section header, and the
/// contiguous checklist lines that follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    /// Index of the marker line
    pub start: usize,
    /// Index one past the last checklist line
    pub end: usize,
}

/// Locate the projected task list section.
pub fn find_section(body: &str) -> Option<Section> {
    let lines: Vec<&str> = body.split('\n').collect();
    find_section_in(body, &lines)
}

/// The last marked header before the state block wins; rendered content
/// always precedes the projected section.
fn find_section_in(body: &str, lines: &[&str]) -> Option<Section> {
    let limit = match metadata::find_block(body) {
        Some(block) => body[..block.span.start].matches('\n').count(),
        None => lines.len(),
    };
    let limit = limit.min(lines.len());
    let start = (0..limit).rev().find(|&i| {
        lines[i].trim() == SECTION_MARKER && i + 1 < limit && is_section_header(lines[i + 1])
    })?;

    let mut end = start + 2;
    while end < lines.len() && CHECKLIST_LINE_REGEX.is_match(lines[end]) {
        end += 1;
    }
    Some(Section { start, end })
}

/// Text of the task list section (marker, heading and items), if any.
///
/// Used to carry the list, checkbox state included, from a stale body into a
/// regenerated one.
pub fn extract_section(body: &str) -> Option<String> {
    let lines: Vec<&str> = body.split('\n').collect();
    let section = find_section_in(body, &lines)?;
    Some(lines[section.start..section.end].join("\n"))
}

/// Render a single checklist line.
pub fn format_item(number: u64, title: &str, checked: bool) -> String {
    let mark = if checked { 'x' } else { ' ' };
    let title = title.replace(['\r', '\n'], " ");
    let title = title.trim();
    if title.is_empty() {
        format!("- [{mark}] #{number}")
    } else {
        format!("- [{mark}] #{number} {title}")
    }
}

/// Make sure `number` is listed with the given checkbox state.
///
/// - listed with the right state: body returned unchanged
/// - listed with the wrong state: only that line's checkbox flips
/// - absent: inserted after the existing items of the task list section,
///   creating the section (titled `section_title`) before the state block
///   when the body has none
///
/// Only the marked section is consulted.
pub fn ensure_item(
    body: &str,
    number: u64,
    title: &str,
    checked: bool,
    section_title: &str,
) -> (String, ItemChange) {
    let mut lines: Vec<String> = body.split('\n').map(str::to_string).collect();
    let borrowed: Vec<&str> = lines.iter().map(String::as_str).collect();
    let Some(section) = find_section_in(body, &borrowed) else {
        let line = format_item(number, title, checked);
        return (insert_section(body, section_title, &line), ItemChange::Inserted);
    };

    if let Some(item) = (section.start..section.end)
        .find_map(|i| parse_item(&lines[i], i).filter(|item| item.number == number))
    {
        if item.checked == checked {
            return (body.to_string(), ItemChange::Unchanged);
        }
        lines[item.line] = toggle_checkbox(&lines[item.line], checked);
        return (lines.join("\n"), ItemChange::Toggled);
    }

    lines.insert(section.end, format_item(number, title, checked));
    (lines.join("\n"), ItemChange::Inserted)
}

/// Put a new section holding `line` before the state block, or at the end.
fn insert_section(body: &str, section_title: &str, line: &str) -> String {
    attach_section(body, &format!("{SECTION_MARKER}\n## {section_title}\n{line}"))
}

fn toggle_checkbox(line: &str, checked: bool) -> String {
    let Some(open) = line.find("- [") else {
        return line.to_string();
    };
    let mark_at = open + 3;
    let mark = if checked { "x" } else { " " };
    let mut out = String::with_capacity(line.len());
    out.push_str(&line[..mark_at]);
    out.push_str(mark);
    out.push_str(&line[mark_at + 1..]);
    out
}

/// Carry a task list section into a freshly rendered body.
///
/// `section` is placed after `body` content and before any state block.
pub fn attach_section(body: &str, section: &str) -> String {
    match metadata::find_block(body) {
        Some(block) => {
            let before = body[..block.span.start].trim_end();
            let rest = &body[block.span.start..];
            if before.is_empty() {
                format!("{section}\n\n{rest}")
            } else {
                format!("{before}\n\n{section}\n\n{rest}")
            }
        }
        None => {
            let before = body.trim_end();
            if before.is_empty() {
                section.to_string()
            } else {
                format!("{before}\n\n{section}")
            }
        }
    }
}
