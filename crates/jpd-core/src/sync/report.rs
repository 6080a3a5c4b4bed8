//! Outcome of a reconciliation pass

use jpd_blocks::ItemChange;
use serde::{Deserialize, Serialize};

use super::state::{SyncAction, SyncState};

/// What the hierarchy post-step did to the parent's task list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListChange {
    Inserted,
    Toggled,
    Unchanged,
}

impl From<ItemChange> for ListChange {
    fn from(change: ItemChange) -> Self {
        match change {
            ItemChange::Inserted => Self::Inserted,
            ItemChange::Toggled => Self::Toggled,
            ItemChange::Unchanged => Self::Unchanged,
        }
    }
}

/// The parent link handled for a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    pub parent: u64,
    pub change: ListChange,
}

/// Result of reconciling one source record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub jpd_key: String,
    pub state: SyncState,
    pub action: SyncAction,
    /// Destination issue; `0` for an issue only planned in dry-run
    pub issue: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ParentLink>,
    #[serde(default)]
    pub comments_mirrored: usize,
    /// Degradations that did not fail the record
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl RecordOutcome {
    pub fn new(jpd_key: impl Into<String>, state: SyncState) -> Self {
        Self {
            jpd_key: jpd_key.into(),
            state,
            action: state.action(),
            issue: None,
            parent: None,
            comments_mirrored: 0,
            warnings: Vec::new(),
        }
    }

    /// One-line description, prefixed `[dry-run] Would` when planned only.
    pub fn describe(&self, dry_run: bool) -> String {
        let target = match self.issue {
            Some(n) if n != 0 => format!(" #{n}"),
            _ => String::new(),
        };
        let verb = match (self.action, dry_run) {
            (SyncAction::Create, false) => "Created issue",
            (SyncAction::Create, true) => "[dry-run] Would create issue",
            (SyncAction::UpdateDownstream, false) => "Updated issue",
            (SyncAction::UpdateDownstream, true) => "[dry-run] Would update issue",
            (SyncAction::UpdateUpstream, false) => "Pushed state upstream from issue",
            (SyncAction::UpdateUpstream, true) => "[dry-run] Would push state upstream from issue",
            (SyncAction::Skip, _) => "Unchanged issue",
            (SyncAction::LeaveOrphan, _) => "Left orphaned issue",
        };
        format!("{verb}{target} for {}", self.jpd_key)
    }
}

/// A record that failed; the rest of the pass went on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub jpd_key: String,
    pub error: String,
}

/// Report from a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub dry_run: bool,
    /// One entry per candidate record that was processed, in processing order
    pub records: Vec<RecordOutcome>,
    /// Managed issues whose key is outside the candidate set
    pub orphans: Vec<RecordOutcome>,
    pub failures: Vec<RecordFailure>,
    /// Mutating calls actually issued; always `0` in dry-run
    pub mutations: usize,
}

impl SyncReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn count(&self, action: SyncAction) -> usize {
        self.records.iter().filter(|r| r.action == action).count()
    }

    pub fn outcome(&self, jpd_key: &str) -> Option<&RecordOutcome> {
        self.records.iter().find(|r| r.jpd_key == jpd_key)
    }

    /// Human-readable action lines, orphans last.
    pub fn actions(&self) -> Vec<String> {
        self.records
            .iter()
            .chain(&self.orphans)
            .map(|r| r.describe(self.dry_run))
            .collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} created, {} updated, {} pushed upstream, {} unchanged, {} orphaned, {} failed",
            self.count(SyncAction::Create),
            self.count(SyncAction::UpdateDownstream),
            self.count(SyncAction::UpdateUpstream),
            self.count(SyncAction::Skip),
            self.orphans.len(),
            self.failures.len()
        )
    }
}
