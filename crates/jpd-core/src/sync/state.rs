//! Per-record classification and the action each state implies

use jpd_gateway::IssueState;
use serde::{Deserialize, Serialize};

use super::correspondence::ManagedIssue;

/// Relationship between a source record and its destination issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncState {
    /// No destination issue carries this key
    Unsynced,
    SyncedUnchanged,
    /// Mapped output hash differs from the stored one
    SyncedChangedUpstream,
    /// Hash equal but the destination state moved (bidirectional only)
    SyncedChangedDownstream,
    /// State block key not in this pass's candidate set
    OrphanDownstream,
}

/// What a pass does about a [`SyncState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncAction {
    Create,
    Skip,
    UpdateDownstream,
    UpdateUpstream,
    LeaveOrphan,
}

impl SyncState {
    pub fn action(self) -> SyncAction {
        match self {
            Self::Unsynced => SyncAction::Create,
            Self::SyncedUnchanged => SyncAction::Skip,
            Self::SyncedChangedUpstream => SyncAction::UpdateDownstream,
            Self::SyncedChangedDownstream => SyncAction::UpdateUpstream,
            Self::OrphanDownstream => SyncAction::LeaveOrphan,
        }
    }
}

impl SyncAction {
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Self::Create | Self::UpdateDownstream | Self::UpdateUpstream
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Skip => "skip",
            Self::UpdateDownstream => "update-downstream",
            Self::UpdateUpstream => "update-upstream",
            Self::LeaveOrphan => "leave-orphan",
        }
    }
}

impl std::fmt::Display for SyncAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a candidate record against its destination issue, if any.
///
/// Only the hash decides whether upstream changed; timestamps are ignored.
/// A destination state that differs from `target_state` under an unchanged
/// hash counts as a downstream change in bidirectional mode and is left alone
/// otherwise.
pub fn classify(
    existing: Option<&ManagedIssue>,
    new_hash: &str,
    target_state: IssueState,
    bidirectional: bool,
) -> SyncState {
    let Some(managed) = existing else {
        return SyncState::Unsynced;
    };
    if managed.metadata.sync_hash != new_hash {
        return SyncState::SyncedChangedUpstream;
    }
    if managed.issue.state != target_state {
        if bidirectional {
            return SyncState::SyncedChangedDownstream;
        }
        tracing::debug!(
            jpd_key = %managed.metadata.jpd_id,
            issue = managed.issue.number,
            "Destination state differs but direction is one-way"
        );
    }
    SyncState::SyncedUnchanged
}
