//! Reconciliation between source records and destination issues
//!
//! This module provides:
//! - **correspondence**: source key to issue map rebuilt from state blocks
//! - **state**: per-record classification and the action it implies
//! - **render**: mapped output and sync hash of a source record
//! - **engine**: the pass loop with per-record error isolation

mod correspondence;
mod engine;
mod order;
mod render;
mod report;
mod state;

pub use correspondence::{CorrespondenceMap, ManagedIssue};
pub use engine::{SyncEngine, SyncOptions, comment_tag};
pub use order::parents_first;
pub use render::{Rendered, render_record};
pub use report::{ListChange, ParentLink, RecordFailure, RecordOutcome, SyncReport};
pub use state::{SyncAction, SyncState, classify};
