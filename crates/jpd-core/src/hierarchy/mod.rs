//! Hierarchy projection
//!
//! Parent/child links live in issue bodies only: the child carries a
//! `Parent: #N` line and the parent lists its children in a task list.
//! Nothing else indexes the hierarchy.

mod projector;

pub use projector::{MAX_HIERARCHY_DEPTH, Projector};
