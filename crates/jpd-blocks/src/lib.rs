//! Sync state blocks and task-list markdown for jpd-sync.
//!
//! Destination issue bodies double as the sync database. This crate owns
//! the text formats involved:
//!
//! - [`metadata`]: the hidden `<!-- jpd-sync-metadata ... -->` state block
//! - [`tasklist`]: parent checklists of children (`- [x] #N title`)
//! - [`body`]: overall body layout and the `Parent: #N` reference
//!
//! Everything here is pure string manipulation; no I/O.

pub mod body;
pub mod error;
pub mod metadata;
pub mod tasklist;

pub use body::{BodyParts, compose, parent_line, parent_number, regenerate, render_visible};
pub use error::{Error, Result};
pub use metadata::{METADATA_MARKER, SyncMetadata, decode, encode, strip};
pub use tasklist::{
    DEFAULT_SECTION_TITLE, ItemChange, SECTION_MARKER, SECTION_SYNONYMS, TaskItem, child_numbers,
    ensure_item, extract_section, is_section_header, listed_items, parse_items,
};
