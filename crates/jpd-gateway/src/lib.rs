//! Rate-limited access to the source and destination record stores
//!
//! The [`Gateway`] wraps a [`SourceStore`] and an [`IssueStore`] with
//! exponential-backoff retry, page-token paging, a credential-check cache
//! and dry-run short-circuiting of every mutating call.

pub mod cache;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod model;
pub mod retry;
pub mod store;

pub use cache::{ConnectionCache, DEFAULT_CONNECTION_TTL, LabelCache, credential_fingerprint};
pub use error::{Error, Result};
pub use gateway::{Gateway, RetryObserver};
pub use memory::{IssueCall, MemoryIssueStore, MemorySourceStore, SourceCall};
pub use model::{
    Comment, Issue, IssueDraft, IssuePatch, IssueState, SourcePage, SourceQuery, SourceRecord,
};
pub use retry::{RetryPolicy, with_retry};
pub use store::{IssueStore, SourceStore};
