//! Record store traits
//!
//! Implemented by the HTTP clients for the two trackers (authentication and
//! transport live there) and by the in-memory stores in [`crate::memory`].

use async_trait::async_trait;

use crate::Result;
use crate::model::{
    Comment, Issue, IssueDraft, IssuePatch, SourcePage, SourceQuery, SourceRecord,
};

/// The upstream product-discovery tracker
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Stable identifier of the credential set, used as the connection-cache key.
    fn credential_id(&self) -> String;

    async fn verify_credentials(&self) -> Result<()>;

    /// Fetch one page of results. `page_token` is `None` for the first page.
    async fn search_page(
        &self,
        query: &SourceQuery,
        page_token: Option<&str>,
    ) -> Result<SourcePage>;

    async fn get(&self, key: &str) -> Result<Option<SourceRecord>>;

    async fn update_status(&self, key: &str, status: &str) -> Result<()>;

    async fn list_comments(&self, key: &str) -> Result<Vec<Comment>>;

    async fn add_comment(&self, key: &str, body: &str) -> Result<()>;
}

/// The downstream code-hosting issue tracker
#[async_trait]
pub trait IssueStore: Send + Sync {
    fn credential_id(&self) -> String;

    async fn verify_credentials(&self) -> Result<()>;

    /// Full-text search over issue bodies.
    async fn search(&self, text: &str) -> Result<Vec<Issue>>;

    async fn get(&self, number: u64) -> Result<Issue>;

    async fn create(&self, draft: &IssueDraft) -> Result<Issue>;

    async fn update(&self, number: u64, patch: &IssuePatch) -> Result<Issue>;

    async fn list_comments(&self, number: u64) -> Result<Vec<Comment>>;

    async fn add_comment(&self, number: u64, body: &str) -> Result<()>;

    async fn list_labels(&self) -> Result<Vec<String>>;

    async fn create_label(&self, name: &str) -> Result<()>;
}
