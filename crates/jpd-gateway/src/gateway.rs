//! The [`Gateway`]: both stores behind retry, paging and dry-run.

use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::cache::{ConnectionCache, LabelCache, credential_fingerprint};
use crate::error::{Error, Result};
use crate::model::{Comment, Issue, IssueDraft, IssuePatch, SourceQuery, SourceRecord};
use crate::retry::{RetryPolicy, with_retry};
use crate::store::{IssueStore, SourceStore};

/// Caller-visible retry progress hook: `(attempt, delay, error)`
pub type RetryObserver = Arc<dyn Fn(u32, Duration, &Error) + Send + Sync>;

/// Rate-limited access to the source and destination stores.
///
/// Every call is retried per the [`RetryPolicy`]. In dry-run mode every
/// mutating call is skipped and logged, and returns what the live call
/// would most likely have returned, so callers run the exact same code path.
pub struct Gateway {
    source: Arc<dyn SourceStore>,
    issues: Arc<dyn IssueStore>,
    connections: Arc<ConnectionCache>,
    retry: RetryPolicy,
    dry_run: bool,
    observer: Option<RetryObserver>,
    mutations: AtomicUsize,
}

impl Gateway {
    pub fn new(
        source: Arc<dyn SourceStore>,
        issues: Arc<dyn IssueStore>,
        connections: Arc<ConnectionCache>,
    ) -> Self {
        Self {
            source,
            issues,
            connections,
            retry: RetryPolicy::default(),
            dry_run: false,
            observer: None,
            mutations: AtomicUsize::new(0),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_retry_observer(mut self, observer: RetryObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Number of mutating calls actually issued so far.
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    async fn call<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        with_retry(&self.retry, f, |attempt, delay, err| {
            tracing::warn!(
                operation,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Rate limited, backing off"
            );
            if let Some(observer) = &self.observer {
                observer(attempt, delay, err);
            }
        })
        .await
    }

    async fn mutate<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let result = self.call(operation, f).await;
        if result.is_ok() {
            self.mutations.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    /// Check both credential sets, skipping any verified within the cache TTL.
    ///
    /// # Errors
    ///
    /// Returns the store's error (typically [`Error::Unauthorized`]) for the
    /// first rejected credential set. Callers treat this as fatal.
    pub async fn verify_credentials(&self) -> Result<()> {
        let source_id = format!("source:{}", credential_fingerprint(&self.source.credential_id()));
        let source = &self.source;
        self.verify_one(&source_id, move || source.verify_credentials())
            .await?;

        let issues_id = format!("issues:{}", credential_fingerprint(&self.issues.credential_id()));
        let issues = &self.issues;
        self.verify_one(&issues_id, move || issues.verify_credentials())
            .await
    }

    async fn verify_one<F, Fut>(&self, id: &str, f: F) -> Result<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if self.connections.is_fresh(id) {
            tracing::debug!(credential = id, "Credential check cached");
            return Ok(());
        }
        match self.call("verify_credentials", f).await {
            Ok(()) => {
                self.connections.record_success(id);
                Ok(())
            }
            Err(e) => {
                self.connections.invalidate(id);
                Err(e)
            }
        }
    }

    /// Run an upstream query, following page tokens until exhausted or the
    /// query's `max_results` cap is reached (`0` means no cap).
    pub async fn search_source(&self, query: &SourceQuery) -> Result<Vec<SourceRecord>> {
        let source = &self.source;
        let mut records: Vec<SourceRecord> = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let current = token.as_deref();
            let page = self
                .call("search_source", move || source.search_page(query, current))
                .await?;
            records.extend(page.records);

            if query.max_results > 0 && records.len() >= query.max_results {
                records.truncate(query.max_results);
                break;
            }
            match page.next_page_token {
                Some(next) if !next.is_empty() && token.as_deref() != Some(next.as_str()) => {
                    token = Some(next);
                }
                Some(next) if !next.is_empty() => {
                    tracing::warn!(token = %next, "Source returned the same page token twice, stopping");
                    break;
                }
                _ => break,
            }
        }

        tracing::debug!(count = records.len(), "Fetched source records");
        Ok(records)
    }

    pub async fn get_source(&self, key: &str) -> Result<Option<SourceRecord>> {
        let source = &self.source;
        self.call("get_source", move || source.get(key)).await
    }

    pub async fn list_source_comments(&self, key: &str) -> Result<Vec<Comment>> {
        let source = &self.source;
        self.call("list_source_comments", move || source.list_comments(key))
            .await
    }

    pub async fn update_source_status(&self, key: &str, status: &str) -> Result<()> {
        if self.dry_run {
            tracing::info!(jpd_key = key, status, "[dry-run] Would update source status");
            return Ok(());
        }
        let source = &self.source;
        self.mutate("update_source_status", move || source.update_status(key, status))
            .await
    }

    pub async fn add_source_comment(&self, key: &str, body: &str) -> Result<()> {
        if self.dry_run {
            tracing::info!(jpd_key = key, "[dry-run] Would add source comment");
            return Ok(());
        }
        let source = &self.source;
        self.mutate("add_source_comment", move || source.add_comment(key, body))
            .await
    }

    /// Full-text search over destination issue bodies.
    pub async fn search_issues(&self, text: &str) -> Result<Vec<Issue>> {
        let issues = &self.issues;
        self.call("search_issues", move || issues.search(text)).await
    }

    pub async fn get_issue(&self, number: u64) -> Result<Issue> {
        let issues = &self.issues;
        self.call("get_issue", move || issues.get(number)).await
    }

    /// Create an issue. Dry-run returns a placeholder numbered `0`.
    pub async fn create_issue(&self, draft: &IssueDraft) -> Result<Issue> {
        if self.dry_run {
            tracing::info!(title = %draft.title, "[dry-run] Would create issue");
            return Ok(Issue {
                number: 0,
                title: draft.title.clone(),
                body: draft.body.clone(),
                state: draft.state,
                labels: draft.labels.clone(),
                updated_at: Utc::now(),
            });
        }
        let issues = &self.issues;
        self.mutate("create_issue", move || issues.create(draft)).await
    }

    /// Update `current`. Dry-run returns `current` with the patch applied locally.
    pub async fn update_issue(&self, current: &Issue, patch: &IssuePatch) -> Result<Issue> {
        if patch.is_empty() {
            return Ok(current.clone());
        }
        if self.dry_run {
            tracing::info!(issue = current.number, "[dry-run] Would update issue");
            return Ok(current.patched(patch, Utc::now()));
        }
        let issues = &self.issues;
        let number = current.number;
        self.mutate("update_issue", move || issues.update(number, patch))
            .await
    }

    pub async fn list_issue_comments(&self, number: u64) -> Result<Vec<Comment>> {
        let issues = &self.issues;
        self.call("list_issue_comments", move || issues.list_comments(number))
            .await
    }

    pub async fn add_issue_comment(&self, number: u64, body: &str) -> Result<()> {
        if self.dry_run {
            tracing::info!(issue = number, "[dry-run] Would add issue comment");
            return Ok(());
        }
        let issues = &self.issues;
        self.mutate("add_issue_comment", move || issues.add_comment(number, body))
            .await
    }

    /// Make sure every label in `labels` exists downstream.
    ///
    /// The cache is seeded with one listing call; missing labels are then
    /// created concurrently since they are disjoint resources.
    pub async fn ensure_labels(&self, cache: &mut LabelCache, labels: &[String]) -> Result<()> {
        if labels.is_empty() {
            return Ok(());
        }
        let issues = &self.issues;
        if !cache.is_loaded() {
            let existing = self
                .call("list_labels", move || issues.list_labels())
                .await?;
            cache.load(existing);
        }

        let missing: Vec<String> = cache.missing(labels).into_iter().map(String::from).collect();
        if missing.is_empty() {
            return Ok(());
        }

        if self.dry_run {
            tracing::info!(labels = ?missing, "[dry-run] Would create labels");
        } else {
            let results = futures::future::join_all(missing.iter().map(|label| {
                self.mutate("create_label", move || issues.create_label(label))
            }))
            .await;
            for (label, result) in missing.iter().zip(results) {
                match result {
                    Ok(()) => tracing::info!(label = %label, "Created label"),
                    // Another writer created it first.
                    Err(Error::Http { status: 422, .. }) => {}
                    Err(e) => return Err(e),
                }
            }
        }

        for label in missing {
            cache.insert(label);
        }
        Ok(())
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("retry", &self.retry)
            .field("dry_run", &self.dry_run)
            .field("mutations", &self.mutation_count())
            .finish()
    }
}
