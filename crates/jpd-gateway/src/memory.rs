//! In-memory record stores
//!
//! Used for plan/dry-run over snapshots and throughout the test suites.
//! Both stores log every call so callers can assert on traffic, and accept
//! queued failures to simulate rate limits and outages.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::model::{
    Comment, Issue, IssueDraft, IssuePatch, IssueState, SourcePage, SourceQuery, SourceRecord,
};
use crate::store::{IssueStore, SourceStore};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A call received by [`MemoryIssueStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueCall {
    Verify,
    Search(String),
    Get(u64),
    Create(String),
    Update(u64),
    ListComments(u64),
    AddComment(u64),
    ListLabels,
    CreateLabel(String),
}

impl IssueCall {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Create(_) | Self::Update(_) | Self::AddComment(_) | Self::CreateLabel(_)
        )
    }
}

#[derive(Debug, Default)]
struct IssueInner {
    issues: BTreeMap<u64, Issue>,
    comments: HashMap<u64, Vec<Comment>>,
    labels: BTreeSet<String>,
    calls: Vec<IssueCall>,
    failures: VecDeque<Error>,
    reject_credentials: bool,
    next_comment: u64,
}

impl IssueInner {
    fn begin(&mut self, call: IssueCall) -> Result<()> {
        self.calls.push(call);
        match self.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Destination tracker held in memory
#[derive(Debug, Default)]
pub struct MemoryIssueStore {
    inner: Mutex<IssueInner>,
}

impl MemoryIssueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_issues(issues: impl IntoIterator<Item = Issue>) -> Self {
        let store = Self::new();
        for issue in issues {
            store.insert_issue(issue);
        }
        store
    }

    /// Insert or replace an issue without logging a call.
    pub fn insert_issue(&self, issue: Issue) {
        let mut inner = lock(&self.inner);
        inner.labels.extend(issue.labels.iter().cloned());
        inner.issues.insert(issue.number, issue);
    }

    pub fn issue(&self, number: u64) -> Option<Issue> {
        lock(&self.inner).issues.get(&number).cloned()
    }

    pub fn issues(&self) -> Vec<Issue> {
        lock(&self.inner).issues.values().cloned().collect()
    }

    pub fn comments(&self, number: u64) -> Vec<Comment> {
        lock(&self.inner)
            .comments
            .get(&number)
            .cloned()
            .unwrap_or_default()
    }

    pub fn labels(&self) -> Vec<String> {
        lock(&self.inner).labels.iter().cloned().collect()
    }

    /// Simulate a human edit: set the state and bump `updated_at`.
    pub fn set_state(&self, number: u64, state: IssueState) {
        if let Some(issue) = lock(&self.inner).issues.get_mut(&number) {
            issue.state = state;
            issue.updated_at = Utc::now();
        }
    }

    /// Simulate a human edit of the body.
    pub fn edit_body(&self, number: u64, edit: impl FnOnce(&str) -> String) {
        if let Some(issue) = lock(&self.inner).issues.get_mut(&number) {
            issue.body = edit(&issue.body);
            issue.updated_at = Utc::now();
        }
    }

    /// Simulate a comment written directly on the destination.
    pub fn push_comment(&self, number: u64, author: &str, body: &str) -> String {
        let mut inner = lock(&self.inner);
        inner.next_comment += 1;
        let id = inner.next_comment.to_string();
        inner.comments.entry(number).or_default().push(Comment {
            id: id.clone(),
            author: author.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        });
        id
    }

    /// Make the next call fail with `err`. Queued failures apply in order.
    pub fn fail_next(&self, err: Error) {
        lock(&self.inner).failures.push_back(err);
    }

    pub fn reject_credentials(&self, reject: bool) {
        lock(&self.inner).reject_credentials = reject;
    }

    pub fn calls(&self) -> Vec<IssueCall> {
        lock(&self.inner).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.inner).calls.clear();
    }

    pub fn mutation_count(&self) -> usize {
        lock(&self.inner)
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .count()
    }
}

#[async_trait]
impl IssueStore for MemoryIssueStore {
    fn credential_id(&self) -> String {
        "memory:issues".to_string()
    }

    async fn verify_credentials(&self) -> Result<()> {
        let mut inner = lock(&self.inner);
        inner.begin(IssueCall::Verify)?;
        if inner.reject_credentials {
            return Err(Error::Unauthorized {
                service: "github".into(),
                message: "Bad credentials".into(),
            });
        }
        Ok(())
    }

    async fn search(&self, text: &str) -> Result<Vec<Issue>> {
        let mut inner = lock(&self.inner);
        inner.begin(IssueCall::Search(text.to_string()))?;
        Ok(inner
            .issues
            .values()
            .filter(|issue| issue.body.contains(text))
            .cloned()
            .collect())
    }

    async fn get(&self, number: u64) -> Result<Issue> {
        let mut inner = lock(&self.inner);
        inner.begin(IssueCall::Get(number))?;
        inner
            .issues
            .get(&number)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("issue #{number}")))
    }

    async fn create(&self, draft: &IssueDraft) -> Result<Issue> {
        let mut inner = lock(&self.inner);
        inner.begin(IssueCall::Create(draft.title.clone()))?;
        let number = inner.issues.keys().next_back().copied().unwrap_or(0) + 1;
        let issue = Issue {
            number,
            title: draft.title.clone(),
            body: draft.body.clone(),
            state: draft.state,
            labels: draft.labels.clone(),
            updated_at: Utc::now(),
        };
        inner.labels.extend(issue.labels.iter().cloned());
        inner.issues.insert(number, issue.clone());
        Ok(issue)
    }

    async fn update(&self, number: u64, patch: &IssuePatch) -> Result<Issue> {
        let mut inner = lock(&self.inner);
        inner.begin(IssueCall::Update(number))?;
        let current = inner
            .issues
            .get(&number)
            .ok_or_else(|| Error::NotFound(format!("issue #{number}")))?;
        let updated = current.patched(patch, Utc::now());
        inner.issues.insert(number, updated.clone());
        Ok(updated)
    }

    async fn list_comments(&self, number: u64) -> Result<Vec<Comment>> {
        let mut inner = lock(&self.inner);
        inner.begin(IssueCall::ListComments(number))?;
        Ok(inner.comments.get(&number).cloned().unwrap_or_default())
    }

    async fn add_comment(&self, number: u64, body: &str) -> Result<()> {
        {
            let mut inner = lock(&self.inner);
            inner.begin(IssueCall::AddComment(number))?;
            if !inner.issues.contains_key(&number) {
                return Err(Error::NotFound(format!("issue #{number}")));
            }
        }
        self.push_comment(number, "jpd-sync", body);
        Ok(())
    }

    async fn list_labels(&self) -> Result<Vec<String>> {
        let mut inner = lock(&self.inner);
        inner.begin(IssueCall::ListLabels)?;
        Ok(inner.labels.iter().cloned().collect())
    }

    async fn create_label(&self, name: &str) -> Result<()> {
        let mut inner = lock(&self.inner);
        inner.begin(IssueCall::CreateLabel(name.to_string()))?;
        if !inner.labels.insert(name.to_string()) {
            return Err(Error::http("github", 422, "already_exists"));
        }
        Ok(())
    }
}

/// A call received by [`MemorySourceStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    Verify,
    SearchPage(Option<String>),
    Get(String),
    UpdateStatus(String, String),
    ListComments(String),
    AddComment(String),
}

impl SourceCall {
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::UpdateStatus(..) | Self::AddComment(_))
    }
}

#[derive(Debug)]
struct SourceInner {
    records: BTreeMap<String, SourceRecord>,
    comments: HashMap<String, Vec<Comment>>,
    page_size: usize,
    status_field: String,
    calls: Vec<SourceCall>,
    failures: VecDeque<Error>,
    reject_credentials: bool,
    next_comment: u64,
}

impl SourceInner {
    fn begin(&mut self, call: SourceCall) -> Result<()> {
        self.calls.push(call);
        match self.failures.pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Upstream tracker held in memory
///
/// Search ignores the query text and returns every record ordered by key,
/// `page_size` per page. Page tokens are opaque to callers.
#[derive(Debug)]
pub struct MemorySourceStore {
    inner: Mutex<SourceInner>,
}

impl Default for MemorySourceStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(SourceInner {
                records: BTreeMap::new(),
                comments: HashMap::new(),
                page_size: 50,
                status_field: "status".to_string(),
                calls: Vec::new(),
                failures: VecDeque::new(),
                reject_credentials: false,
                next_comment: 0,
            }),
        }
    }
}

impl MemorySourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = SourceRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.upsert(record);
        }
        store
    }

    pub fn with_page_size(self, page_size: usize) -> Self {
        lock(&self.inner).page_size = page_size.max(1);
        self
    }

    /// Field written by `update_status`, as `{"value": <status>}`.
    pub fn with_status_field(self, field: impl Into<String>) -> Self {
        lock(&self.inner).status_field = field.into();
        self
    }

    pub fn upsert(&self, record: SourceRecord) {
        lock(&self.inner)
            .records
            .insert(record.key.clone(), record);
    }

    pub fn record(&self, key: &str) -> Option<SourceRecord> {
        lock(&self.inner).records.get(key).cloned()
    }

    pub fn comments(&self, key: &str) -> Vec<Comment> {
        lock(&self.inner)
            .comments
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail_next(&self, err: Error) {
        lock(&self.inner).failures.push_back(err);
    }

    pub fn reject_credentials(&self, reject: bool) {
        lock(&self.inner).reject_credentials = reject;
    }

    pub fn calls(&self) -> Vec<SourceCall> {
        lock(&self.inner).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.inner).calls.clear();
    }

    pub fn mutation_count(&self) -> usize {
        lock(&self.inner)
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .count()
    }
}

#[async_trait]
impl SourceStore for MemorySourceStore {
    fn credential_id(&self) -> String {
        "memory:source".to_string()
    }

    async fn verify_credentials(&self) -> Result<()> {
        let mut inner = lock(&self.inner);
        inner.begin(SourceCall::Verify)?;
        if inner.reject_credentials {
            return Err(Error::Unauthorized {
                service: "jira".into(),
                message: "Client must be authenticated".into(),
            });
        }
        Ok(())
    }

    async fn search_page(
        &self,
        _query: &SourceQuery,
        page_token: Option<&str>,
    ) -> Result<SourcePage> {
        let mut inner = lock(&self.inner);
        inner.begin(SourceCall::SearchPage(page_token.map(String::from)))?;

        let offset = match page_token {
            Some(token) => token
                .strip_prefix("page-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| Error::http("jira", 400, format!("invalid page token {token}")))?,
            None => 0,
        };
        let size = inner.page_size;
        let records: Vec<SourceRecord> = inner
            .records
            .values()
            .skip(offset)
            .take(size)
            .cloned()
            .collect();
        let next = offset + records.len();
        let next_page_token = (next < inner.records.len()).then(|| format!("page-{next}"));

        Ok(SourcePage {
            records,
            next_page_token,
        })
    }

    async fn get(&self, key: &str) -> Result<Option<SourceRecord>> {
        let mut inner = lock(&self.inner);
        inner.begin(SourceCall::Get(key.to_string()))?;
        Ok(inner.records.get(key).cloned())
    }

    async fn update_status(&self, key: &str, status: &str) -> Result<()> {
        let mut inner = lock(&self.inner);
        inner.begin(SourceCall::UpdateStatus(key.to_string(), status.to_string()))?;
        let field = inner.status_field.clone();
        let record = inner
            .records
            .get_mut(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))?;
        record.fields.insert(field, json!({ "value": status }));
        record.updated = Utc::now();
        Ok(())
    }

    async fn list_comments(&self, key: &str) -> Result<Vec<Comment>> {
        let mut inner = lock(&self.inner);
        inner.begin(SourceCall::ListComments(key.to_string()))?;
        Ok(inner.comments.get(key).cloned().unwrap_or_default())
    }

    async fn add_comment(&self, key: &str, body: &str) -> Result<()> {
        let mut inner = lock(&self.inner);
        inner.begin(SourceCall::AddComment(key.to_string()))?;
        if !inner.records.contains_key(key) {
            return Err(Error::NotFound(key.to_string()));
        }
        inner.next_comment += 1;
        let id = format!("c{}", inner.next_comment);
        inner.comments.entry(key.to_string()).or_default().push(Comment {
            id,
            author: "jpd-sync".to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        });
        Ok(())
    }
}
