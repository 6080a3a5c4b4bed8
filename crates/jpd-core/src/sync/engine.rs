//! SyncEngine implementation
//!
//! One pass reads the full candidate set from the source and every managed
//! issue from the destination, then reconciles record by record. The only
//! persistent state is the state block inside each destination body.

use std::collections::HashSet;
use std::sync::Arc;

use jpd_blocks::{METADATA_MARKER, SyncMetadata, compose, regenerate};
use jpd_gateway::{
    ConnectionCache, Gateway, Issue, IssueDraft, IssuePatch, IssueState, IssueStore, LabelCache,
    SourceRecord, SourceStore,
};
use jpd_transform::Transformer;

use crate::Result;
use crate::config::SyncConfig;
use crate::hierarchy::{MAX_HIERARCHY_DEPTH, Projector};

use super::correspondence::{CorrespondenceMap, ManagedIssue};
use super::order::parents_first;
use super::render::{Rendered, render_record};
use super::report::{ParentLink, RecordFailure, RecordOutcome, SyncReport};
use super::state::{SyncState, classify};

/// Marker appended to comments mirrored upstream, one per destination comment.
pub fn comment_tag(comment_id: &str) -> String {
    format!("[github-comment:{comment_id}]")
}

/// Options for a reconciliation pass
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    /// If true, classify and plan every record without mutating either side.
    /// Actions will be prefixed with "[dry-run] Would ..."
    pub dry_run: bool,
}

/// Per-pass working state
struct Pass {
    correspondence: CorrespondenceMap,
    projector: Projector,
    labels: LabelCache,
}

/// Engine reconciling one source query with one destination repository
///
/// A pass is exclusive: [`SyncEngine::run`] takes `&mut self`.
pub struct SyncEngine {
    config: SyncConfig,
    gateway: Gateway,
    transformer: Transformer,
}

impl SyncEngine {
    pub fn new(
        config: SyncConfig,
        source: Arc<dyn SourceStore>,
        issues: Arc<dyn IssueStore>,
        connections: Arc<ConnectionCache>,
    ) -> Self {
        let gateway =
            Gateway::new(source, issues, connections).with_retry_policy(config.retry.clone());
        Self {
            config,
            gateway,
            transformer: Transformer::new(),
        }
    }

    /// Use a transformer with custom mapping functions registered.
    pub fn with_transformer(mut self, transformer: Transformer) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut Gateway {
        &mut self.gateway
    }

    /// Run one reconciliation pass.
    ///
    /// # Errors
    ///
    /// Only fatal errors are returned: rejected credentials, or a failure to
    /// read the candidate set or the managed issues. Everything else is
    /// recorded per record in the report.
    pub async fn run(&mut self, options: SyncOptions) -> Result<SyncReport> {
        let dry_run = options.dry_run || self.config.sync.dry_run;
        self.gateway.set_dry_run(dry_run);
        let mutations_before = self.gateway.mutation_count();
        let mut report = SyncReport::new(dry_run);

        self.gateway.verify_credentials().await?;
        let records = self
            .gateway
            .search_source(&self.config.source.to_query())
            .await?;
        let managed = self.gateway.search_issues(METADATA_MARKER).await?;
        tracing::info!(
            records = records.len(),
            managed = managed.len(),
            dry_run,
            "Starting reconciliation pass"
        );

        let mut pass = Pass {
            correspondence: CorrespondenceMap::build(managed),
            projector: Projector::new(self.config.hierarchy.section_title.clone()),
            labels: LabelCache::new(),
        };
        let seen: Vec<Issue> = pass.correspondence.iter().map(|m| m.issue.clone()).collect();
        for issue in seen {
            pass.projector.remember(issue);
        }

        for record in parents_first(&records) {
            match self.sync_record(&mut pass, record).await {
                Ok(outcome) => {
                    tracing::debug!(jpd_key = %record.key, action = %outcome.action, "Record reconciled");
                    report.records.push(outcome);
                }
                Err(e) if e.is_fatal() => {
                    tracing::error!(jpd_key = %record.key, error = %e, "Aborting pass");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(jpd_key = %record.key, error = %e, "Failed to sync record");
                    report.failures.push(RecordFailure {
                        jpd_key: record.key.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let candidates: HashSet<&str> = records.iter().map(|r| r.key.as_str()).collect();
        for orphan in pass.correspondence.orphans(&candidates) {
            tracing::info!(
                jpd_key = %orphan.metadata.jpd_id,
                issue = orphan.issue.number,
                "Source record out of scope, leaving issue untouched"
            );
            let mut outcome =
                RecordOutcome::new(orphan.metadata.jpd_id.clone(), SyncState::OrphanDownstream);
            outcome.issue = Some(orphan.issue.number);
            report.orphans.push(outcome);
        }

        report.mutations = self.gateway.mutation_count() - mutations_before;
        tracing::info!(summary = %report.summary(), "Reconciliation pass complete");
        Ok(report)
    }

    async fn sync_record(&self, pass: &mut Pass, record: &SourceRecord) -> Result<RecordOutcome> {
        let key = record.key.as_str();
        let rendered = render_record(&self.transformer, &self.config.mapping, record)?;
        let link = self.config.source.original_link(key);
        let mut warnings = Vec::new();
        let parent = self.resolve_parent(pass, record, &mut warnings).await?;

        let bidirectional = self.config.sync.is_bidirectional();
        let existing = pass.correspondence.get(key).cloned();
        let parts = rendered.body_parts(key, parent, link.as_deref());
        let hash = rendered.sync_hash(&parts, rendered.state);
        // Without a status mapping the destination owns its open/closed state.
        let manages_state = self.config.mapping.status.is_some();
        let target_state = match &existing {
            Some(managed) if !manages_state => managed.issue.state,
            _ => rendered.state,
        };
        let state = classify(existing.as_ref(), &hash, target_state, bidirectional);

        let mut outcome = RecordOutcome::new(key, state);
        outcome.warnings = warnings;
        let metadata = |hash: String| {
            SyncMetadata::new(key, record.updated, hash)
                .with_parent(record.parent_key.clone())
                .with_original_link(link.clone())
        };

        let issue = match &existing {
            None => {
                let draft = IssueDraft {
                    title: rendered.title.clone(),
                    body: compose(&parts, None, &metadata(hash.clone())),
                    labels: rendered.labels.clone(),
                    state: rendered.state,
                };
                self.create(pass, &rendered, &draft, metadata(hash)).await?
            }
            Some(managed) => match state {
                SyncState::SyncedChangedUpstream => {
                    let mut target = target_state;
                    let mut hashed_state = rendered.state;
                    if manages_state
                        && bidirectional
                        && managed.issue.state != rendered.state
                        && managed.issue.updated_at > record.updated
                    {
                        tracing::info!(
                            jpd_key = key,
                            issue = managed.issue.number,
                            "Destination state is newer, keeping it"
                        );
                        target = managed.issue.state;
                        hashed_state = target;
                        self.push_state_upstream(key, target, &mut outcome.warnings)
                            .await?;
                    }
                    let hash = rendered.sync_hash(&parts, hashed_state);
                    self.update(pass, managed, &rendered, &parts, target, metadata(hash))
                        .await?
                }
                SyncState::SyncedChangedDownstream => {
                    let target = managed.issue.state;
                    self.push_state_upstream(key, target, &mut outcome.warnings)
                        .await?;
                    let hash = rendered.sync_hash(&parts, target);
                    self.update(pass, managed, &rendered, &parts, target, metadata(hash))
                        .await?
                }
                _ => {
                    tracing::debug!(jpd_key = key, issue = managed.issue.number, "Unchanged");
                    managed.issue.clone()
                }
            },
        };
        outcome.issue = Some(issue.number);

        if existing.is_some() && bidirectional && self.config.sync.comments {
            outcome.comments_mirrored = self.mirror_comments(key, issue.number).await?;
        }

        if let Some(parent) = parent {
            outcome.parent = self
                .link_to_parent(pass, parent, &issue, &mut outcome.warnings)
                .await?;
        }

        Ok(outcome)
    }

    /// Destination number of the record's parent, or `None` when the record
    /// is synced flat: no parent, parent not synced yet, or too deep.
    async fn resolve_parent(
        &self,
        pass: &mut Pass,
        record: &SourceRecord,
        warnings: &mut Vec<String>,
    ) -> Result<Option<u64>> {
        if !self.config.hierarchy.enabled {
            return Ok(None);
        }
        let Some(parent_key) = record.parent_key.as_deref() else {
            return Ok(None);
        };
        if parent_key == record.key {
            tracing::warn!(jpd_key = %record.key, "Record names itself as parent, syncing flat");
            warnings.push("record is its own parent; synced flat".to_string());
            return Ok(None);
        }
        let Some(parent) = pass.correspondence.number_of(parent_key) else {
            tracing::debug!(
                jpd_key = %record.key,
                parent = parent_key,
                "Parent not synced yet, linking on a later pass"
            );
            return Ok(None);
        };

        let parent_depth = pass.projector.compute_depth(&self.gateway, parent).await?;
        if parent_depth >= MAX_HIERARCHY_DEPTH {
            tracing::warn!(
                jpd_key = %record.key,
                parent,
                depth = parent_depth + 1,
                "Hierarchy too deep, syncing flat"
            );
            warnings.push(format!(
                "nesting under #{parent} would exceed depth {MAX_HIERARCHY_DEPTH}; synced flat"
            ));
            return Ok(None);
        }
        Ok(Some(parent))
    }

    async fn create(
        &self,
        pass: &mut Pass,
        rendered: &Rendered,
        draft: &IssueDraft,
        metadata: SyncMetadata,
    ) -> Result<Issue> {
        self.gateway
            .ensure_labels(&mut pass.labels, &rendered.labels)
            .await?;
        let issue = self.gateway.create_issue(draft).await?;
        tracing::info!(jpd_key = %metadata.jpd_id, issue = issue.number, "Created issue");

        if issue.number != 0 {
            pass.correspondence.insert(issue.clone(), metadata);
            pass.projector.remember(issue.clone());
        }
        Ok(issue)
    }

    async fn update(
        &self,
        pass: &mut Pass,
        managed: &ManagedIssue,
        rendered: &Rendered,
        parts: &jpd_blocks::BodyParts<'_>,
        target: IssueState,
        metadata: SyncMetadata,
    ) -> Result<Issue> {
        self.gateway
            .ensure_labels(&mut pass.labels, &rendered.labels)
            .await?;

        // The projector may have rewritten this body earlier in the pass.
        let current = pass
            .projector
            .known(managed.issue.number)
            .cloned()
            .unwrap_or_else(|| managed.issue.clone());
        let body = regenerate(&current.body, parts, &metadata);

        let mut current_labels = current.labels.clone();
        current_labels.sort();
        current_labels.dedup();

        let patch = IssuePatch {
            title: (current.title != rendered.title).then(|| rendered.title.clone()),
            body: (current.body != body).then_some(body),
            state: (current.state != target).then_some(target),
            labels: (current_labels != rendered.labels).then(|| rendered.labels.clone()),
        };

        let updated = self.gateway.update_issue(&current, &patch).await?;
        tracing::info!(jpd_key = %metadata.jpd_id, issue = updated.number, "Updated issue");

        pass.correspondence.insert(updated.clone(), metadata);
        pass.projector.remember(updated.clone());
        Ok(updated)
    }

    async fn push_state_upstream(
        &self,
        key: &str,
        state: IssueState,
        warnings: &mut Vec<String>,
    ) -> Result<()> {
        match self.config.sync.state_to_status.status_for(state) {
            Some(status) => {
                self.gateway.update_source_status(key, status).await?;
                tracing::info!(jpd_key = key, status, "Pushed destination state upstream");
            }
            None => {
                tracing::warn!(jpd_key = key, %state, "No upstream status configured for state");
                warnings.push(format!("no upstream status configured for {state} issues"));
            }
        }
        Ok(())
    }

    /// Copy destination comments upstream, each at most once.
    async fn mirror_comments(&self, key: &str, number: u64) -> Result<usize> {
        if number == 0 {
            return Ok(0);
        }
        let downstream = self.gateway.list_issue_comments(number).await?;
        if downstream.is_empty() {
            return Ok(0);
        }
        let upstream = self.gateway.list_source_comments(key).await?;

        let mut mirrored = 0;
        for comment in downstream {
            let tag = comment_tag(&comment.id);
            if upstream.iter().any(|c| c.body.contains(&tag)) {
                continue;
            }
            let body = format!(
                "{} commented on #{number}:\n\n{}\n\n{tag}",
                comment.author,
                comment.body.trim()
            );
            self.gateway.add_source_comment(key, &body).await?;
            mirrored += 1;
        }
        if mirrored > 0 {
            tracing::info!(jpd_key = key, issue = number, mirrored, "Mirrored comments upstream");
        }
        Ok(mirrored)
    }

    /// Hierarchy post-step: list `child` in `parent`'s task list.
    ///
    /// A failure here is kept as a warning since the record itself was
    /// reconciled; the next pass retries the link.
    async fn link_to_parent(
        &self,
        pass: &mut Pass,
        parent: u64,
        child: &Issue,
        warnings: &mut Vec<String>,
    ) -> Result<Option<ParentLink>> {
        if child.number == 0 {
            tracing::debug!(parent, "Planned issue has no number, parent list left as is");
            return Ok(None);
        }
        match pass
            .projector
            .ensure_child_in_parent_list(
                &self.gateway,
                parent,
                child.number,
                &child.title,
                child.state.is_closed(),
            )
            .await
        {
            Ok(change) => Ok(Some(ParentLink {
                parent,
                change: change.into(),
            })),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                tracing::warn!(parent, child = child.number, error = %e, "Failed to update parent task list");
                warnings.push(format!("task list of #{parent} not updated: {e}"));
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("gateway", &self.gateway)
            .finish_non_exhaustive()
    }
}
