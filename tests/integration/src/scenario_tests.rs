//! End-to-end reconciliation scenarios against in-memory stores
//!
//! Each test drives full passes through SyncEngine and checks what ends up
//! in the destination: bodies, state blocks, titles and write counts.

mod common;

use common::{Harness, at, child, record};
use jpd_blocks::decode;
use jpd_core::{SyncAction, SyncState};
use jpd_gateway::{Issue, IssueState};
use pretty_assertions::assert_eq;
use serde_json::json;

// ============================================================================
// Idempotence and change detection
// ============================================================================

#[tokio::test]
async fn second_pass_over_unchanged_records_writes_nothing() {
    let mut h = Harness::one_way(vec![
        record("K-1", "Checkout").with_field("labels", json!(["payments"])),
        child("K-2", "Address form", "K-1"),
        child("K-3", "Payment step", "K-1"),
    ]);

    let first = h.pass().await;
    assert_eq!(first.count(SyncAction::Create), 3);
    let writes_after_first = h.issues.mutation_count();

    let second = h.pass().await;

    assert_eq!(second.count(SyncAction::Skip), 3);
    assert_eq!(second.mutations, 0);
    assert_eq!(h.issues.mutation_count(), writes_after_first);
    assert!(second.is_success());
}

#[tokio::test]
async fn title_change_updates_title_and_rewrites_hash() {
    let mut h = Harness::one_way(vec![record("K-1", "Login bug")]);
    h.pass().await;

    let created = h.issues.issue(1).unwrap();
    assert!(created.body.contains("jpd_id: K-1"));
    let h0 = decode(&created.body).unwrap().sync_hash;

    h.source.upsert(record("K-1", "Login bug on Safari"));
    let report = h.pass().await;

    let outcome = report.outcome("K-1").unwrap();
    assert_eq!(outcome.state, SyncState::SyncedChangedUpstream);
    assert_eq!(outcome.action, SyncAction::UpdateDownstream);

    let updated = h.issues.issue(1).unwrap();
    assert_eq!(updated.title, "Login bug on Safari");
    assert_eq!(updated.state, IssueState::Open);
    let h1 = decode(&updated.body).unwrap().sync_hash;
    assert_ne!(h0, h1);
    assert_eq!(h.issues.issues().len(), 1);
}

#[tokio::test]
async fn timestamp_alone_does_not_trigger_an_update() {
    let mut h = Harness::one_way(vec![record("K-1", "Login bug")]);
    h.pass().await;

    let mut touched = record("K-1", "Login bug");
    touched.updated = at(15);
    h.source.upsert(touched);
    let report = h.pass().await;

    assert_eq!(report.outcome("K-1").unwrap().action, SyncAction::Skip);
    assert_eq!(report.mutations, 0);
}

#[tokio::test]
async fn description_change_regenerates_body() {
    let mut h = Harness::one_way(vec![
        record("K-1", "Login bug").with_field("description", json!("Fails on submit")),
    ]);
    h.pass().await;

    h.source.upsert(
        record("K-1", "Login bug").with_field("description", json!("Fails on submit in Safari")),
    );
    let report = h.pass().await;

    assert_eq!(report.count(SyncAction::UpdateDownstream), 1);
    let body = h.issues.issue(1).unwrap().body;
    assert!(body.starts_with("Fails on submit in Safari"));
    assert!(body.contains("_Synced from [K-1](https://example.atlassian.net/browse/K-1)_"));
}

#[tokio::test]
async fn status_mapping_drives_destination_state() {
    let mut h = Harness::one_way(vec![record("K-1", "Login bug")]);
    h.pass().await;

    h.source.upsert(record("K-1", "Login bug").with_field("status", json!({ "value": "Done" })));
    h.pass().await;

    assert_eq!(h.issues.issue(1).unwrap().state, IssueState::Closed);
}

#[tokio::test]
async fn without_status_mapping_destination_keeps_its_state() {
    let yaml = r#"
source:
  query: project = K
mapping:
  title: fields.summary
"#;
    let mut h = Harness::new(yaml, vec![record("K-1", "Login bug")]);
    h.pass().await;
    h.issues.set_state(1, IssueState::Closed);

    let idle = h.pass().await;
    assert_eq!(idle.outcome("K-1").unwrap().action, SyncAction::Skip);

    h.source.upsert(record("K-1", "Login bug on Safari"));
    let report = h.pass().await;

    assert_eq!(report.outcome("K-1").unwrap().action, SyncAction::UpdateDownstream);
    let issue = h.issues.issue(1).unwrap();
    assert_eq!(issue.title, "Login bug on Safari");
    assert_eq!(issue.state, IssueState::Closed);
}

// ============================================================================
// Dry run
// ============================================================================

#[tokio::test]
async fn dry_run_plans_without_writing() {
    let mut h = Harness::one_way(vec![
        record("K-1", "Checkout").with_field("labels", json!(["payments"])),
        child("K-2", "Address form", "K-1"),
    ]);

    let report = h.dry_pass().await;

    assert!(report.dry_run);
    assert_eq!(report.count(SyncAction::Create), 2);
    assert_eq!(report.mutations, 0);
    assert_eq!(h.issues.mutation_count(), 0);
    assert!(h.issues.issues().is_empty());
    assert!(h.issues.labels().is_empty());
    assert!(
        report
            .actions()
            .iter()
            .all(|a| a.starts_with("[dry-run] Would create issue"))
    );
}

#[tokio::test]
async fn dry_run_after_upstream_change_leaves_issue_as_is() {
    let mut h = Harness::one_way(vec![record("K-1", "Login bug")]);
    h.pass().await;
    let before = h.issues.issue(1).unwrap();

    h.source.upsert(record("K-1", "Login bug on Safari"));
    let report = h.dry_pass().await;

    assert_eq!(report.outcome("K-1").unwrap().action, SyncAction::UpdateDownstream);
    assert_eq!(report.mutations, 0);
    assert_eq!(h.issues.issue(1).unwrap(), before);

    let real = h.pass().await;
    assert_eq!(real.count(SyncAction::UpdateDownstream), 1);
}

// ============================================================================
// Error isolation
// ============================================================================

#[tokio::test]
async fn one_bad_record_does_not_stop_the_pass() {
    let mut h = Harness::one_way(vec![
        record("K-1", "First"),
        record("K-2", "   "),
        record("K-3", "Third"),
    ]);

    let report = h.pass().await;

    assert!(!report.is_success());
    assert_eq!(report.count(SyncAction::Create), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].jpd_key, "K-2");
    assert!(report.failures[0].error.contains("title"));
    assert_eq!(h.issues.issues().len(), 2);
}

#[tokio::test]
async fn failed_record_is_created_once_fixed() {
    let mut h = Harness::one_way(vec![record("K-1", "")]);
    let first = h.pass().await;
    assert_eq!(first.failures.len(), 1);

    h.source.upsert(record("K-1", "Now titled"));
    let second = h.pass().await;

    assert!(second.is_success());
    assert_eq!(second.count(SyncAction::Create), 1);
    assert_eq!(h.issues.issue(1).unwrap().title, "Now titled");
}

// ============================================================================
// Correspondence
// ============================================================================

#[tokio::test]
async fn out_of_scope_issue_is_left_alone() {
    let mut h = Harness::one_way(vec![record("K-1", "Kept"), record("K-2", "Dropped")]);
    h.pass().await;
    let dropped = h.number_of("K-2");
    let before = h.issues.issue(dropped).unwrap();

    h.replace_source(vec![record("K-1", "Kept")]);
    let report = h.pass().await;

    assert_eq!(report.orphans.len(), 1);
    assert_eq!(report.orphans[0].jpd_key, "K-2");
    assert_eq!(report.orphans[0].action, SyncAction::LeaveOrphan);
    assert_eq!(report.orphans[0].issue, Some(dropped));
    assert_eq!(report.mutations, 0);
    assert_eq!(h.issues.issue(dropped).unwrap(), before);
}

#[tokio::test]
async fn unmanaged_issues_are_ignored() {
    let mut h = Harness::one_way(vec![record("K-1", "Login bug")]);
    h.issues.insert_issue(Issue {
        number: 40,
        title: "Hand-written".to_string(),
        body: "Mentions jpd-sync-metadata in prose only".to_string(),
        state: IssueState::Open,
        labels: vec![],
        updated_at: at(8),
    });

    let report = h.pass().await;

    assert_eq!(report.count(SyncAction::Create), 1);
    assert!(report.orphans.is_empty());
    assert_eq!(h.issues.issue(40).unwrap().title, "Hand-written");
    assert_eq!(h.number_of("K-1"), 41);
}

#[tokio::test]
async fn state_block_survives_unrelated_html_comments() {
    let mut h = Harness::one_way(vec![record("K-1", "Login bug")]);
    h.pass().await;
    h.issues.edit_body(1, |body| {
        format!("<!-- triage: needs repro -->\n{body}\n<!-- reviewer note -->")
    });

    let report = h.pass().await;

    assert_eq!(report.outcome("K-1").unwrap().action, SyncAction::Skip);
    let meta = decode(&h.issues.issue(1).unwrap().body).unwrap();
    assert_eq!(meta.jpd_id, "K-1");
    assert_eq!(meta.jpd_updated, at(9));
    assert_eq!(
        meta.original_link.as_deref(),
        Some("https://example.atlassian.net/browse/K-1")
    );
}

#[tokio::test]
async fn labels_are_created_once_and_replaced_on_update() {
    let mut h = Harness::one_way(vec![
        record("K-1", "Checkout").with_field("labels", json!(["payments", "ux"])),
        record("K-2", "Cart").with_field("labels", json!(["payments"])),
    ]);
    h.pass().await;

    let mut labels = h.issues.labels();
    labels.sort();
    assert_eq!(labels, vec!["payments".to_string(), "ux".to_string()]);

    h.source
        .upsert(record("K-1", "Checkout").with_field("labels", json!(["web"])));
    h.pass().await;

    assert_eq!(h.issues.issue(1).unwrap().labels, vec!["web".to_string()]);
}
