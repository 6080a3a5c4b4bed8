//! Parent/child projection across passes: task lists, late links, depth
//! limits and cycles.

mod common;

use common::{Harness, child, record};
use jpd_blocks::{SECTION_MARKER, child_numbers, parent_number};
use jpd_core::sync::{ListChange, ParentLink};
use jpd_core::{MAX_HIERARCHY_DEPTH, SyncAction};
use pretty_assertions::assert_eq;
use serde_json::json;

#[tokio::test]
async fn children_are_listed_under_their_parent() {
    let mut h = Harness::one_way(vec![
        record("K-1", "Checkout"),
        child("K-2", "Address form", "K-1"),
        child("K-3", "Payment step", "K-1"),
    ]);

    let report = h.pass().await;

    let parent = h.issues.issue(1).unwrap();
    assert!(parent.body.contains("## Subtasks\n- [ ] #2 Address form\n- [ ] #3 Payment step"));
    assert_eq!(child_numbers(&parent.body), vec![2, 3]);
    assert_eq!(parent_number(&h.issues.issue(2).unwrap().body), Some(1));
    assert_eq!(
        report.outcome("K-3").unwrap().parent,
        Some(ParentLink {
            parent: 1,
            change: ListChange::Inserted
        })
    );
}

#[tokio::test]
async fn children_before_parents_in_input_still_nest() {
    let mut h = Harness::one_way(vec![
        child("K-3", "Payment step", "K-2"),
        child("K-2", "Address form", "K-1"),
        record("K-1", "Checkout"),
    ]);

    h.pass().await;

    let k1 = h.number_of("K-1");
    let k2 = h.number_of("K-2");
    let k3 = h.number_of("K-3");
    assert_eq!(k1, 1);
    assert_eq!(parent_number(&h.issues.issue(k2).unwrap().body), Some(k1));
    assert_eq!(parent_number(&h.issues.issue(k3).unwrap().body), Some(k2));
}

#[tokio::test]
async fn closing_a_child_ticks_its_checkbox() {
    let mut h = Harness::one_way(vec![
        record("K-1", "Checkout"),
        child("K-2", "Address form", "K-1"),
    ]);
    h.pass().await;

    h.source.upsert(
        child("K-2", "Address form", "K-1").with_field("status", json!({ "value": "Done" })),
    );
    let report = h.pass().await;

    assert_eq!(report.outcome("K-1").unwrap().action, SyncAction::Skip);
    assert_eq!(
        report.outcome("K-2").unwrap().parent,
        Some(ParentLink {
            parent: 1,
            change: ListChange::Toggled
        })
    );
    assert!(h.issues.issue(1).unwrap().body.contains("- [x] #2 Address form"));
}

#[tokio::test]
async fn regenerating_a_parent_keeps_its_checkboxes() {
    let mut h = Harness::one_way(vec![
        record("K-1", "Checkout").with_field("description", json!("Old text")),
        child("K-2", "Address form", "K-1"),
    ]);
    h.pass().await;
    h.issues.edit_body(1, |body| {
        body.replace(
            "- [ ] #2 Address form",
            "- [ ] #2 Address form\n- [x] #99 Tracked by hand",
        )
    });

    h.source
        .upsert(record("K-1", "Checkout").with_field("description", json!("New text")));
    let report = h.pass().await;

    assert_eq!(report.outcome("K-1").unwrap().action, SyncAction::UpdateDownstream);
    let body = h.issues.issue(1).unwrap().body;
    assert!(body.starts_with("New text"));
    assert!(body.contains("- [ ] #2 Address form\n- [x] #99 Tracked by hand"));
    assert_eq!(report.mutations, 1);
}

#[tokio::test]
async fn checklist_in_description_is_not_the_task_list() {
    let description = json!("Intro\n\n## Tasks\n- [ ] write docs");
    let mut h = Harness::one_way(vec![
        record("K-1", "Checkout").with_field("description", description.clone()),
        child("K-2", "Address form", "K-1"),
    ]);
    h.pass().await;

    let listed = format!("{SECTION_MARKER}\n## Subtasks\n- [ ] #2 Address form");
    let body = h.issues.issue(1).unwrap().body;
    assert!(body.contains("## Tasks\n- [ ] write docs\n\n_Synced from"));
    assert!(body.contains(&listed));

    for title in ["Checkout v2", "Checkout v3"] {
        h.source
            .upsert(record("K-1", title).with_field("description", description.clone()));
        let report = h.pass().await;

        assert_eq!(report.mutations, 1);
        let body = h.issues.issue(1).unwrap().body;
        assert_eq!(body.matches("write docs").count(), 1);
        assert_eq!(body.matches("#2 Address form").count(), 1);
        assert!(body.contains(&listed));
        assert_eq!(child_numbers(&body), vec![2]);
    }
}

#[tokio::test]
async fn existing_flat_pair_is_linked_when_parent_is_set_upstream() {
    let mut h = Harness::one_way(vec![record("K-1", "Checkout"), record("K-2", "Address form")]);
    h.pass().await;
    assert!(child_numbers(&h.issues.issue(1).unwrap().body).is_empty());

    h.source.upsert(child("K-2", "Address form", "K-1"));
    let second = h.pass().await;

    assert_eq!(h.issues.issues().len(), 2);
    assert_eq!(second.count(SyncAction::Create), 0);
    assert_eq!(second.outcome("K-2").unwrap().action, SyncAction::UpdateDownstream);
    assert_eq!(
        second.outcome("K-2").unwrap().parent,
        Some(ParentLink {
            parent: 1,
            change: ListChange::Inserted
        })
    );
    assert_eq!(child_numbers(&h.issues.issue(1).unwrap().body), vec![2]);
    assert_eq!(parent_number(&h.issues.issue(2).unwrap().body), Some(1));

    let third = h.pass().await;
    assert_eq!(third.mutations, 0);
}

#[tokio::test]
async fn child_synced_before_its_parent_is_linked_later() {
    let mut h = Harness::one_way(vec![child("K-2", "Address form", "K-1")]);
    let first = h.pass().await;
    assert_eq!(first.outcome("K-2").unwrap().parent, None);
    assert_eq!(parent_number(&h.issues.issue(1).unwrap().body), None);

    h.source.upsert(record("K-1", "Checkout"));
    let second = h.pass().await;

    let parent = h.number_of("K-1");
    assert_eq!(parent, 2);
    assert_eq!(second.outcome("K-2").unwrap().action, SyncAction::UpdateDownstream);
    assert_eq!(parent_number(&h.issues.issue(1).unwrap().body), Some(parent));
    assert_eq!(child_numbers(&h.issues.issue(parent).unwrap().body), vec![1]);

    let third = h.pass().await;
    assert_eq!(third.mutations, 0);
}

#[tokio::test]
async fn ninth_level_is_synced_flat_with_a_warning() {
    let mut records = vec![record("K-1", "Level 1")];
    for level in 2..=9 {
        records.push(child(
            &format!("K-{level}"),
            &format!("Level {level}"),
            &format!("K-{}", level - 1),
        ));
    }
    let mut h = Harness::one_way(records);

    let report = h.pass().await;

    assert!(report.is_success());
    assert_eq!(report.count(SyncAction::Create), 9);
    let eighth = h.number_of("K-8");
    let ninth = h.number_of("K-9");
    assert_eq!(
        parent_number(&h.issues.issue(eighth).unwrap().body),
        Some(h.number_of("K-7"))
    );
    assert_eq!(parent_number(&h.issues.issue(ninth).unwrap().body), None);
    assert!(child_numbers(&h.issues.issue(eighth).unwrap().body).is_empty());

    let outcome = report.outcome("K-9").unwrap();
    assert_eq!(outcome.parent, None);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains(&MAX_HIERARCHY_DEPTH.to_string()));

    let again = h.pass().await;
    assert_eq!(again.mutations, 0);
    assert_eq!(again.outcome("K-9").unwrap().action, SyncAction::Skip);
}

#[tokio::test]
async fn parent_cycle_settles_without_looping() {
    let mut h = Harness::one_way(vec![
        child("K-1", "Alpha", "K-2"),
        child("K-2", "Beta", "K-1"),
    ]);

    let first = h.pass().await;
    let second = h.pass().await;
    let third = h.pass().await;

    assert!(first.is_success() && second.is_success() && third.is_success());
    assert_eq!(third.mutations, 0);
    assert_eq!(third.count(SyncAction::Skip), 2);
}

#[tokio::test]
async fn record_naming_itself_as_parent_stays_flat() {
    let mut h = Harness::one_way(vec![child("K-1", "Loop", "K-1")]);

    h.pass().await;
    let second = h.pass().await;

    let body = h.issues.issue(1).unwrap().body;
    assert_eq!(parent_number(&body), None);
    assert!(child_numbers(&body).is_empty());
    assert_eq!(second.mutations, 0);
    assert_eq!(second.outcome("K-1").unwrap().warnings.len(), 1);
}

#[tokio::test]
async fn disabled_hierarchy_syncs_everything_flat() {
    let yaml = format!("{}hierarchy:\n  enabled: false\n", common::ONE_WAY);
    let mut h = Harness::new(
        &yaml,
        vec![record("K-1", "Checkout"), child("K-2", "Address form", "K-1")],
    );

    let report = h.pass().await;

    assert_eq!(report.count(SyncAction::Create), 2);
    assert_eq!(parent_number(&h.issues.issue(2).unwrap().body), None);
    assert!(child_numbers(&h.issues.issue(1).unwrap().body).is_empty());
}
