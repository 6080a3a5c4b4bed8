//! Parent task-list maintenance and depth checks

use jpd_blocks::{
    DEFAULT_SECTION_TITLE, ItemChange, child_numbers, ensure_item, is_section_header, parent_number,
};
use jpd_gateway::{Gateway, Issue, IssuePatch};
use std::collections::{HashMap, HashSet};

use crate::Result;

/// Deepest allowed nesting; the root issue is depth 1
pub const MAX_HIERARCHY_DEPTH: usize = 8;

/// Projects parent/child relationships into parent issue bodies.
///
/// Holds a pass-scoped view of issues already read or written so that
/// repeated parent lookups in one pass see this pass's own writes.
#[derive(Debug)]
pub struct Projector {
    section_title: String,
    known: HashMap<u64, Issue>,
}

impl Projector {
    /// A title that is not an accepted section header falls back to
    /// [`DEFAULT_SECTION_TITLE`].
    pub fn new(section_title: impl Into<String>) -> Self {
        let mut section_title = section_title.into();
        if !is_section_header(&format!("## {section_title}")) {
            tracing::warn!(
                section_title = %section_title,
                fallback = DEFAULT_SECTION_TITLE,
                "Unrecognised task list title"
            );
            section_title = DEFAULT_SECTION_TITLE.to_string();
        }
        Self {
            section_title,
            known: HashMap::new(),
        }
    }

    pub fn section_title(&self) -> &str {
        &self.section_title
    }

    /// Record the latest known version of an issue. Dry-run placeholders
    /// (number 0) are ignored.
    pub fn remember(&mut self, issue: Issue) {
        if issue.number != 0 {
            self.known.insert(issue.number, issue);
        }
    }

    /// Latest version of an issue seen this pass, if any.
    pub fn known(&self, number: u64) -> Option<&Issue> {
        self.known.get(&number)
    }

    async fn fetch(&mut self, gateway: &Gateway, number: u64) -> Result<Issue> {
        if let Some(issue) = self.known.get(&number) {
            return Ok(issue.clone());
        }
        let issue = gateway.get_issue(number).await?;
        self.known.insert(number, issue.clone());
        Ok(issue)
    }

    /// Make sure `child` is listed in `parent`'s task list with a checkbox
    /// matching `child_is_closed`.
    ///
    /// Only a changed body is written back; in dry-run the gateway logs the
    /// write instead.
    pub async fn ensure_child_in_parent_list(
        &mut self,
        gateway: &Gateway,
        parent: u64,
        child: u64,
        child_title: &str,
        child_is_closed: bool,
    ) -> Result<ItemChange> {
        let current = self.fetch(gateway, parent).await?;
        let (body, change) = ensure_item(
            &current.body,
            child,
            child_title,
            child_is_closed,
            &self.section_title,
        );

        if change.is_changed() {
            tracing::info!(parent, child, ?change, "Updating parent task list");
            let updated = gateway
                .update_issue(&current, &IssuePatch::body(body))
                .await?;
            self.remember(updated);
        } else {
            tracing::debug!(parent, child, "Parent task list already current");
        }
        Ok(change)
    }

    /// Children listed in `parent`'s task list, in document order.
    pub async fn get_children(&mut self, gateway: &Gateway, parent: u64) -> Result<Vec<u64>> {
        let issue = self.fetch(gateway, parent).await?;
        Ok(child_numbers(&issue.body))
    }

    /// Depth of `number` in the destination hierarchy, following `Parent: #N`
    /// lines upwards. A cycle stops the walk with a warning; the revisited
    /// issue adds nothing.
    pub async fn compute_depth(&mut self, gateway: &Gateway, number: u64) -> Result<usize> {
        let mut depth = 0;
        let mut visited = HashSet::new();
        let mut current = Some(number);

        while let Some(n) = current {
            if !visited.insert(n) {
                tracing::warn!(issue = number, cycle_at = n, "Parent chain contains a cycle");
                break;
            }
            depth += 1;
            if depth > MAX_HIERARCHY_DEPTH {
                break;
            }
            let issue = self.fetch(gateway, n).await?;
            current = parent_number(&issue.body);
        }

        Ok(depth)
    }

    /// Whether a new child under `parent` stays within [`MAX_HIERARCHY_DEPTH`].
    pub async fn can_nest_under(&mut self, gateway: &Gateway, parent: u64) -> Result<bool> {
        Ok(self.compute_depth(gateway, parent).await? < MAX_HIERARCHY_DEPTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jpd_gateway::{ConnectionCache, IssueCall, IssueState, MemoryIssueStore, MemorySourceStore};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn issue(number: u64, body: &str) -> Issue {
        Issue {
            number,
            title: format!("Issue {number}"),
            body: body.to_string(),
            state: IssueState::Open,
            labels: vec![],
            updated_at: Utc::now(),
        }
    }

    fn gateway(issues: Arc<MemoryIssueStore>, dry_run: bool) -> Gateway {
        Gateway::new(
            Arc::new(MemorySourceStore::new()),
            issues,
            Arc::new(ConnectionCache::default()),
        )
        .with_dry_run(dry_run)
    }

    /// `1 <- 2 <- ... <- n`, each body naming its parent.
    fn chain(n: u64) -> Vec<Issue> {
        (1..=n)
            .map(|i| {
                if i == 1 {
                    issue(i, "root")
                } else {
                    issue(i, &format!("text\n\nParent: #{}", i - 1))
                }
            })
            .collect()
    }

    #[tokio::test]
    async fn inserts_then_toggles_then_leaves_alone() {
        let store = Arc::new(MemoryIssueStore::from_issues(vec![issue(1, "Parent body")]));
        let gw = gateway(store.clone(), false);
        let mut projector = Projector::new("Subtasks");

        let first = projector
            .ensure_child_in_parent_list(&gw, 1, 2, "Child", false)
            .await
            .unwrap();
        let second = projector
            .ensure_child_in_parent_list(&gw, 1, 2, "Child", true)
            .await
            .unwrap();
        let third = projector
            .ensure_child_in_parent_list(&gw, 1, 2, "Child", true)
            .await
            .unwrap();

        assert_eq!(first, ItemChange::Inserted);
        assert_eq!(second, ItemChange::Toggled);
        assert_eq!(third, ItemChange::Unchanged);
        assert_eq!(
            store.issue(1).unwrap().body,
            "Parent body\n\n<!-- jpd-sync-tasklist -->\n## Subtasks\n- [x] #2 Child"
        );
        let updates = store
            .calls()
            .into_iter()
            .filter(|c| matches!(c, IssueCall::Update(1)))
            .count();
        assert_eq!(updates, 2);
    }

    #[test]
    fn unrecognised_section_title_falls_back() {
        assert_eq!(Projector::new("Child issues").section_title(), "Child issues");
        assert_eq!(Projector::new("Work items").section_title(), "Subtasks");
    }

    #[tokio::test]
    async fn dry_run_never_writes() {
        let store = Arc::new(MemoryIssueStore::from_issues(vec![issue(1, "Parent body")]));
        let gw = gateway(store.clone(), true);
        let mut projector = Projector::new("Subtasks");

        let change = projector
            .ensure_child_in_parent_list(&gw, 1, 2, "Child", false)
            .await
            .unwrap();

        assert_eq!(change, ItemChange::Inserted);
        assert_eq!(store.mutation_count(), 0);
        assert_eq!(projector.get_children(&gw, 1).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn children_come_from_the_task_list() {
        let body = "## Tasks\n- [ ] #7 upstream\n\n<!-- jpd-sync-tasklist -->\n## Sub-issues\n- [ ] #4 a\n- [x] #9 b\n\nSee #12 too";
        let store = Arc::new(MemoryIssueStore::from_issues(vec![issue(3, body)]));
        let gw = gateway(store, false);

        let children = Projector::new("Subtasks").get_children(&gw, 3).await.unwrap();
        assert_eq!(children, vec![4, 9]);
    }

    #[tokio::test]
    async fn depth_counts_hops_to_root() {
        let store = Arc::new(MemoryIssueStore::from_issues(chain(8)));
        let gw = gateway(store, false);
        let mut projector = Projector::new("Subtasks");

        assert_eq!(projector.compute_depth(&gw, 1).await.unwrap(), 1);
        assert_eq!(projector.compute_depth(&gw, 8).await.unwrap(), 8);
        assert!(projector.can_nest_under(&gw, 7).await.unwrap());
        assert!(!projector.can_nest_under(&gw, 8).await.unwrap());
    }

    #[tokio::test]
    async fn cycles_terminate() {
        let store = Arc::new(MemoryIssueStore::from_issues(vec![
            issue(1, "Parent: #3"),
            issue(2, "Parent: #1"),
            issue(3, "Parent: #2"),
        ]));
        let gw = gateway(store, false);

        let depth = Projector::new("Subtasks").compute_depth(&gw, 1).await.unwrap();
        assert_eq!(depth, 3);
    }
}
