//! Source key to destination issue correspondence, rebuilt every pass

use jpd_blocks::{SyncMetadata, decode};
use jpd_gateway::Issue;
use std::collections::{BTreeMap, HashSet};

/// A destination issue carrying a readable state block
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedIssue {
    pub issue: Issue,
    pub metadata: SyncMetadata,
}

/// In-memory map of source key to managed destination issue.
///
/// Built from the state blocks of searched issues. When two issues claim the
/// same key the lowest issue number wins.
#[derive(Debug, Default)]
pub struct CorrespondenceMap {
    by_key: BTreeMap<String, ManagedIssue>,
}

impl CorrespondenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn build(issues: impl IntoIterator<Item = Issue>) -> Self {
        let mut issues: Vec<Issue> = issues.into_iter().collect();
        issues.sort_by_key(|i| i.number);

        let mut map = Self::new();
        for issue in issues {
            let Some(metadata) = decode(&issue.body) else {
                tracing::debug!(issue = issue.number, "No readable state block, not managed");
                continue;
            };
            if let Some(existing) = map.by_key.get(&metadata.jpd_id) {
                tracing::warn!(
                    jpd_key = %metadata.jpd_id,
                    kept = existing.issue.number,
                    ignored = issue.number,
                    "Several issues claim the same source record"
                );
                continue;
            }
            map.by_key
                .insert(metadata.jpd_id.clone(), ManagedIssue { issue, metadata });
        }
        map
    }

    pub fn get(&self, key: &str) -> Option<&ManagedIssue> {
        self.by_key.get(key)
    }

    pub fn number_of(&self, key: &str) -> Option<u64> {
        self.by_key.get(key).map(|m| m.issue.number)
    }

    /// Record an issue written during this pass.
    pub fn insert(&mut self, issue: Issue, metadata: SyncMetadata) {
        self.by_key
            .insert(metadata.jpd_id.clone(), ManagedIssue { issue, metadata });
    }

    /// Managed issues whose key is not among `candidates`.
    pub fn orphans<'a>(&'a self, candidates: &HashSet<&str>) -> Vec<&'a ManagedIssue> {
        self.by_key
            .iter()
            .filter(|(key, _)| !candidates.contains(key.as_str()))
            .map(|(_, managed)| managed)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManagedIssue> {
        self.by_key.values()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use jpd_blocks::encode;
    use jpd_gateway::IssueState;

    fn managed(number: u64, key: &str) -> Issue {
        let meta = SyncMetadata::new(key, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), "h");
        Issue {
            number,
            title: key.to_string(),
            body: encode("text", &meta),
            state: IssueState::Open,
            labels: vec![],
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn lowest_number_wins_duplicate_claims() {
        let map = CorrespondenceMap::build(vec![managed(9, "K-1"), managed(4, "K-1"), managed(5, "K-2")]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.number_of("K-1"), Some(4));
    }

    #[test]
    fn unreadable_blocks_are_unmanaged() {
        let mut plain = managed(1, "K-1");
        plain.body = "mentions jpd-sync-metadata in prose".into();
        let map = CorrespondenceMap::build(vec![plain]);
        assert!(map.is_empty());
    }

    #[test]
    fn orphans_are_keys_outside_the_candidate_set() {
        let map = CorrespondenceMap::build(vec![managed(1, "K-1"), managed(2, "K-2")]);
        let candidates: HashSet<&str> = ["K-1"].into_iter().collect();
        let orphans: Vec<u64> = map.orphans(&candidates).iter().map(|m| m.issue.number).collect();
        assert_eq!(orphans, vec![2]);
    }
}
