//! Parents-first processing order

use jpd_gateway::SourceRecord;
use std::collections::{HashMap, HashSet};

/// Number of ancestors of `key` inside the candidate set. Cycles stop the walk.
fn ancestor_count(key: &str, parents: &HashMap<&str, &str>) -> usize {
    let mut visited = HashSet::from([key]);
    let mut count = 0;
    let mut current = key;
    while let Some(&parent) = parents.get(current) {
        if !visited.insert(parent) {
            break;
        }
        count += 1;
        current = parent;
    }
    count
}

/// Order records so every parent in the set comes before its children.
///
/// Records of equal depth keep their input order.
pub fn parents_first(records: &[SourceRecord]) -> Vec<&SourceRecord> {
    let keys: HashSet<&str> = records.iter().map(|r| r.key.as_str()).collect();
    let parents: HashMap<&str, &str> = records
        .iter()
        .filter_map(|r| {
            r.parent_key
                .as_deref()
                .filter(|p| keys.contains(p))
                .map(|p| (r.key.as_str(), p))
        })
        .collect();

    let mut ordered: Vec<(usize, &SourceRecord)> = records
        .iter()
        .map(|r| (ancestor_count(&r.key, &parents), r))
        .collect();
    ordered.sort_by_key(|(depth, _)| *depth);
    ordered.into_iter().map(|(_, r)| r).collect()
}
