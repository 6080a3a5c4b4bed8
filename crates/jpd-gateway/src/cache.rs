//! Short-lived caches owned by the caller
//!
//! - [`ConnectionCache`]: last successful credential check per credential set
//! - [`LabelCache`]: labels known to exist downstream during one pass

use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Default freshness window for a credential check
pub const DEFAULT_CONNECTION_TTL: Duration = Duration::from_secs(5 * 60);

/// Fingerprint credential material so raw secrets are never used as map keys.
pub fn credential_fingerprint(material: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(material.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Remembers when each credential set last verified successfully.
///
/// While an entry is fresh the caller may skip the live round-trip, trading
/// staleness for fewer calls against a strict quota.
#[derive(Debug)]
pub struct ConnectionCache {
    ttl: Duration,
    verified: Mutex<HashMap<String, Instant>>,
}

impl Default for ConnectionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECTION_TTL)
    }
}

impl ConnectionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            verified: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_fresh(&self, credential_id: &str) -> bool {
        self.is_fresh_at(credential_id, Instant::now())
    }

    pub fn is_fresh_at(&self, credential_id: &str, now: Instant) -> bool {
        self.verified
            .lock()
            .ok()
            .and_then(|map| map.get(credential_id).copied())
            .is_some_and(|at| now.saturating_duration_since(at) < self.ttl)
    }

    pub fn record_success(&self, credential_id: &str) {
        self.record_success_at(credential_id, Instant::now());
    }

    pub fn record_success_at(&self, credential_id: &str, at: Instant) {
        if let Ok(mut map) = self.verified.lock() {
            map.insert(credential_id.to_string(), at);
        }
    }

    /// Forget a credential set, e.g. after it was rejected.
    pub fn invalidate(&self, credential_id: &str) {
        if let Ok(mut map) = self.verified.lock() {
            map.remove(credential_id);
        }
    }
}

/// Labels known to exist in the destination, scoped to one pass.
#[derive(Debug, Default, Clone)]
pub struct LabelCache {
    loaded: bool,
    known: BTreeSet<String>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Seed the cache from a full label listing.
    pub fn load(&mut self, labels: impl IntoIterator<Item = String>) {
        self.known.extend(labels);
        self.loaded = true;
    }

    pub fn contains(&self, label: &str) -> bool {
        self.known.contains(label)
    }

    pub fn insert(&mut self, label: impl Into<String>) {
        self.known.insert(label.into());
    }

    /// Labels from `wanted` not yet known, deduplicated, in input order.
    pub fn missing<'a>(&self, wanted: &'a [String]) -> Vec<&'a str> {
        let mut out: Vec<&str> = Vec::new();
        for label in wanted {
            if !self.contains(label) && !out.contains(&label.as_str()) {
                out.push(label);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_entry_expires_after_ttl() {
        let cache = ConnectionCache::new(Duration::from_secs(300));
        let t0 = Instant::now();
        cache.record_success_at("github:abc", t0);

        assert!(cache.is_fresh_at("github:abc", t0 + Duration::from_secs(299)));
        assert!(!cache.is_fresh_at("github:abc", t0 + Duration::from_secs(300)));
        assert!(!cache.is_fresh_at("jira:other", t0));
    }

    #[test]
    fn invalidate_forgets_entry() {
        let cache = ConnectionCache::default();
        cache.record_success("k");
        assert!(cache.is_fresh("k"));
        cache.invalidate("k");
        assert!(!cache.is_fresh("k"));
    }

    #[test]
    fn fingerprint_hides_secret() {
        let fp = credential_fingerprint("token-123");
        assert_eq!(fp.len(), 64);
        assert!(!fp.contains("token"));
        assert_eq!(fp, credential_fingerprint("token-123"));
    }

    #[test]
    fn missing_labels_are_deduplicated() {
        let mut cache = LabelCache::new();
        cache.load(vec!["bug".to_string()]);
        let wanted = vec!["bug".to_string(), "ux".to_string(), "ux".to_string()];
        assert_eq!(cache.missing(&wanted), vec!["ux"]);
    }
}
