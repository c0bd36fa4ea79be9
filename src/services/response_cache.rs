// Read-side response cache, injected through AppState rather than living in
// module-global state so tests can construct one with a zero TTL and get
// deterministic misses. No write path depends on it; dropping it entirely
// would only cost duplicate reads.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

struct CacheEntry {
    stored_at: Instant,
    value: Value,
}

pub struct ResponseCache {
    ttl: Duration,
    entries: DashMap<String, CacheEntry>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let entry = self.entries.get(key)?;
        if entry.stored_at.elapsed() >= self.ttl {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn insert(&self, key: String, value: Value) {
        self.entries.insert(
            key,
            CacheEntry {
                stored_at: Instant::now(),
                value,
            },
        );
    }

    /// Drop every entry whose key starts with `prefix`. Sync runs call this
    /// so report reads never serve pre-sync data for a full TTL.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn zero_ttl_never_serves_a_hit() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.insert("reports:profitability:2024".to_string(), json!({"revenue": 1}));
        assert_eq!(cache.get("reports:profitability:2024"), None);
    }

    #[test]
    fn entries_live_within_the_ttl() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.insert("reports:variance:2024".to_string(), json!({"rows": []}));
        assert_eq!(cache.get("reports:variance:2024"), Some(json!({"rows": []})));
        assert_eq!(cache.get("reports:variance:2023"), None);
    }

    #[test]
    fn prefix_invalidation_only_touches_matches() {
        let cache = ResponseCache::new(Duration::from_secs(300));
        cache.insert("reports:a".to_string(), json!(1));
        cache.insert("reports:b".to_string(), json!(2));
        cache.insert("closeout:a".to_string(), json!(3));

        assert_eq!(cache.invalidate_prefix("reports:"), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("closeout:a"), Some(json!(3)));
    }
}
