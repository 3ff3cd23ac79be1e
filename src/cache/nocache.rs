use std::sync::Arc;

use serde_json::Value;

use crate::cache::{Cache, CacheEntry, CacheStats};

/// Cache that never remembers anything. Every fetch goes upstream.
pub struct NoCache;

impl Cache for NoCache {
    fn get(&self, _key: &str) -> Option<CacheEntry> {
        None
    }

    fn set(&self, _key: &str, _value: Arc<Value>) {}

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nocache_always_misses() {
        let cache = NoCache;
        cache.set("/2025/leaderboard/x", Arc::new(json!({"a": 1})));
        assert!(cache.get("/2025/leaderboard/x").is_none());
        assert_eq!(CacheStats::default(), cache.stats());
    }
}
