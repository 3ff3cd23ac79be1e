use std::sync::Arc;

use serde_json::Value;

use crate::time::Milliseconds;

pub mod inmemory;
pub mod nocache;

pub use inmemory::{InMemoryCache, Sweeper};
pub use nocache::NoCache;

/// Store of the most recent successful upstream payload per resource path.
///
/// Absence is a normal outcome, so neither operation can fail. Implementors
/// must never hand out an entry older than their TTL.
pub trait Cache {
    fn get(&self, key: &str) -> Option<CacheEntry>;
    fn set(&self, key: &str, value: Arc<Value>);
    fn stats(&self) -> CacheStats;
}

/// A payload as it was written to the cache. The value is shared, read-only.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub value: Arc<Value>,
    pub stored_at: Milliseconds,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub keys: usize,
}

impl<T: Cache + ?Sized> Cache for Arc<T> {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        self.as_ref().get(key)
    }

    fn set(&self, key: &str, value: Arc<Value>) {
        self.as_ref().set(key, value)
    }

    fn stats(&self) -> CacheStats {
        self.as_ref().stats()
    }
}
