use std::{
    cmp,
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc::{self, RecvTimeoutError},
        Arc, Mutex, MutexGuard, PoisonError, Weak,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use serde_json::Value;

use crate::{
    api_defaults,
    cache::{Cache, CacheEntry, CacheStats},
    log_debug,
    time::{Clock, Milliseconds, Seconds, SystemClock},
};

/// Process-local TTL cache. Every entry lives for the same fixed TTL counted
/// from its write. Expiry is checked on each read; `sweep` and the optional
/// background sweeper only reclaim memory.
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Seconds,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(Seconds::new(api_defaults::DEFAULT_CACHE_TTL_SECONDS))
    }
}

impl InMemoryCache {
    pub fn new(ttl: Seconds) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock: Arc::new(SystemClock),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn with_clock(self, clock: Arc<dyn Clock>) -> Self {
        Self { clock, ..self }
    }

    pub fn ttl(&self) -> Seconds {
        self.ttl
    }

    /// Number of stored entries, expired ones included until they are swept
    /// or read.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every expired entry and returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| !self.is_expired(entry, now));
        before - entries.len()
    }

    /// Spawns a thread sweeping every TTL * `SWEEP_FACTOR`. The thread stops
    /// when the returned handle is dropped or the cache itself is gone.
    pub fn start_sweeper(self: &Arc<Self>) -> Sweeper {
        let interval = *self.ttl.to_millis() as f64 * api_defaults::SWEEP_FACTOR;
        let interval = cmp::max(
            Duration::from_millis(interval as u64),
            Duration::from_secs(api_defaults::MIN_SWEEP_INTERVAL_SECONDS),
        );
        self.start_sweeper_every(interval)
    }

    pub fn start_sweeper_every(self: &Arc<Self>, interval: Duration) -> Sweeper {
        let cache: Weak<Self> = Arc::downgrade(self);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => match cache.upgrade() {
                    Some(cache) => {
                        let removed = cache.sweep();
                        if removed > 0 {
                            log_debug!("Swept {} expired cache entries", removed);
                        }
                    }
                    None => break,
                },
                // Explicit stop or the handle was dropped.
                _ => break,
            }
        });
        Sweeper {
            stop: Some(stop_tx),
            handle: Some(handle),
        }
    }

    fn is_expired(&self, entry: &CacheEntry, now: Milliseconds) -> bool {
        now - entry.stored_at >= self.ttl.to_millis()
    }

    // Entries are immutable once inserted, so a panic while holding the lock
    // cannot leave the map half-updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Cache for InMemoryCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        let now = self.clock.now();
        let mut entries = self.lock();
        match entries.get(key).cloned() {
            Some(entry) if !self.is_expired(&entry, now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry)
            }
            Some(_) => {
                entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn set(&self, key: &str, value: Arc<Value>) {
        let entry = CacheEntry {
            value,
            stored_at: self.clock.now(),
        };
        self.lock().insert(key.to_string(), entry);
    }

    fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let keys = self
            .lock()
            .values()
            .filter(|entry| !self.is_expired(entry, now))
            .count();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            keys,
        }
    }
}

/// Handle to the background sweeper thread. Dropping it stops the thread.
pub struct Sweeper {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    pub fn stop(self) {
        drop(self)
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
