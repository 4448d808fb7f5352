use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::debug;

use super::{Clock, SystemClock};

/// Responses older than this are never served.
pub const CACHE_TTL: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    stored_at: Instant,
}

/// Parsed response bodies keyed by request identity (URL + serialized options).
///
/// The lock is only taken for map operations and never held across an await.
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), CACHE_TTL)
    }

    pub fn with_clock(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A panic while holding the lock cannot leave the map half-written.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the stored body if it is younger than the TTL.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = self.clock.now();
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if now.saturating_duration_since(entry.stored_at) < self.ttl => {
                Some(entry.data.clone())
            }
            Some(_) => {
                debug!(key = key, "Cache entry expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store `data` under `key`. Expired entries under other keys are
    /// dropped at the same time, so the map never outgrows the live set.
    pub fn insert(&self, key: String, data: Value) {
        let stored_at = self.clock.now();
        let ttl = self.ttl;
        let mut entries = self.entries();
        entries.retain(|_, entry| stored_at.saturating_duration_since(entry.stored_at) < ttl);
        entries.insert(key, CacheEntry { data, stored_at });
    }

    pub fn clear(&self) {
        let mut entries = self.entries();
        if !entries.is_empty() {
            debug!(entries = entries.len(), "Clearing response cache");
        }
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new()
    }
}
