//! Process-memory TTL cache.
//!
//! All caching in the pipeline is TTL-bounded and safely discardable;
//! there is no durable storage. Concurrent writers follow last-writer-wins
//! within the TTL window.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Standard TTLs for different data types.
pub struct CacheTtl;

impl CacheTtl {
    /// Resolved token prices.
    pub const PRICES: Duration = Duration::from_secs(300);
    /// Assembled portfolio snapshots.
    pub const PORTFOLIO: Duration = Duration::from_secs(120);
}

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

/// A lock-guarded map with per-entry expiry.
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    ttl: Duration,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// The live value for a key, or `None` when absent or expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let entries = self.entries.read().expect("cache lock poisoned");
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() >= self.ttl {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Insert or overwrite, resetting the entry's TTL window.
    pub fn insert(&self, key: K, value: V) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop expired entries. Callers may invoke this opportunistically;
    /// correctness never depends on it.
    pub fn purge_expired(&self) {
        let mut entries = self.entries.write().expect("cache lock poisoned");
        entries.retain(|_, e| e.stored_at.elapsed() < self.ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
