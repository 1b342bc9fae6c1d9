//! Caching of disease ontology closures.
//!
//! Provides an LRU cache with TTL expiration. Closures are keyed by disease
//! id; a hit saves one ontology lookup per hierarchy level.

use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::config::CacheConfig;

/// A cached closure with expiration tracking.
#[derive(Debug, Clone)]
struct CacheEntry {
    closure: BTreeSet<String>,
    created_at: Instant,
}

impl CacheEntry {
    fn new(closure: BTreeSet<String>) -> Self {
        Self {
            closure,
            created_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() > ttl
    }
}

/// Thread-safe LRU cache with TTL expiration for descendant closures.
///
/// Shared by every request served by one [`SearchExecutor`](crate::SearchExecutor);
/// the ontology snapshot is assumed stable for the TTL.
pub struct ClosureCache {
    inner: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl ClosureCache {
    /// Creates a cache from configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_capacity(config.max_entries, config.ttl)
    }

    /// Creates a cache with custom capacity and TTL.
    ///
    /// A capacity of zero is treated as one.
    pub fn with_capacity(max_entries: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_entries.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Gets the cached closure for `id`, promoting it to most-recently-used.
    ///
    /// Expired entries are removed and reported as a miss.
    pub fn get(&self, id: &str) -> Option<BTreeSet<String>> {
        let mut cache = self.inner.lock();
        if let Some(entry) = cache.get(id) {
            if entry.is_expired(self.ttl) {
                cache.pop(id);
                return None;
            }
            return Some(entry.closure.clone());
        }
        None
    }

    /// Stores the closure for `id`, evicting the least recently used entry
    /// when full.
    pub fn set(&self, id: String, closure: BTreeSet<String>) {
        self.inner.lock().put(id, CacheEntry::new(closure));
    }

    /// Returns the number of entries, including expired ones not yet removed.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all entries.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Removes expired entries.
    pub fn cleanup_expired(&self) {
        let mut cache = self.inner.lock();
        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.ttl))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            cache.pop(&key);
        }
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let cache = self.inner.lock();
        let total = cache.len();
        let expired = cache
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.ttl))
            .count();
        CacheStats {
            total_entries: total,
            expired_entries: expired,
            valid_entries: total.saturating_sub(expired),
        }
    }
}

impl std::fmt::Debug for ClosureCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosureCache")
            .field("entries", &self.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Statistics about the cache state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of entries.
    pub total_entries: usize,
    /// Entries past their TTL that have not been removed yet.
    pub expired_entries: usize,
    /// Entries still valid.
    pub valid_entries: usize,
}
