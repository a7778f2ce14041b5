//! Bounded shard read cache.
//!
//! Uses `moka::sync::Cache` with an entry-count bound. Tracks hits/misses.
//! Owned by [`crate::ShardStore`]; nothing else caches shards.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;
use provenance_core::FileShard;

/// Cache hit/miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Shard cache keyed by shard hash.
pub struct ShardCache {
    cache: Cache<String, Arc<FileShard>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ShardCache {
    pub fn new(max_entries: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_entries).build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn get(&self, hash: &str) -> Option<Arc<FileShard>> {
        match self.cache.get(hash) {
            Some(shard) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(shard)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, hash: String, shard: Arc<FileShard>) {
        self.cache.insert(hash, shard);
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.cache.contains_key(hash)
    }

    /// Evict one entry, or everything when `hash` is `None`.
    pub fn invalidate(&self, hash: Option<&str>) {
        match hash {
            Some(h) => self.cache.invalidate(h),
            None => self.cache.invalidate_all(),
        }
    }

    /// Number of live entries. Flushes moka's pending maintenance first so
    /// the count reflects evictions that already happened.
    pub fn len(&self) -> u64 {
        self.cache.run_pending_tasks();
        self.cache.entry_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
