//! Build and storage configuration.

use serde::{Deserialize, Serialize};

/// Configuration for graph construction and the shard store.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BuildConfig {
    /// Files per resolution batch. Default: 50.
    pub resolution_batch_size: Option<usize>,
    /// Worker threads for per-file building. Default: rayon's choice.
    pub threads: Option<usize>,
    /// Maximum shards held by the store's read cache. Default: 256.
    pub cache_capacity: Option<u64>,
    /// Shard directory, relative to the project root. Default: `.provenance/call-graph`.
    pub storage_dir: Option<String>,
}

impl BuildConfig {
    pub const DEFAULT_BATCH_SIZE: usize = 50;
    pub const DEFAULT_CACHE_CAPACITY: u64 = 256;
    pub const DEFAULT_STORAGE_DIR: &'static str = ".provenance/call-graph";

    pub fn effective_batch_size(&self) -> usize {
        self.resolution_batch_size.unwrap_or(Self::DEFAULT_BATCH_SIZE)
    }

    pub fn effective_cache_capacity(&self) -> u64 {
        self.cache_capacity.unwrap_or(Self::DEFAULT_CACHE_CAPACITY)
    }

    pub fn effective_storage_dir(&self) -> &str {
        self.storage_dir.as_deref().unwrap_or(Self::DEFAULT_STORAGE_DIR)
    }
}
