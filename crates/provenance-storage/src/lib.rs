//! provenance-storage: the shard store.
//!
//! One JSON document per source file under `files/`, keyed by a stable hash of
//! the file path, plus two derived documents (`index.json`, `entry-points.json`)
//! that are always rebuildable from the shards.
//!
//! The store owns the only shard read cache in the process. Batch callers bound
//! memory by calling [`ShardStore::invalidate_cache`] between batches.

pub mod cache;
pub mod index;
pub mod queries;
pub mod store;

pub use cache::{CacheStats, ShardCache};
pub use queries::{StoreStats, TableAccess};
pub use store::ShardStore;
