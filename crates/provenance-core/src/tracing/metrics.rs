//! Structured field names used in spans and events.
//!
//! Using consistent names keeps log queries stable across subsystems.

/// Build: per-file shard construction time in milliseconds.
pub const SHARD_BUILD_TIME: &str = "shard_build_time";

/// Resolver: name-index sweep duration in milliseconds.
pub const NAME_INDEX_TIME: &str = "name_index_time";

/// Resolver: time to resolve and persist one batch in milliseconds.
pub const RESOLVE_BATCH_TIME: &str = "resolve_batch_time";

/// Resolver: fraction of call sites resolved (0.0 - 1.0).
pub const RESOLUTION_RATE: &str = "resolution_rate";

/// Store: index build duration in milliseconds.
pub const INDEX_BUILD_TIME: &str = "index_build_time";

/// Store: shard read cache hit rate (0.0 - 1.0).
pub const SHARD_CACHE_HIT_RATE: &str = "shard_cache_hit_rate";

/// Reachability/impact: functions visited by a traversal.
pub const FUNCTIONS_TRAVERSED: &str = "functions_traversed";
