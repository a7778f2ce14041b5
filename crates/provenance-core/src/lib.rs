//! provenance-core: shared foundation for the call-graph provenance engine.
//!
//! - `types`: the call-graph data model (functions, call edges, shards, index documents)
//! - `errors`: one error enum per subsystem, all `thiserror`
//! - `config`: TOML configuration with layered resolution
//! - `tracing`: `PROVENANCE_LOG`-driven subscriber setup and span field names
//! - `traits`: cooperative cancellation

pub mod config;
pub mod errors;
pub mod tracing;
pub mod traits;
pub mod types;

pub use config::ProvenanceConfig;
pub use errors::{
    CallGraphError, ConfigError, ErrorCode, ExtractionError, PipelineError, PipelineResult,
    StorageError,
};
pub use traits::{Cancellable, CancellationToken};
pub use types::call_graph::*;
