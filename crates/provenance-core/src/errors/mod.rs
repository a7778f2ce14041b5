//! Error handling for the provenance engine.
//! One error enum per subsystem, `thiserror` only.

pub mod call_graph_error;
pub mod config_error;
pub mod error_code;
pub mod extraction_error;
pub mod pipeline_error;
pub mod storage_error;

pub use call_graph_error::CallGraphError;
pub use config_error::ConfigError;
pub use error_code::ErrorCode;
pub use extraction_error::ExtractionError;
pub use pipeline_error::{PipelineError, PipelineResult};
pub use storage_error::StorageError;
