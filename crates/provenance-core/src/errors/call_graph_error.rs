//! Call graph errors.

use super::error_code::{self, ErrorCode};
use super::StorageError;

/// Errors that can occur during call graph construction and resolution.
#[derive(Debug, thiserror::Error)]
pub enum CallGraphError {
    #[error("No call graph found at {path}. Run the build first.")]
    GraphNotBuilt { path: String },

    #[error("Function not found: {id}")]
    FunctionNotFound { id: String },

    #[error("Resolution cancelled after {completed_batches} batch(es)")]
    Cancelled { completed_batches: usize },

    #[error("Shard writer failed: {message}")]
    WriterFailed { message: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ErrorCode for CallGraphError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::GraphNotBuilt { .. } => error_code::GRAPH_NOT_BUILT,
            Self::Cancelled { .. } => error_code::CANCELLED,
            Self::Storage(e) => e.error_code(),
            _ => error_code::CALL_GRAPH_ERROR,
        }
    }
}
