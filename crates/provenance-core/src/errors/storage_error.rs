//! Shard store errors.

use super::error_code::{self, ErrorCode};

/// Errors raised while writing or enumerating persisted call-graph documents.
///
/// Reads never produce these: a missing or corrupt shard is reported as absent.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize {what}: {message}")]
    Serialization { what: String, message: String },

    #[error("Corrupt document at {path}: {message}")]
    Corrupt { path: String, message: String },

    #[error("Invalid store root: {path}")]
    InvalidRoot { path: String },
}

impl StorageError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

impl ErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Corrupt { .. } => error_code::SHARD_CORRUPT,
            _ => error_code::STORAGE_ERROR,
        }
    }
}
