//! Per-file extraction errors. Always non-fatal to a batch.

use super::error_code::{self, ErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Cannot read {file}: {message}")]
    Unreadable { file: String, message: String },

    #[error("No extractor handles {file}")]
    UnsupportedFile { file: String },

    #[error("Extraction failed for {file}: {message}")]
    Failed { file: String, message: String },
}

impl ExtractionError {
    pub fn file(&self) -> &str {
        match self {
            Self::Unreadable { file, .. }
            | Self::UnsupportedFile { file }
            | Self::Failed { file, .. } => file,
        }
    }
}

impl ErrorCode for ExtractionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFile { .. } => error_code::UNSUPPORTED_FILE,
            _ => error_code::EXTRACTION_ERROR,
        }
    }
}
