//! Stable error codes for front ends that only see strings.

/// Every error enum implements this to expose a structured code.
pub trait ErrorCode {
    /// Returns the error code string (e.g., "STORAGE_ERROR").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted string: `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const SHARD_CORRUPT: &str = "SHARD_CORRUPT";
pub const CALL_GRAPH_ERROR: &str = "CALL_GRAPH_ERROR";
pub const GRAPH_NOT_BUILT: &str = "GRAPH_NOT_BUILT";
pub const EXTRACTION_ERROR: &str = "EXTRACTION_ERROR";
pub const UNSUPPORTED_FILE: &str = "UNSUPPORTED_FILE";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const CANCELLED: &str = "CANCELLED";
