//! Call graph extractor trait
//!
//! Defines the per-file extraction contract. Parsing source text is the
//! extractor's job; the builder only consumes these structures.

use provenance_core::{DataOperation, ExtractionError};
use serde::{Deserialize, Serialize};

/// Extraction result from a single file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileExtractionResult {
    /// Source file path (relative to project root)
    pub file: String,
    pub language: String,
    /// Functions found in the file
    pub functions: Vec<ExtractedFunction>,
    /// Call sites found in the file
    pub calls: Vec<ExtractedCall>,
    pub imports: Vec<ExtractedImport>,
    pub classes: Vec<ExtractedClass>,
    pub data_access_points: Vec<ExtractedDataAccess>,
    /// Non-fatal problems the extractor hit in this file
    #[serde(default)]
    pub errors: Vec<String>,
}

/// An extracted function
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedFunction {
    pub name: String,
    /// Dotted name if the extractor computed one
    #[serde(default)]
    pub qualified_name: Option<String>,
    pub start_line: u32,
    pub end_line: u32,
    pub is_exported: bool,
    /// Enclosing class, if a method
    #[serde(default)]
    pub class_name: Option<String>,
    /// Decorators/annotations as written, e.g. `@app.post("/login")`
    #[serde(default)]
    pub decorators: Vec<String>,
}

/// An extracted call site
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedCall {
    pub callee_name: String,
    pub line: u32,
    #[serde(default)]
    pub receiver: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedImport {
    pub source: String,
    pub names: Vec<String>,
    pub line: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedClass {
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
}

/// A data access point found by the extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedDataAccess {
    pub table: String,
    pub fields: Vec<String>,
    pub operation: DataOperation,
    pub line: u32,
    pub confidence: f64,
}

/// Trait for language-specific call graph extraction
pub trait CallGraphExtractor: Send + Sync {
    /// Check if this extractor can handle the given file
    fn can_handle(&self, file: &str) -> bool;

    /// Extract functions, calls and data access from source text
    fn extract(&self, source: &str, file: &str) -> Result<FileExtractionResult, ExtractionError>;

    /// Get the language this extractor handles
    fn language(&self) -> &str;
}
