//! Call graph types
//!
//! Core data structures for call graph building, persistence and queries.
//! A `FileShard` owns every `FunctionNode` defined in one source file; call
//! edges and caller refs name other functions by id but never own them.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// Format version written into every persisted document.
/// A mismatch on read means "treat as absent, rebuild".
pub const FORMAT_VERSION: &str = "1.0";

/// Function id: `"file:name:start_line"`.
pub type FunctionId = String;

/// A function or method found in one source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionNode {
    /// Unique ID: "file:name:line"
    pub id: FunctionId,
    /// Function name
    pub name: String,
    /// Dotted name including the enclosing class, e.g. "AccountService.get_user"
    pub qualified_name: String,
    /// Source file path (relative to project root)
    pub file: String,
    /// Start line in source
    pub start_line: u32,
    /// End line in source
    pub end_line: u32,
    /// Is this an entry point (exported, route handler, etc.)?
    pub is_entry_point: bool,
    /// Does this function access data?
    pub is_data_accessor: bool,
    /// Calls made by this function
    pub calls: Vec<CallEdge>,
    /// Functions that call this one (materialized after resolution)
    #[serde(default)]
    pub called_by: Vec<CallerRef>,
    /// Data access points in this function
    #[serde(default)]
    pub data_access: Vec<DataAccessRef>,
}

impl FunctionNode {
    /// Build the deterministic id for a function.
    pub fn make_id(file: &str, name: &str, start_line: u32) -> FunctionId {
        format!("{}:{}:{}", file, name, start_line)
    }

    /// Recover the file path from an id by splitting off the last two fields.
    pub fn file_from_id(id: &str) -> Option<&str> {
        let mut parts = id.rsplitn(3, ':');
        let _line = parts.next()?;
        let _name = parts.next()?;
        parts.next().filter(|file| !file.is_empty())
    }

    pub fn contains_line(&self, line: u32) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    pub fn span(&self) -> u32 {
        self.end_line.saturating_sub(self.start_line)
    }

    /// Number of outgoing call sites the resolver could not map to a function.
    pub fn unresolved_call_count(&self) -> usize {
        self.calls.iter().filter(|c| !c.resolved).count()
    }

    /// Ids of resolved callees, in call-site order.
    pub fn resolved_callees(&self) -> impl Iterator<Item = &str> {
        self.calls
            .iter()
            .filter(|c| c.resolved)
            .filter_map(|c| c.resolved_id.as_deref())
    }

    /// Does any access in this function touch `table` (and `field`, if given)?
    pub fn accesses(&self, table: &str, field: Option<&str>) -> bool {
        self.data_access.iter().any(|a| a.matches(table, field))
    }
}

/// A call site with resolution information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEdge {
    /// Target function name (as written in code)
    pub target: String,
    /// Whether the call was resolved
    pub resolved: bool,
    /// Resolved function ID (if resolved)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_id: Option<FunctionId>,
    /// Resolution confidence (0.0-1.0)
    pub confidence: f64,
    /// Line number of the call
    pub line: u32,
}

impl CallEdge {
    /// A freshly extracted, not yet resolved call.
    pub fn unresolved(target: impl Into<String>, line: u32) -> Self {
        Self {
            target: target.into(),
            resolved: false,
            resolved_id: None,
            confidence: 0.0,
            line,
        }
    }
}

/// Inverse of a resolved `CallEdge`, stored on the callee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerRef {
    pub caller_id: FunctionId,
    pub line: u32,
}

/// A data access reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataAccessRef {
    /// Table/collection name
    pub table: String,
    /// Operation type
    pub operation: DataOperation,
    /// Line number
    pub line: u32,
    /// Fields accessed
    #[serde(default)]
    pub fields: Vec<String>,
}

impl DataAccessRef {
    pub fn matches(&self, table: &str, field: Option<&str>) -> bool {
        self.table == table && field.map_or(true, |f| self.fields.iter().any(|x| x == f))
    }
}

/// Data operation type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataOperation {
    Read,
    Write,
    Delete,
}

impl DataOperation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "read" | "select" | "find" | "get" => Some(Self::Read),
            "write" | "insert" | "update" | "upsert" | "create" | "save" => Some(Self::Write),
            "delete" | "remove" | "destroy" => Some(Self::Delete),
            _ => None,
        }
    }
}

impl std::fmt::Display for DataOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Sensitivity class of a table/field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityType {
    Credentials,
    Financial,
    Health,
    Pii,
    Unknown,
}

impl SensitivityType {
    /// All classes, most severe first.
    pub const ALL: [SensitivityType; 5] = [
        Self::Credentials,
        Self::Financial,
        Self::Health,
        Self::Pii,
        Self::Unknown,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Credentials => "credentials",
            Self::Financial => "financial",
            Self::Health => "health",
            Self::Pii => "pii",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Numeric severity for ordering (higher = more severe).
    pub fn severity(&self) -> u8 {
        match self {
            Self::Credentials => 4,
            Self::Financial => 3,
            Self::Health => 2,
            Self::Pii => 1,
            Self::Unknown => 0,
        }
    }

    pub fn is_sensitive(&self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for SensitivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A call graph shard - functions in a single file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileShard {
    /// Source file path (relative to project root)
    pub file: String,
    /// Functions in this file
    pub functions: Vec<FunctionNode>,
}

impl FileShard {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            functions: Vec::new(),
        }
    }

    /// Storage key of this shard.
    pub fn hash(&self) -> String {
        shard_key(&self.file)
    }

    pub fn function(&self, id: &str) -> Option<&FunctionNode> {
        self.functions.iter().find(|f| f.id == id)
    }

    pub fn call_count(&self) -> usize {
        self.functions.iter().map(|f| f.calls.len()).sum()
    }

    pub fn resolved_call_count(&self) -> usize {
        self.functions
            .iter()
            .flat_map(|f| &f.calls)
            .filter(|c| c.resolved)
            .count()
    }
}

/// Stable, content-independent key for a source path.
///
/// xxh3-64 of the path with `\` normalized to `/`, as 16 lowercase hex digits.
/// Renaming the file changes the key; re-scanning it does not.
pub fn shard_key(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    format!("{:016x}", xxh3_64(normalized.as_bytes()))
}

/// Call graph index document - derived, always rebuildable from shards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallGraphIndex {
    /// Schema version
    pub version: String,
    /// Unix seconds when generated
    pub generated_at: u64,
    /// Summary statistics
    pub summary: CallGraphSummary,
    /// File entries
    pub files: Vec<FileIndexEntry>,
    /// Top entry points
    pub top_entry_points: Vec<EntryPointSummary>,
    /// Top data accessors
    pub top_data_accessors: Vec<DataAccessorSummary>,
}

/// Call graph summary statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallGraphSummary {
    pub total_files: usize,
    pub total_functions: usize,
    pub total_calls: usize,
    pub resolved_call_sites: usize,
    pub unresolved_call_sites: usize,
    pub resolution_rate: f64,
    pub entry_points: usize,
    pub data_accessors: usize,
    /// Mean forward call depth reachable from entry points
    pub avg_depth: f64,
}

/// File index entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileIndexEntry {
    pub file: String,
    pub file_hash: String,
    pub function_count: usize,
    pub entry_point_count: usize,
    pub data_accessor_count: usize,
}

/// Entry point summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPointSummary {
    pub id: FunctionId,
    pub name: String,
    pub file: String,
    pub line: u32,
    pub reachable_functions: usize,
    pub reachable_tables: usize,
}

/// Data accessor summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataAccessorSummary {
    pub id: FunctionId,
    pub name: String,
    pub file: String,
    pub line: u32,
    pub tables: Vec<String>,
    pub operations: Vec<DataOperation>,
}

/// Entry points document - full detail per entry point
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPointsData {
    pub version: String,
    pub generated_at: u64,
    pub entry_points: Vec<EntryPointDetail>,
}

/// Everything reachable from one entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPointDetail {
    pub id: FunctionId,
    pub name: String,
    pub qualified_name: String,
    pub file: String,
    pub line: u32,
    pub reachable_functions: Vec<FunctionId>,
    pub reachable_tables: Vec<String>,
    pub max_depth: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_round_trip() {
        let id = FunctionNode::make_id("src/api/routes.py", "login_user", 12);
        assert_eq!(id, "src/api/routes.py:login_user:12");
        assert_eq!(FunctionNode::file_from_id(&id), Some("src/api/routes.py"));
    }

    #[test]
    fn test_file_from_id_keeps_colons_in_path() {
        assert_eq!(
            FunctionNode::file_from_id("C:/repo/main.ts:main:1"),
            Some("C:/repo/main.ts")
        );
        assert_eq!(FunctionNode::file_from_id("main"), None);
    }

    #[test]
    fn test_shard_key_is_stable_and_path_sensitive() {
        let a = shard_key("src/a.ts");
        assert_eq!(a, shard_key("src/a.ts"));
        assert_eq!(a, shard_key("src\\a.ts"));
        assert_ne!(a, shard_key("src/b.ts"));
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_sensitivity_ordering() {
        assert!(SensitivityType::Credentials.severity() > SensitivityType::Financial.severity());
        assert!(SensitivityType::Pii.severity() > SensitivityType::Unknown.severity());
        assert_eq!(SensitivityType::from_name("PII"), Some(SensitivityType::Pii));
        assert_eq!(SensitivityType::from_name("secrets"), None);
    }
}
