//! Reachability types

use provenance_core::{CallGraphError, DataAccessRef, FunctionId, FunctionNode, SensitivityType};
use serde::{Deserialize, Serialize};

/// Code location
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeLocation {
    pub file: String,
    pub line: u32,
    pub function_id: Option<FunctionId>,
}

/// A node in a call path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallPathNode {
    pub function_id: FunctionId,
    /// Qualified name
    pub function_name: String,
    pub file: String,
    pub line: u32,
}

impl CallPathNode {
    pub fn from_function(func: &FunctionNode) -> Self {
        Self {
            function_id: func.id.clone(),
            function_name: func.qualified_name.clone(),
            file: func.file.clone(),
            line: func.start_line,
        }
    }
}

/// A reachable data access with the path that reaches it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReachableDataAccess {
    /// Function holding the access
    pub function_id: FunctionId,
    pub file: String,
    pub access: DataAccessRef,
    /// Origin first, accessing function last
    pub path: Vec<CallPathNode>,
    pub depth: u32,
}

/// Sensitive field information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitiveField {
    pub table: String,
    pub field: String,
    pub sensitivity: SensitivityType,
}

/// Sensitive field access info
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitiveFieldAccess {
    pub field: SensitiveField,
    /// Distinct paths reaching the field
    pub paths: Vec<Vec<CallPathNode>>,
    pub access_count: u32,
}

/// Reachability query options
#[derive(Debug, Clone, Default)]
pub struct ReachabilityOptions {
    /// Maximum call depth to traverse (unbounded when `None`)
    pub max_depth: Option<u32>,
    /// Only include accesses to sensitive data
    pub sensitive_only: bool,
    /// Only include accesses to these tables (all when empty)
    pub tables: Vec<String>,
}

/// Result of forward reachability analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReachabilityResult {
    pub origin: CodeLocation,
    /// Sorted, distinct
    pub tables: Vec<String>,
    /// Sorted by (table, field)
    pub sensitive_fields: Vec<SensitiveFieldAccess>,
    pub reachable_access: Vec<ReachableDataAccess>,
    pub functions_traversed: u32,
    /// Deepest call depth visited
    pub max_depth_reached: u32,
    /// Call sites in traversed functions that were never followed
    pub unresolved_calls: u32,
    /// Set when no graph has been built; tells the caller what to run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_missing: Option<String>,
}

impl ReachabilityResult {
    pub fn empty(origin: CodeLocation) -> Self {
        Self {
            origin,
            ..Default::default()
        }
    }

    pub fn without_graph(origin: CodeLocation, error: &CallGraphError) -> Self {
        Self {
            origin,
            graph_missing: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// False when the query ran against a graph that was never built.
    pub fn graph_available(&self) -> bool {
        self.graph_missing.is_none()
    }

    /// Most severe class among the reached sensitive fields.
    pub fn max_sensitivity(&self) -> SensitivityType {
        self.sensitive_fields
            .iter()
            .map(|s| s.field.sensitivity)
            .max_by_key(|s| s.severity())
            .unwrap_or(SensitivityType::Unknown)
    }
}

/// Inverse reachability options
#[derive(Debug, Clone, Default)]
pub struct InverseReachabilityOptions {
    pub table: String,
    pub field: Option<String>,
    pub max_depth: Option<u32>,
}

/// Target for an inverse query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InverseTarget {
    pub table: String,
    pub field: Option<String>,
}

/// Shortest path from one entry point down to a data accessor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverseAccessPath {
    pub entry_point: FunctionId,
    /// Entry point first, accessor last
    pub path: Vec<CallPathNode>,
    pub accessor_id: FunctionId,
    pub access_point: DataAccessRef,
}

/// Result of inverse reachability query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InverseReachabilityResult {
    pub target: InverseTarget,
    pub total_accessors: u32,
    /// Sorted, distinct
    pub entry_points: Vec<FunctionId>,
    /// One per entry point, sorted by entry point id
    pub access_paths: Vec<InverseAccessPath>,
    pub functions_traversed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_missing: Option<String>,
}

impl InverseReachabilityResult {
    pub fn graph_available(&self) -> bool {
        self.graph_missing.is_none()
    }
}
