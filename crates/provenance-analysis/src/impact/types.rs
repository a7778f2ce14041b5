//! Impact analysis types

use provenance_core::{CallGraphError, DataOperation, FunctionId, FunctionNode, SensitivityType};
use serde::{Deserialize, Serialize};

use crate::reachability::CallPathNode;

/// Risk tier of a change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ImpactOptions {
    /// Maximum caller depth (unbounded when `None`)
    pub max_depth: Option<u32>,
}

/// A function affected by the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectedFunction {
    pub id: FunctionId,
    pub name: String,
    pub qualified_name: String,
    pub file: String,
    pub line: u32,
    /// Hops from the change; 0 for changed functions themselves
    pub depth: u32,
    pub is_entry_point: bool,
    pub accesses_sensitive_data: bool,
    /// This function first, changed function last
    pub path_to_change: Vec<CallPathNode>,
}

impl AffectedFunction {
    pub(crate) fn new(func: &FunctionNode, depth: u32, path_to_change: Vec<CallPathNode>) -> Self {
        Self {
            id: func.id.clone(),
            name: func.name.clone(),
            qualified_name: func.qualified_name.clone(),
            file: func.file.clone(),
            line: func.start_line,
            depth,
            is_entry_point: func.is_entry_point,
            accesses_sensitive_data: false,
            path_to_change,
        }
    }
}

/// An entry point that reaches sensitive data through the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectedDataPath {
    pub table: String,
    pub fields: Vec<String>,
    pub operation: DataOperation,
    /// Function holding the access
    pub accessor_id: FunctionId,
    pub entry_point: FunctionId,
    pub entry_point_name: String,
    /// Entry point first, accessor last
    pub full_path: Vec<CallPathNode>,
    pub sensitivity: SensitivityType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactSummary {
    /// Callers at depth 1
    pub directly_affected: usize,
    /// Callers deeper than 1
    pub transitively_affected: usize,
    pub affected_entry_points: usize,
    pub affected_data_paths: usize,
    pub max_depth: u32,
    /// Unresolved call sites in changed and affected functions
    pub unresolved_calls: usize,
}

/// Result of analyzing a file, function or name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImpactAnalysisResult {
    /// File path, function id or name that was analyzed
    pub target: String,
    pub risk: RiskLevel,
    pub risk_score: u32,
    pub summary: ImpactSummary,
    /// Sorted by (depth, id)
    pub affected: Vec<AffectedFunction>,
    /// Sorted by (depth, id)
    pub entry_points: Vec<AffectedFunction>,
    pub sensitive_data_paths: Vec<AffectedDataPath>,
    /// Sorted
    pub changed_functions: Vec<FunctionId>,
    /// Set when no graph has been built; tells the caller what to run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_missing: Option<String>,
}

impl ImpactAnalysisResult {
    pub fn empty(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Default::default()
        }
    }

    pub fn without_graph(target: impl Into<String>, error: &CallGraphError) -> Self {
        Self {
            target: target.into(),
            graph_missing: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn graph_available(&self) -> bool {
        self.graph_missing.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.changed_functions.is_empty()
    }
}
