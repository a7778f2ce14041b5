//! Enrichment types: findings in, prioritized findings out.

use provenance_core::{DataOperation, FunctionId, SensitivityType};
use serde::{Deserialize, Serialize};

use crate::impact::RiskLevel;
use crate::sensitivity::Regulation;

/// Severity reported by the detector that produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingSeverity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl FindingSeverity {
    /// Base severity sub-score (0-100).
    pub fn score(&self) -> f64 {
        match self {
            Self::Critical => 100.0,
            Self::High => 80.0,
            Self::Medium => 55.0,
            Self::Low => 30.0,
            Self::Info => 10.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }
}

/// Vulnerability class of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    Injection,
    Deserialization,
    Authentication,
    Ssrf,
    PathTraversal,
    Xss,
    Authorization,
    DataExposure,
    Cryptography,
    Misconfiguration,
    Logging,
    Other,
}

impl FindingCategory {
    /// How readily this class is exploited in practice (0-100).
    pub fn base_exploitability(&self) -> f64 {
        match self {
            Self::Injection => 95.0,
            Self::Deserialization => 90.0,
            Self::Authentication => 85.0,
            Self::Ssrf | Self::PathTraversal => 80.0,
            Self::Xss | Self::Authorization => 75.0,
            Self::DataExposure => 70.0,
            Self::Cryptography => 60.0,
            Self::Misconfiguration | Self::Other => 50.0,
            Self::Logging => 30.0,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Injection => "injection",
            Self::Deserialization => "deserialization",
            Self::Authentication => "authentication",
            Self::Ssrf => "ssrf",
            Self::PathTraversal => "path_traversal",
            Self::Xss => "xss",
            Self::Authorization => "authorization",
            Self::DataExposure => "data_exposure",
            Self::Cryptography => "cryptography",
            Self::Misconfiguration => "misconfiguration",
            Self::Logging => "logging",
            Self::Other => "other",
        }
    }
}

/// How exposed the entry points in front of a finding are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exposure {
    PublicUnauthenticated,
    Public,
    UnauthenticatedInternal,
    Internal,
    None,
}

impl Exposure {
    /// Blast-radius base score for this exposure tier.
    pub fn base_score(&self) -> f64 {
        match self {
            Self::PublicUnauthenticated => 70.0,
            Self::Public => 50.0,
            Self::UnauthenticatedInternal => 35.0,
            Self::Internal => 15.0,
            Self::None => 5.0,
        }
    }
}

/// A finding produced by an external security detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityFinding {
    pub id: String,
    pub file: String,
    pub line: u32,
    pub severity: FindingSeverity,
    pub category: FindingCategory,
    /// CVSS base score (0-10), when the detector supplies one
    #[serde(default)]
    pub cvss: Option<f64>,
    /// Known exposure; inferred from the call graph when absent
    #[serde(default)]
    pub exposure: Option<Exposure>,
}

/// A sensitive field the finding's code can reach.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitiveFieldImpact {
    pub table: String,
    pub field: String,
    pub sensitivity: SensitivityType,
    /// Distinct operations seen on the field, sorted
    pub operations: Vec<DataOperation>,
    /// Shallowest call depth at which the field is reached
    pub depth: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataImpact {
    pub fields: Vec<SensitiveFieldImpact>,
    /// All reachable tables, sensitive or not
    pub tables: Vec<String>,
    pub functions_reached: u32,
    pub max_depth: u32,
    pub regulations: Vec<Regulation>,
}

impl DataImpact {
    pub fn has_credentials(&self) -> bool {
        self.fields
            .iter()
            .any(|f| f.sensitivity == SensitivityType::Credentials)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastRadius {
    pub exposure: Exposure,
    pub affected_functions: u32,
    pub entry_points: u32,
    pub lines_of_code: u32,
    pub avg_call_depth: f64,
    /// No entry point reaches the code and at most a handful of callers do
    pub contained: bool,
}

impl Default for BlastRadius {
    fn default() -> Self {
        Self {
            exposure: Exposure::None,
            affected_functions: 0,
            entry_points: 0,
            lines_of_code: 0,
            avg_call_depth: 0.0,
            contained: true,
        }
    }
}

/// Remediation urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PriorityTier {
    P0,
    P1,
    P2,
    P3,
    P4,
}

/// A named contribution to the final score, for explaining it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactor {
    pub name: String,
    pub description: String,
}

impl ScoreFactor {
    pub(crate) fn new(name: &str, description: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityScore {
    /// 0-100
    pub overall: f64,
    pub tier: PriorityTier,
    pub severity_score: f64,
    pub data_impact_score: f64,
    pub blast_radius_score: f64,
    pub exploitability_score: f64,
    pub increasing_factors: Vec<ScoreFactor>,
    pub decreasing_factors: Vec<ScoreFactor>,
}

/// A finding with its call-graph context and priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedFinding {
    pub finding: SecurityFinding,
    /// Innermost function containing the finding, if any
    pub function_id: Option<FunctionId>,
    pub data_impact: DataImpact,
    pub blast_radius: BlastRadius,
    /// Change risk of the containing function
    pub change_risk: RiskLevel,
    pub priority: PriorityScore,
    /// Set when no graph has been built; the finding is scored on its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_missing: Option<String>,
}

impl EnrichedFinding {
    pub fn graph_available(&self) -> bool {
        self.graph_missing.is_none()
    }
}
