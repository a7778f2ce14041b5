//! Sensitivity and regulation overrides for scoring.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Overrides applied on top of the built-in keyword tables.
///
/// ```toml
/// [scoring.sensitivity_overrides]
/// clock_pin = "credentials"
/// nickname = "unknown"
///
/// [scoring.regulation_overrides]
/// pii = ["gdpr"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScoringConfig {
    /// Keyword (matched as an identifier segment) -> sensitivity name.
    pub sensitivity_overrides: BTreeMap<String, String>,
    /// Sensitivity name -> regulation names it implicates.
    pub regulation_overrides: BTreeMap<String, Vec<String>>,
}

/// Regulation names accepted in `regulation_overrides`.
pub const KNOWN_REGULATIONS: &[&str] = &["gdpr", "ccpa", "hipaa", "pci-dss", "sox"];
