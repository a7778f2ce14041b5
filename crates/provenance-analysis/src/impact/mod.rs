//! Impact analysis: "what breaks if I change this code?"
//!
//! Walks `calledBy` backward from a changed file or function to find affected
//! callers and entry points, then cross-references the sensitive data the
//! change can reach to score the risk.

mod analyzer;
mod scoring;
mod types;

pub use analyzer::ImpactAnalyzer;
pub use scoring::{risk_level, risk_score, PathCounts, MAX_RISK_SCORE};
pub use types::*;
