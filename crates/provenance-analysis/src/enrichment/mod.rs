//! Security finding enrichment.
//!
//! Locates a finding's containing function, measures what data it can reach
//! and who can reach it, and turns that into a 0-100 priority with a P0-P4
//! tier.

mod engine;
mod scoring;
mod types;

pub use engine::{EnrichmentEngine, CONTAINED_MAX_AFFECTED};
pub use scoring::{
    calculate_blast_radius_score, calculate_data_impact_score, calculate_exploitability_score,
    calculate_priority, calculate_severity_score, priority_tier, BLAST_RADIUS_WEIGHT,
    CREDENTIAL_FLOOR, DATA_IMPACT_WEIGHT, EXPLOITABILITY_WEIGHT, SEVERITY_WEIGHT,
};
pub use types::*;
