//! Configuration system.
//! TOML-based, layered resolution: CLI > env > project > user > defaults.

pub mod analysis_config;
pub mod build_config;
pub mod provenance_config;
pub mod scoring_config;

pub use analysis_config::AnalysisConfig;
pub use build_config::BuildConfig;
pub use provenance_config::{CliOverrides, ProvenanceConfig};
pub use scoring_config::ScoringConfig;
