//! Additive change-risk score and tiering.

use provenance_core::SensitivityType;

use super::types::{AffectedDataPath, RiskLevel};

pub const MAX_RISK_SCORE: u32 = 100;

/// Sensitive data paths by class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathCounts {
    pub credentials: u32,
    pub financial: u32,
    pub health: u32,
    pub pii: u32,
}

impl PathCounts {
    pub fn from_paths(paths: &[AffectedDataPath]) -> Self {
        let mut counts = Self::default();
        for path in paths {
            match path.sensitivity {
                SensitivityType::Credentials => counts.credentials += 1,
                SensitivityType::Financial => counts.financial += 1,
                SensitivityType::Health => counts.health += 1,
                SensitivityType::Pii => counts.pii += 1,
                SensitivityType::Unknown => {}
            }
        }
        counts
    }
}

/// Breadth, surface, then per-path sensitivity weights; capped at 100.
pub fn risk_score(affected: usize, entry_points: usize, counts: &PathCounts) -> u32 {
    let affected = u32::try_from(affected).unwrap_or(u32::MAX);
    let entry_points = u32::try_from(entry_points).unwrap_or(u32::MAX);
    let sensitive = counts
        .credentials
        .saturating_mul(15)
        .saturating_add(counts.financial.saturating_mul(12))
        .saturating_add(counts.health.saturating_mul(10))
        .saturating_add(counts.pii.saturating_mul(5));
    let score = affected
        .saturating_mul(2)
        .min(30)
        .saturating_add(entry_points.saturating_mul(5).min(25))
        .saturating_add(sensitive);
    score.min(MAX_RISK_SCORE)
}

/// Evaluated top-down; any single sensitive path class overrides a low score.
pub fn risk_level(score: u32, counts: &PathCounts) -> RiskLevel {
    if score >= 75 || counts.credentials > 0 {
        RiskLevel::Critical
    } else if score >= 50 || counts.financial > 0 || counts.health > 0 {
        RiskLevel::High
    } else if score >= 25 || counts.pii > 0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
