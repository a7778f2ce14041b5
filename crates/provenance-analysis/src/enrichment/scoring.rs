//! Multi-factor priority scoring for security findings.
//!
//! Four sub-scores on a 0-100 scale are combined with fixed weights, then a
//! small set of explicit business rules adjusts the result:
//!
//! 1. regulatory implications add up to +15
//! 2. code that touches no tables is scaled by 0.7
//! 3. a contained blast radius is scaled by 0.8
//! 4. any reachable credential field floors the score at 85
//!
//! Tiering then layers hard rules on top of the number.

use provenance_core::{DataOperation, SensitivityType};

use super::types::*;

pub const SEVERITY_WEIGHT: f64 = 0.30;
pub const DATA_IMPACT_WEIGHT: f64 = 0.35;
pub const BLAST_RADIUS_WEIGHT: f64 = 0.20;
pub const EXPLOITABILITY_WEIGHT: f64 = 0.15;

pub const CREDENTIAL_FLOOR: f64 = 85.0;

const FIELD_IMPACT_BASE: f64 = 50.0;

fn sensitivity_multiplier(sensitivity: SensitivityType) -> f64 {
    match sensitivity {
        SensitivityType::Credentials => 2.0,
        SensitivityType::Financial | SensitivityType::Health => 1.6,
        SensitivityType::Pii => 1.2,
        SensitivityType::Unknown => 0.4,
    }
}

fn operation_multiplier(operation: DataOperation) -> f64 {
    match operation {
        DataOperation::Delete => 1.3,
        DataOperation::Write => 1.2,
        DataOperation::Read => 1.0,
    }
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

/// How much sensitive data the finding's code can reach, 0-100.
pub fn calculate_data_impact_score(impact: &DataImpact) -> f64 {
    let table_count = impact.tables.len();
    if impact.fields.is_empty() {
        if table_count == 0 {
            return 0.0;
        }
        return (10.0 + 5.0 * (table_count - 1) as f64).min(30.0);
    }

    let summed: f64 = impact
        .fields
        .iter()
        .map(|f| {
            let op = f
                .operations
                .iter()
                .map(|o| operation_multiplier(*o))
                .fold(1.0, f64::max);
            let decay = 1.0 / ((f.depth as f64) + 1.0).sqrt();
            FIELD_IMPACT_BASE * sensitivity_multiplier(f.sensitivity) * op * decay
        })
        .sum();

    let mut score = summed / (impact.fields.len() as f64).sqrt();
    score *= 1.0 + 0.2 * (table_count.max(1) as f64).log10();

    if impact.max_depth > 3 {
        let penalty = 1.0 - 0.05 * (impact.max_depth - 3) as f64;
        score *= penalty.max(0.5);
    }
    if impact.functions_reached > 10 {
        let boost = 0.05 * (impact.functions_reached as f64 / 10.0).log2();
        score *= 1.0 + boost.min(0.2);
    }
    clamp_score(score)
}

/// Exposure tier plus log-scaled breadth, 0-100.
pub fn calculate_blast_radius_score(blast: &BlastRadius) -> f64 {
    let functions = (10.0 * (1.0 + blast.affected_functions as f64).log10()).min(15.0);
    let lines = (5.0 * (1.0 + blast.lines_of_code as f64).log10()).min(15.0);
    clamp_score(blast.exposure.base_score() + functions + lines)
}

pub fn calculate_exploitability_score(category: FindingCategory, blast: &BlastRadius) -> f64 {
    let exposure = match blast.exposure {
        Exposure::PublicUnauthenticated => 15.0,
        Exposure::Public => 10.0,
        Exposure::UnauthenticatedInternal => 0.0,
        Exposure::Internal => -10.0,
        Exposure::None => -15.0,
    };
    let depth = if blast.avg_call_depth > 5.0 { -10.0 } else { 0.0 };
    clamp_score(category.base_exploitability() + exposure + depth)
}

/// Detector severity, averaged with CVSS when one is given.
pub fn calculate_severity_score(severity: FindingSeverity, cvss: Option<f64>) -> f64 {
    let base = severity.score();
    match cvss {
        Some(cvss) if cvss.is_finite() => clamp_score((base + cvss.clamp(0.0, 10.0) * 10.0) / 2.0),
        _ => base,
    }
}

pub fn calculate_priority(
    severity: FindingSeverity,
    category: FindingCategory,
    data_impact: &DataImpact,
    blast_radius: &BlastRadius,
    cvss: Option<f64>,
) -> PriorityScore {
    let severity_score = calculate_severity_score(severity, cvss);
    let data_impact_score = calculate_data_impact_score(data_impact);
    let blast_radius_score = calculate_blast_radius_score(blast_radius);
    let exploitability_score = calculate_exploitability_score(category, blast_radius);

    let mut increasing = Vec::new();
    let mut decreasing = Vec::new();

    let mut overall = severity_score * SEVERITY_WEIGHT
        + data_impact_score * DATA_IMPACT_WEIGHT
        + blast_radius_score * BLAST_RADIUS_WEIGHT
        + exploitability_score * EXPLOITABILITY_WEIGHT;

    if matches!(severity, FindingSeverity::Critical | FindingSeverity::High) {
        increasing.push(ScoreFactor::new("severity", format!("{} severity finding", severity.name())));
    }

    let regulations = data_impact.regulations.len();
    if regulations > 0 {
        overall += (5.0 * regulations as f64).min(15.0);
        let names: Vec<&str> = data_impact.regulations.iter().map(|r| r.name()).collect();
        increasing.push(ScoreFactor::new("regulatory", format!("implicates {}", names.join(", "))));
    }

    if data_impact.tables.is_empty() {
        overall *= 0.7;
        decreasing.push(ScoreFactor::new("no_data_access", "reaches no tables"));
    }

    if blast_radius.contained {
        overall *= 0.8;
        decreasing.push(ScoreFactor::new(
            "contained",
            format!("{} affected functions, no entry points", blast_radius.affected_functions),
        ));
    }

    let credentials = data_impact.has_credentials();
    if credentials {
        overall = overall.max(CREDENTIAL_FLOOR);
        increasing.push(ScoreFactor::new("credential_exposure", "reaches credential fields"));
    }

    match blast_radius.exposure {
        Exposure::PublicUnauthenticated => increasing.push(ScoreFactor::new(
            "public_unauthenticated",
            "reachable from public entry points without authentication",
        )),
        Exposure::Internal | Exposure::None => {
            decreasing.push(ScoreFactor::new("limited_exposure", "not reachable from public entry points"))
        }
        _ => {}
    }
    if blast_radius.avg_call_depth > 5.0 {
        decreasing.push(ScoreFactor::new(
            "deep_call_chain",
            format!("average call depth {:.1}", blast_radius.avg_call_depth),
        ));
    }

    let overall = clamp_score(overall);
    PriorityScore {
        overall,
        tier: priority_tier(overall, blast_radius.exposure, credentials),
        severity_score,
        data_impact_score,
        blast_radius_score,
        exploitability_score,
        increasing_factors: increasing,
        decreasing_factors: decreasing,
    }
}

pub fn priority_tier(overall: f64, exposure: Exposure, credentials: bool) -> PriorityTier {
    if overall >= 90.0 || (overall >= 75.0 && exposure == Exposure::PublicUnauthenticated) {
        PriorityTier::P0
    } else if overall >= 70.0 || credentials {
        PriorityTier::P1
    } else if overall >= 50.0 {
        PriorityTier::P2
    } else if overall >= 30.0 {
        PriorityTier::P3
    } else {
        PriorityTier::P4
    }
}
