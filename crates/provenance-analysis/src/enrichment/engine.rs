//! Puts security findings in call-graph context and prioritizes them.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use provenance_core::config::ScoringConfig;
use provenance_core::DataOperation;
use tracing::{debug, info, warn};

use super::scoring::calculate_priority;
use super::types::*;
use crate::graph::{innermost_function, CallGraphSource};
use crate::impact::{ImpactAnalysisResult, ImpactAnalyzer, ImpactOptions, RiskLevel};
use crate::reachability::{ReachabilityEngine, ReachabilityOptions, ReachabilityResult, WHOLE_TABLE};
use crate::sensitivity::{RegulationMapper, SensitivityClassifier};

/// At most this many affected callers, and no entry point, is "contained".
pub const CONTAINED_MAX_AFFECTED: u32 = 5;

pub struct EnrichmentEngine<'a> {
    reachability: ReachabilityEngine<'a>,
    impact: ImpactAnalyzer<'a>,
    regulations: RegulationMapper,
    max_depth: Option<u32>,
}

impl<'a> EnrichmentEngine<'a> {
    pub fn new(source: &'a dyn CallGraphSource) -> Self {
        Self {
            reachability: ReachabilityEngine::new(source),
            impact: ImpactAnalyzer::new(source),
            regulations: RegulationMapper::new(),
            max_depth: None,
        }
    }

    pub fn with_classifier(mut self, classifier: &'a dyn SensitivityClassifier) -> Self {
        self.reachability = self.reachability.with_classifier(classifier);
        self.impact = self.impact.with_classifier(classifier);
        self
    }

    /// Regulation overrides from `[scoring]`. Pair with a classifier built by
    /// `KeywordClassifier::from_config` for the sensitivity overrides.
    pub fn with_scoring_config(mut self, config: &ScoringConfig) -> Self {
        self.regulations = RegulationMapper::from_config(config);
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<u32>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn enrich(&self, finding: &SecurityFinding) -> EnrichedFinding {
        if let Err(e) = self.reachability.ensure_built() {
            warn!(finding = %finding.id, error = %e, "finding left unenriched");
            let blast_radius = BlastRadius {
                exposure: finding.exposure.unwrap_or(Exposure::None),
                ..Default::default()
            };
            let mut enriched = self.finish(finding, None, DataImpact::default(), blast_radius, RiskLevel::Low);
            enriched.graph_missing = Some(e.to_string());
            return enriched;
        }

        let functions = self.reachability.source().functions_in_file(&finding.file);
        let Some(func) = innermost_function(&functions, finding.line) else {
            debug!(finding = %finding.id, file = %finding.file, line = finding.line, "finding outside any known function");
            let blast_radius = BlastRadius {
                exposure: finding.exposure.unwrap_or(Exposure::None),
                ..Default::default()
            };
            return self.finish(finding, None, DataImpact::default(), blast_radius, RiskLevel::Low);
        };

        let reach = self.reachability.forward(
            &func.id,
            &ReachabilityOptions {
                max_depth: self.max_depth,
                ..Default::default()
            },
        );
        let impact = self.impact.analyze_function(
            &func.id,
            &ImpactOptions {
                max_depth: self.max_depth,
            },
        );

        let data_impact = self.data_impact(&reach);
        let blast_radius = blast_radius(finding, func.span() + 1, &impact);
        self.finish(finding, Some(func.id.clone()), data_impact, blast_radius, impact.risk)
    }

    /// Enrich every finding; highest priority first, ties by finding id.
    pub fn enrich_all(&self, findings: &[SecurityFinding]) -> Vec<EnrichedFinding> {
        let mut enriched: Vec<EnrichedFinding> = findings.iter().map(|f| self.enrich(f)).collect();
        enriched.sort_by(|a, b| {
            b.priority
                .overall
                .partial_cmp(&a.priority.overall)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.finding.id.cmp(&b.finding.id))
        });
        info!(findings = enriched.len(), "findings enriched");
        enriched
    }

    fn finish(
        &self,
        finding: &SecurityFinding,
        function_id: Option<String>,
        data_impact: DataImpact,
        blast_radius: BlastRadius,
        change_risk: RiskLevel,
    ) -> EnrichedFinding {
        let priority = calculate_priority(
            finding.severity,
            finding.category,
            &data_impact,
            &blast_radius,
            finding.cvss,
        );
        debug!(
            finding = %finding.id,
            overall = priority.overall,
            tier = ?priority.tier,
            "finding prioritized"
        );
        EnrichedFinding {
            finding: finding.clone(),
            function_id,
            data_impact,
            blast_radius,
            change_risk,
            priority,
            graph_missing: None,
        }
    }

    fn data_impact(&self, reach: &ReachabilityResult) -> DataImpact {
        let fields: Vec<SensitiveFieldImpact> = reach
            .sensitive_fields
            .iter()
            .map(|sf| {
                let table = &sf.field.table;
                let field = &sf.field.field;
                let touching = reach.reachable_access.iter().filter(|ra| {
                    ra.access.table == *table
                        && if field == WHOLE_TABLE {
                            ra.access.fields.is_empty()
                        } else {
                            ra.access.fields.iter().any(|f| f == field)
                        }
                });
                let mut operations: BTreeSet<DataOperation> = BTreeSet::new();
                let mut depth = u32::MAX;
                for ra in touching {
                    operations.insert(ra.access.operation);
                    depth = depth.min(ra.depth);
                }
                SensitiveFieldImpact {
                    table: table.clone(),
                    field: field.clone(),
                    sensitivity: sf.field.sensitivity,
                    operations: operations.into_iter().collect(),
                    depth: if depth == u32::MAX { 0 } else { depth },
                }
            })
            .collect();

        let regulations = self
            .regulations
            .regulations_for_all(fields.iter().map(|f| f.sensitivity));

        DataImpact {
            fields,
            tables: reach.tables.clone(),
            functions_reached: reach.functions_traversed,
            max_depth: reach.max_depth_reached,
            regulations,
        }
    }
}

fn blast_radius(finding: &SecurityFinding, lines_of_code: u32, impact: &ImpactAnalysisResult) -> BlastRadius {
    let affected_functions = impact.affected.len() as u32;
    let entry_points = impact.entry_points.len() as u32;
    let avg_call_depth = if impact.affected.is_empty() {
        0.0
    } else {
        impact.affected.iter().map(|a| a.depth as f64).sum::<f64>() / impact.affected.len() as f64
    };
    let exposure = finding.exposure.unwrap_or(if entry_points > 0 {
        Exposure::Public
    } else {
        Exposure::None
    });

    BlastRadius {
        exposure,
        affected_functions,
        entry_points,
        lines_of_code,
        avg_call_depth,
        contained: entry_points == 0 && affected_functions <= CONTAINED_MAX_AFFECTED,
    }
}
