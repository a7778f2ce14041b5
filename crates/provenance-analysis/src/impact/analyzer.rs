//! Change impact analysis via inverse BFS over `calledBy`.

use std::collections::{BTreeMap, VecDeque};

use provenance_core::types::collections::FxHashMap;
use provenance_core::{CallGraphError, DataOperation, FunctionId, FunctionNode, SensitivityType};
use tracing::{debug, info, warn};

use super::scoring::{risk_level, risk_score, PathCounts};
use super::types::*;
use crate::graph::CallGraphSource;
use crate::reachability::{
    unwind, CallPathNode, PathLinks, ReachabilityEngine, ReachabilityOptions, ReachableDataAccess,
};
use crate::sensitivity::SensitivityClassifier;

/// A caller found by the backward search.
struct Reached {
    func: FunctionNode,
    depth: u32,
    /// Caller first, changed function last
    path: Vec<CallPathNode>,
}

/// A sensitive access forward-reachable from one changed function.
struct SensitiveHit {
    access: ReachableDataAccess,
    sensitivity: SensitivityType,
}

/// (entry point, accessor, table, line, operation)
type DataPathKey = (FunctionId, FunctionId, String, u32, DataOperation);

pub struct ImpactAnalyzer<'a> {
    reachability: ReachabilityEngine<'a>,
}

impl<'a> ImpactAnalyzer<'a> {
    pub fn new(source: &'a dyn CallGraphSource) -> Self {
        Self {
            reachability: ReachabilityEngine::new(source),
        }
    }

    pub fn with_classifier(mut self, classifier: &'a dyn SensitivityClassifier) -> Self {
        self.reachability = self.reachability.with_classifier(classifier);
        self
    }

    fn source(&self) -> &'a dyn CallGraphSource {
        self.reachability.source()
    }

    /// Impact of changing every function defined in `file`.
    pub fn analyze_file(&self, file: &str, options: &ImpactOptions) -> ImpactAnalysisResult {
        let changed = self.source().functions_in_file(file);
        self.analyze(file, changed, options)
    }

    pub fn analyze_function(&self, function_id: &str, options: &ImpactOptions) -> ImpactAnalysisResult {
        let changed: Vec<FunctionNode> = self.source().function(function_id).into_iter().collect();
        if changed.is_empty() {
            debug!(
                error = %CallGraphError::FunctionNotFound { id: function_id.to_string() },
                "nothing to analyze"
            );
        }
        self.analyze(function_id, changed, options)
    }

    /// Every function whose simple or qualified name is `name`.
    pub fn analyze_function_by_name(&self, name: &str, options: &ImpactOptions) -> ImpactAnalysisResult {
        let changed = self.source().functions_named(name);
        self.analyze(name, changed, options)
    }

    fn analyze(
        &self,
        target: &str,
        mut changed: Vec<FunctionNode>,
        options: &ImpactOptions,
    ) -> ImpactAnalysisResult {
        if let Err(e) = self.reachability.ensure_built() {
            warn!(impact_target = %target, error = %e, "impact analysis without a graph");
            return ImpactAnalysisResult::without_graph(target, &e);
        }
        if changed.is_empty() {
            return ImpactAnalysisResult::empty(target);
        }
        changed.sort_by(|a, b| a.id.cmp(&b.id));
        changed.dedup_by(|a, b| a.id == b.id);
        let max_depth = options.max_depth.unwrap_or(u32::MAX);

        // Forward: sensitive data each changed function can reach, by position.
        let hits: Vec<Vec<SensitiveHit>> = changed
            .iter()
            .map(|func| self.sensitive_hits(func, options.max_depth))
            .collect();

        // Backward: everything that calls into the change.
        let mut unresolved_calls: usize = changed.iter().map(FunctionNode::unresolved_call_count).sum();
        let mut affected: Vec<AffectedFunction> = self
            .callers_of(&changed, max_depth)
            .into_iter()
            .map(|r| {
                unresolved_calls += r.func.unresolved_call_count();
                let mut af = AffectedFunction::new(&r.func, r.depth, r.path);
                af.accesses_sensitive_data = !self.sensitive_hits(&r.func, options.max_depth).is_empty();
                af
            })
            .collect();
        affected.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.id.cmp(&b.id)));

        let mut entry_points: Vec<AffectedFunction> = changed
            .iter()
            .zip(&hits)
            .filter(|(f, _)| f.is_entry_point)
            .map(|(f, func_hits)| {
                let mut af = AffectedFunction::new(f, 0, vec![CallPathNode::from_function(f)]);
                af.accesses_sensitive_data = !func_hits.is_empty();
                af
            })
            .collect();
        entry_points.extend(affected.iter().filter(|a| a.is_entry_point).cloned());
        entry_points.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.id.cmp(&b.id)));

        let sensitive_data_paths = self.data_paths(&changed, &hits, &entry_points, max_depth);

        let counts = PathCounts::from_paths(&sensitive_data_paths);
        let risk_score = risk_score(affected.len(), entry_points.len(), &counts);
        let risk = risk_level(risk_score, &counts);

        let summary = ImpactSummary {
            directly_affected: affected.iter().filter(|a| a.depth == 1).count(),
            transitively_affected: affected.iter().filter(|a| a.depth > 1).count(),
            affected_entry_points: entry_points.len(),
            affected_data_paths: sensitive_data_paths.len(),
            max_depth: affected.iter().map(|a| a.depth).max().unwrap_or(0),
            unresolved_calls,
        };

        info!(
            impact_target = %target,
            risk = %risk,
            risk_score,
            affected = affected.len(),
            entry_points = entry_points.len(),
            data_paths = sensitive_data_paths.len(),
            "impact analysis complete"
        );

        ImpactAnalysisResult {
            target: target.to_string(),
            risk,
            risk_score,
            summary,
            affected,
            entry_points,
            sensitive_data_paths,
            changed_functions: changed.into_iter().map(|f| f.id).collect(),
            graph_missing: None,
        }
    }

    fn sensitive_hits(&self, func: &FunctionNode, max_depth: Option<u32>) -> Vec<SensitiveHit> {
        let options = ReachabilityOptions {
            max_depth,
            sensitive_only: true,
            tables: Vec::new(),
        };
        let classifier = self.reachability.classifier();
        self.reachability
            .forward(&func.id, &options)
            .reachable_access
            .into_iter()
            .map(|access| SensitiveHit {
                sensitivity: classifier.classify_access(&access.access),
                access,
            })
            .collect()
    }

    /// Inverse BFS seeded with the direct callers of `seeds` at depth 1.
    /// Seeds are pre-visited and never reported.
    fn callers_of(&self, seeds: &[FunctionNode], max_depth: u32) -> Vec<Reached> {
        let mut links = PathLinks::default();
        for seed in seeds {
            links.insert(seed.id.clone(), (CallPathNode::from_function(seed), None));
        }

        let mut queue: VecDeque<(FunctionNode, u32)> = VecDeque::new();
        if max_depth > 0 {
            for seed in seeds {
                for caller in &seed.called_by {
                    self.enqueue(&mut links, &mut queue, &caller.caller_id, &seed.id, 1);
                }
            }
        }

        let mut reached = Vec::new();
        while let Some((func, depth)) = queue.pop_front() {
            if depth < max_depth {
                for caller in &func.called_by {
                    self.enqueue(&mut links, &mut queue, &caller.caller_id, &func.id, depth + 1);
                }
            }
            let path = unwind(&links, &func.id);
            reached.push(Reached { func, depth, path });
        }
        reached
    }

    fn enqueue(
        &self,
        links: &mut PathLinks,
        queue: &mut VecDeque<(FunctionNode, u32)>,
        caller_id: &str,
        next: &str,
        depth: u32,
    ) {
        if links.contains_key(caller_id) {
            return;
        }
        if let Some(caller) = self.source().function(caller_id) {
            links.insert(
                caller_id.to_string(),
                (CallPathNode::from_function(&caller), Some(next.to_string())),
            );
            queue.push_back((caller, depth));
        }
    }

    /// One path per (entry point, sensitive access) pair.
    ///
    /// An entry point that calls into the changed function holding the access
    /// gets that continuous route. Any other entry point gets its own route
    /// into the change followed by the access's route out of it, so the two
    /// halves meet at the change boundary.
    fn data_paths(
        &self,
        changed: &[FunctionNode],
        hits: &[Vec<SensitiveHit>],
        entry_points: &[AffectedFunction],
        max_depth: u32,
    ) -> Vec<AffectedDataPath> {
        let mut paths: BTreeMap<DataPathKey, AffectedDataPath> = BTreeMap::new();

        for (func, func_hits) in changed.iter().zip(hits) {
            if func_hits.is_empty() {
                continue;
            }
            let mut routes: FxHashMap<FunctionId, Vec<CallPathNode>> = FxHashMap::default();
            if func.is_entry_point {
                routes.insert(func.id.clone(), vec![CallPathNode::from_function(func)]);
            }
            routes.extend(
                self.callers_of(std::slice::from_ref(func), max_depth)
                    .into_iter()
                    .filter(|r| r.func.is_entry_point)
                    .map(|r| (r.func.id, r.path)),
            );

            for entry in entry_points {
                for hit in func_hits {
                    let full_path: Vec<CallPathNode> = match routes.get(&entry.id) {
                        Some(route) => route.iter().chain(hit.access.path.iter().skip(1)).cloned().collect(),
                        None => entry
                            .path_to_change
                            .iter()
                            .chain(hit.access.path.iter())
                            .cloned()
                            .collect(),
                    };

                    let key = (
                        entry.id.clone(),
                        hit.access.function_id.clone(),
                        hit.access.access.table.clone(),
                        hit.access.access.line,
                        hit.access.access.operation,
                    );
                    let shorter = paths
                        .get(&key)
                        .map_or(true, |existing| full_path.len() < existing.full_path.len());
                    if shorter {
                        paths.insert(
                            key,
                            AffectedDataPath {
                                table: hit.access.access.table.clone(),
                                fields: hit.access.access.fields.clone(),
                                operation: hit.access.access.operation,
                                accessor_id: hit.access.function_id.clone(),
                                entry_point: entry.id.clone(),
                                entry_point_name: entry.qualified_name.clone(),
                                full_path,
                                sensitivity: hit.sensitivity,
                            },
                        );
                    }
                }
            }
        }

        paths.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::CallGraph;
    use provenance_core::{CallEdge, CallerRef, DataAccessRef};

    fn func(file: &str, name: &str, line: u32) -> FunctionNode {
        FunctionNode {
            id: FunctionNode::make_id(file, name, line),
            name: name.to_string(),
            qualified_name: name.to_string(),
            file: file.to_string(),
            start_line: line,
            end_line: line + 9,
            is_entry_point: false,
            is_data_accessor: false,
            calls: Vec::new(),
            called_by: Vec::new(),
            data_access: Vec::new(),
        }
    }

    fn link(fns: &mut [FunctionNode], caller: usize, callee: usize) {
        let callee_id = fns[callee].id.clone();
        let caller_id = fns[caller].id.clone();
        let line = fns[caller].start_line + 1;
        fns[caller].calls.push(CallEdge {
            target: fns[callee].name.clone(),
            resolved: true,
            resolved_id: Some(callee_id),
            confidence: 0.8,
            line,
        });
        fns[callee].called_by.push(CallerRef { caller_id, line });
    }

    fn graph(fns: Vec<FunctionNode>) -> CallGraph {
        let mut g = CallGraph::new();
        for f in fns {
            g.insert(f);
        }
        g
    }

    /// route(entry) -> handler -> repo(users.email)
    fn pii_chain() -> CallGraph {
        let mut fns = vec![
            func("routes.ts", "route", 1),
            func("handler.ts", "handler", 1),
            func("repo.ts", "repo", 1),
        ];
        fns[0].is_entry_point = true;
        fns[2].data_access.push(DataAccessRef {
            table: "users".into(),
            operation: DataOperation::Read,
            line: 3,
            fields: vec!["email".into()],
        });
        link(&mut fns, 0, 1);
        link(&mut fns, 1, 2);
        graph(fns)
    }

    /// route_a(entry) -> helper, route_b(entry) -> repo(users.email);
    /// helper and repo share svc.ts
    fn split_routes() -> CallGraph {
        let mut fns = vec![
            func("routes.ts", "route_a", 1),
            func("routes.ts", "route_b", 20),
            func("svc.ts", "helper", 1),
            func("svc.ts", "repo", 20),
        ];
        fns[0].is_entry_point = true;
        fns[1].is_entry_point = true;
        fns[3].data_access.push(DataAccessRef {
            table: "users".into(),
            operation: DataOperation::Read,
            line: 22,
            fields: vec!["email".into()],
        });
        link(&mut fns, 0, 2);
        link(&mut fns, 1, 3);
        graph(fns)
    }

    #[test]
    fn test_sensitive_flag_follows_each_caller() {
        let g = split_routes();
        let analyzer = ImpactAnalyzer::new(&g);
        let result = analyzer.analyze_file("svc.ts", &ImpactOptions::default());

        let flags: Vec<_> = result
            .affected
            .iter()
            .map(|a| (a.name.as_str(), a.accesses_sensitive_data))
            .collect();
        assert_eq!(flags, vec![("route_a", false), ("route_b", true)]);
    }

    #[test]
    fn test_every_entry_point_pairs_with_every_access() {
        let g = split_routes();
        let analyzer = ImpactAnalyzer::new(&g);
        let result = analyzer.analyze_file("svc.ts", &ImpactOptions::default());

        let paths: Vec<(&str, Vec<&str>)> = result
            .sensitive_data_paths
            .iter()
            .map(|p| {
                (
                    p.entry_point_name.as_str(),
                    p.full_path.iter().map(|n| n.function_name.as_str()).collect(),
                )
            })
            .collect();
        assert_eq!(
            paths,
            vec![
                ("route_a", vec!["route_a", "helper", "repo"]),
                ("route_b", vec!["route_b", "repo"]),
            ]
        );
        // 2*2 + 2*5 + 2*5
        assert_eq!(result.risk_score, 24);
        assert_eq!(result.risk, RiskLevel::Medium);
    }

    #[test]
    fn test_unbuilt_graph_is_flagged() {
        let g = CallGraph::new();
        let analyzer = ImpactAnalyzer::new(&g);
        let result = analyzer.analyze_file("svc.ts", &ImpactOptions::default());
        assert!(!result.graph_available());
        assert!(result.graph_missing.as_deref().unwrap().contains("in-memory graph"));
        assert_eq!(result.target, "svc.ts");

        let built = split_routes();
        let analyzer = ImpactAnalyzer::new(&built);
        assert!(analyzer
            .analyze_file("missing.ts", &ImpactOptions::default())
            .graph_available());
    }

    #[test]
    fn test_missing_target_is_empty() {
        let g = pii_chain();
        let analyzer = ImpactAnalyzer::new(&g);
        let result = analyzer.analyze_function("nope.ts:x:1", &ImpactOptions::default());
        assert!(result.is_empty());
        assert_eq!(result.risk, RiskLevel::Low);
        assert_eq!(result.risk_score, 0);
        assert_eq!(result.target, "nope.ts:x:1");
    }

    #[test]
    fn test_callers_and_entry_points() {
        let g = pii_chain();
        let analyzer = ImpactAnalyzer::new(&g);
        let result = analyzer.analyze_function("repo.ts:repo:1", &ImpactOptions::default());

        let ids: Vec<_> = result.affected.iter().map(|a| (a.id.as_str(), a.depth)).collect();
        assert_eq!(ids, vec![("handler.ts:handler:1", 1), ("routes.ts:route:1", 2)]);
        assert_eq!(result.summary.directly_affected, 1);
        assert_eq!(result.summary.transitively_affected, 1);
        assert_eq!(result.entry_points.len(), 1);
        let path: Vec<_> = result.entry_points[0]
            .path_to_change
            .iter()
            .map(|n| n.function_name.as_str())
            .collect();
        assert_eq!(path, vec!["route", "handler", "repo"]);

        assert_eq!(result.sensitive_data_paths.len(), 1);
        assert_eq!(result.sensitive_data_paths[0].sensitivity, SensitivityType::Pii);
        // 2*2 + 5*1 + 5 = 14, raised to medium by the pii path
        assert_eq!(result.risk_score, 14);
        assert_eq!(result.risk, RiskLevel::Medium);
        assert!(result.affected.iter().all(|a| a.accesses_sensitive_data));
    }

    #[test]
    fn test_max_depth_limits_callers() {
        let g = pii_chain();
        let analyzer = ImpactAnalyzer::new(&g);
        let options = ImpactOptions { max_depth: Some(1) };
        let result = analyzer.analyze_function("repo.ts:repo:1", &options);
        assert_eq!(result.affected.len(), 1);
        assert!(result.affected.iter().all(|a| a.depth <= 1));
        assert!(result.entry_points.is_empty());
        assert!(result.sensitive_data_paths.is_empty());
    }

    #[test]
    fn test_changed_entry_point_at_depth_zero() {
        let g = pii_chain();
        let analyzer = ImpactAnalyzer::new(&g);
        let result = analyzer.analyze_file("routes.ts", &ImpactOptions::default());
        assert!(result.affected.is_empty());
        assert_eq!(result.entry_points.len(), 1);
        assert_eq!(result.entry_points[0].depth, 0);
        // route -> handler -> repo reaches users.email
        assert_eq!(result.sensitive_data_paths.len(), 1);
        assert_eq!(result.sensitive_data_paths[0].full_path.len(), 3);
    }

    #[test]
    fn test_recursion_terminates() {
        let mut fns = vec![func("a.ts", "a", 1), func("a.ts", "b", 20)];
        link(&mut fns, 0, 1);
        link(&mut fns, 1, 0);
        link(&mut fns, 0, 0);
        let g = graph(fns);
        let analyzer = ImpactAnalyzer::new(&g);
        let result = analyzer.analyze_function("a.ts:a:1", &ImpactOptions::default());
        assert_eq!(result.affected.len(), 1);
        assert_eq!(result.affected[0].id, "a.ts:b:20");
    }

    #[test]
    fn test_by_name() {
        let g = pii_chain();
        let analyzer = ImpactAnalyzer::new(&g);
        let result = analyzer.analyze_function_by_name("handler", &ImpactOptions::default());
        assert_eq!(result.changed_functions, vec!["handler.ts:handler:1".to_string()]);
        assert_eq!(result.summary.affected_entry_points, 1);
    }
}
