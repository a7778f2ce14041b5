//! Reachability Engine - BFS traversal over a resolved call graph
//!
//! Forward queries follow resolved `CallEdge`s outward from a function;
//! inverse queries follow materialized `calledBy` refs back to entry points.
//! Both carry a visited set keyed by function id, so cyclic graphs terminate
//! and every function is expanded at most once per traversal.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use provenance_core::tracing::metrics;
use provenance_core::types::collections::{FxHashMap, FxHashSet};
use provenance_core::{CallGraphError, FunctionId, FunctionNode};
use tracing::{debug, warn};

use super::types::*;
use crate::graph::{innermost_function, CallGraphSource};
use crate::sensitivity::{default_classifier, SensitivityClassifier};

/// Field name recorded for sensitive accesses that name no fields.
pub const WHOLE_TABLE: &str = "*";

/// Backward-search bookkeeping: id -> (node, next hop toward the start).
pub(crate) type PathLinks = FxHashMap<FunctionId, (CallPathNode, Option<FunctionId>)>;

/// Reachability Analysis Engine
pub struct ReachabilityEngine<'a> {
    source: &'a dyn CallGraphSource,
    classifier: &'a dyn SensitivityClassifier,
}

impl<'a> ReachabilityEngine<'a> {
    /// Engine using the built-in keyword classifier.
    pub fn new(source: &'a dyn CallGraphSource) -> Self {
        Self {
            source,
            classifier: default_classifier(),
        }
    }

    pub fn with_classifier(mut self, classifier: &'a dyn SensitivityClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn source(&self) -> &'a dyn CallGraphSource {
        self.source
    }

    pub fn classifier(&self) -> &'a dyn SensitivityClassifier {
        self.classifier
    }

    /// All data reachable from the innermost function containing `file:line`.
    pub fn reachable_data_at(
        &self,
        file: &str,
        line: u32,
        options: &ReachabilityOptions,
    ) -> ReachabilityResult {
        let location = CodeLocation {
            file: file.to_string(),
            line,
            function_id: None,
        };
        if let Err(e) = self.ensure_built() {
            warn!(file, line, error = %e, "reachability query without a graph");
            return ReachabilityResult::without_graph(location, &e);
        }
        let functions = self.source.functions_in_file(file);
        match innermost_function(&functions, line) {
            Some(func) => self.forward(&func.id, options),
            None => ReachabilityResult::empty(location),
        }
    }

    /// All data reachable from a function.
    pub fn reachable_data_from(
        &self,
        function_id: &str,
        options: &ReachabilityOptions,
    ) -> ReachabilityResult {
        if let Err(e) = self.ensure_built() {
            warn!(function_id, error = %e, "reachability query without a graph");
            let location = CodeLocation {
                function_id: Some(function_id.to_string()),
                ..Default::default()
            };
            return ReachabilityResult::without_graph(location, &e);
        }
        self.forward(function_id, options)
    }

    /// `GraphNotBuilt` until the source holds a graph.
    pub fn ensure_built(&self) -> Result<(), CallGraphError> {
        if self.source.is_built() {
            Ok(())
        } else {
            Err(CallGraphError::GraphNotBuilt {
                path: self.source.location(),
            })
        }
    }

    /// Forward BFS without the built check; callers have done it once.
    pub(crate) fn forward(&self, function_id: &str, options: &ReachabilityOptions) -> ReachabilityResult {
        let Some(origin) = self.source.function(function_id) else {
            debug!(
                error = %CallGraphError::FunctionNotFound { id: function_id.to_string() },
                "forward reachability from an unknown function"
            );
            return ReachabilityResult::empty(CodeLocation {
                function_id: Some(function_id.to_string()),
                ..Default::default()
            });
        };
        let location = CodeLocation {
            file: origin.file.clone(),
            line: origin.start_line,
            function_id: Some(origin.id.clone()),
        };

        let max_depth = options.max_depth.unwrap_or(u32::MAX);
        let mut visited: FxHashSet<FunctionId> = FxHashSet::default();
        visited.insert(origin.id.clone());

        // BFS queue: (function, path to its caller, depth)
        let mut queue: VecDeque<(FunctionNode, Vec<CallPathNode>, u32)> = VecDeque::new();
        queue.push_back((origin, Vec::new(), 0));

        let mut reachable_access = Vec::new();
        let mut traversed = 0u32;
        let mut deepest = 0u32;
        let mut unresolved = 0u32;

        while let Some((func, mut path, depth)) = queue.pop_front() {
            traversed += 1;
            deepest = deepest.max(depth);
            unresolved += func.unresolved_call_count() as u32;
            path.push(CallPathNode::from_function(&func));

            for access in &func.data_access {
                if !options.tables.is_empty() && !options.tables.contains(&access.table) {
                    continue;
                }
                reachable_access.push(ReachableDataAccess {
                    function_id: func.id.clone(),
                    file: func.file.clone(),
                    access: access.clone(),
                    path: path.clone(),
                    depth,
                });
            }

            if depth >= max_depth {
                continue;
            }
            for callee_id in func.resolved_callees() {
                if !visited.insert(callee_id.to_string()) {
                    continue;
                }
                // Dangling ids point at shards that no longer exist.
                if let Some(callee) = self.source.function(callee_id) {
                    queue.push_back((callee, path.clone(), depth + 1));
                }
            }
        }

        debug!(
            origin = %location.function_id.as_deref().unwrap_or_default(),
            { metrics::FUNCTIONS_TRAVERSED } = traversed,
            accesses = reachable_access.len(),
            "forward reachability done"
        );
        self.build_result(location, reachable_access, options.sensitive_only, traversed, deepest, unresolved)
    }

    /// Paths from `file:line` to accesses of `table` (and `field`, if given).
    pub fn call_paths_to(
        &self,
        file: &str,
        line: u32,
        table: &str,
        field: Option<&str>,
    ) -> Vec<Vec<CallPathNode>> {
        let options = ReachabilityOptions {
            tables: vec![table.to_string()],
            ..Default::default()
        };
        self.reachable_data_at(file, line, &options)
            .reachable_access
            .into_iter()
            .filter(|a| a.access.matches(table, field))
            .map(|a| a.path)
            .collect()
    }

    /// Inverse query: "Who can reach this data?"
    ///
    /// Each branch stops at the first entry point it meets. Every entry point
    /// keeps its shortest path; ties go to the accessor with the smaller id.
    pub fn code_paths_to_data(&self, options: &InverseReachabilityOptions) -> InverseReachabilityResult {
        let target = InverseTarget {
            table: options.table.clone(),
            field: options.field.clone(),
        };
        if let Err(e) = self.ensure_built() {
            warn!(table = %options.table, error = %e, "inverse query without a graph");
            return InverseReachabilityResult {
                target,
                graph_missing: Some(e.to_string()),
                ..Default::default()
            };
        }

        let field = options.field.as_deref();
        let max_depth = options.max_depth.unwrap_or(u32::MAX);
        let accessors = self.source.functions_accessing(&options.table, field);

        let mut best: BTreeMap<FunctionId, InverseAccessPath> = BTreeMap::new();
        let mut traversed: FxHashSet<FunctionId> = FxHashSet::default();

        for accessor in &accessors {
            let Some(access_point) = accessor
                .data_access
                .iter()
                .find(|a| a.matches(&options.table, field))
            else {
                continue;
            };

            for path in self.paths_to_entry_points(accessor, max_depth, &mut traversed) {
                let Some(entry) = path.first().map(|n| n.function_id.clone()) else {
                    continue;
                };
                let shorter = best
                    .get(&entry)
                    .map_or(true, |existing| path.len() < existing.path.len());
                if shorter {
                    best.insert(
                        entry.clone(),
                        InverseAccessPath {
                            entry_point: entry,
                            path,
                            accessor_id: accessor.id.clone(),
                            access_point: access_point.clone(),
                        },
                    );
                }
            }
        }

        debug!(
            table = %options.table,
            accessors = accessors.len(),
            entry_points = best.len(),
            { metrics::FUNCTIONS_TRAVERSED } = traversed.len(),
            "inverse reachability done"
        );
        InverseReachabilityResult {
            target,
            total_accessors: accessors.len() as u32,
            entry_points: best.keys().cloned().collect(),
            access_paths: best.into_values().collect(),
            functions_traversed: traversed.len() as u32,
            graph_missing: None,
        }
    }

    /// Backward BFS from one accessor. Returns one path per entry point
    /// reached, entry point first.
    fn paths_to_entry_points(
        &self,
        accessor: &FunctionNode,
        max_depth: u32,
        traversed: &mut FxHashSet<FunctionId>,
    ) -> Vec<Vec<CallPathNode>> {
        let mut nodes = PathLinks::default();
        nodes.insert(accessor.id.clone(), (CallPathNode::from_function(accessor), None));

        let mut queue: VecDeque<(FunctionNode, u32)> = VecDeque::new();
        queue.push_back((accessor.clone(), 0));
        let mut paths = Vec::new();

        while let Some((func, depth)) = queue.pop_front() {
            traversed.insert(func.id.clone());
            if func.is_entry_point {
                paths.push(unwind(&nodes, &func.id));
                continue;
            }
            if depth >= max_depth {
                continue;
            }
            for caller in &func.called_by {
                if nodes.contains_key(&caller.caller_id) {
                    continue;
                }
                let Some(caller_fn) = self.source.function(&caller.caller_id) else {
                    continue;
                };
                nodes.insert(
                    caller.caller_id.clone(),
                    (CallPathNode::from_function(&caller_fn), Some(func.id.clone())),
                );
                queue.push_back((caller_fn, depth + 1));
            }
        }
        paths
    }

    fn build_result(
        &self,
        origin: CodeLocation,
        reachable_access: Vec<ReachableDataAccess>,
        sensitive_only: bool,
        functions_traversed: u32,
        max_depth_reached: u32,
        unresolved_calls: u32,
    ) -> ReachabilityResult {
        let reachable_access: Vec<ReachableDataAccess> = if sensitive_only {
            reachable_access
                .into_iter()
                .filter(|a| self.classifier.classify_access(&a.access).is_sensitive())
                .collect()
        } else {
            reachable_access
        };

        let tables: Vec<String> = reachable_access
            .iter()
            .map(|a| a.access.table.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut sensitive: BTreeMap<(String, String), SensitiveFieldAccess> = BTreeMap::new();
        for access in &reachable_access {
            let table = &access.access.table;
            let classified: Vec<(String, _)> = if access.access.fields.is_empty() {
                vec![(WHOLE_TABLE.to_string(), self.classifier.classify(table))]
            } else {
                access
                    .access
                    .fields
                    .iter()
                    .map(|f| (f.clone(), self.classifier.classify_field(table, f)))
                    .collect()
            };

            for (field, sensitivity) in classified {
                if !sensitivity.is_sensitive() {
                    continue;
                }
                let entry = sensitive
                    .entry((table.clone(), field.clone()))
                    .or_insert_with(|| SensitiveFieldAccess {
                        field: SensitiveField {
                            table: table.clone(),
                            field,
                            sensitivity,
                        },
                        paths: Vec::new(),
                        access_count: 0,
                    });
                if !entry.paths.contains(&access.path) {
                    entry.paths.push(access.path.clone());
                }
                entry.access_count += 1;
            }
        }

        ReachabilityResult {
            origin,
            tables,
            sensitive_fields: sensitive.into_values().collect(),
            reachable_access,
            functions_traversed,
            max_depth_reached,
            unresolved_calls,
            graph_missing: None,
        }
    }
}

/// Follow next-hop links from `start` back to where the search began.
pub(crate) fn unwind(nodes: &PathLinks, start: &str) -> Vec<CallPathNode> {
    let mut path = Vec::new();
    let mut current = Some(start.to_string());
    while let Some(id) = current {
        match nodes.get(&id) {
            Some((node, next)) => {
                path.push(node.clone());
                current = next.clone();
            }
            None => break,
        }
    }
    path
}
