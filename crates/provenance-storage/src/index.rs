//! Derived documents: the summary index and the entry-points detail.
//!
//! Both are pure functions of the shard set. A build sweeps every shard once
//! (in cache-bounded batches), keeps only ids, callee ids and table names
//! resident, and rewrites its documents from scratch. [`ShardStore::build_derived`]
//! writes both documents from a single sweep.

use std::collections::{BTreeSet, VecDeque};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use provenance_core::tracing::metrics;
use provenance_core::types::collections::{FxHashMap, FxHashSet};
use provenance_core::{
    CallGraphIndex, CallGraphSummary, DataAccessorSummary, DataOperation, EntryPointDetail,
    EntryPointSummary, EntryPointsData, FileIndexEntry, FileShard, FunctionId, StorageError,
    FORMAT_VERSION,
};
use tracing::info;

use crate::store::{ShardStore, ENTRY_POINTS_FILE, INDEX_FILE};

/// Forward adjacency for one function.
#[derive(Default)]
struct SweepNode {
    callees: Vec<FunctionId>,
    tables: Vec<String>,
}

struct EntryMeta {
    id: FunctionId,
    name: String,
    qualified_name: String,
    file: String,
    line: u32,
}

/// Everything one sweep over the shards collects.
#[derive(Default)]
struct GraphSweep {
    nodes: FxHashMap<FunctionId, SweepNode>,
    entry_points: Vec<EntryMeta>,
    accessors: Vec<DataAccessorSummary>,
    files: Vec<FileIndexEntry>,
    total_functions: usize,
    total_calls: usize,
    resolved_calls: usize,
}

impl GraphSweep {
    fn add_shard(&mut self, shard: &FileShard) {
        let mut entry_point_count = 0;
        let mut data_accessor_count = 0;

        for func in &shard.functions {
            self.total_functions += 1;
            self.total_calls += func.calls.len();
            self.resolved_calls += func.calls.iter().filter(|c| c.resolved).count();

            let tables: BTreeSet<&str> = func.data_access.iter().map(|a| a.table.as_str()).collect();
            self.nodes.insert(
                func.id.clone(),
                SweepNode {
                    callees: func.resolved_callees().map(str::to_string).collect(),
                    tables: tables.iter().map(|t| t.to_string()).collect(),
                },
            );

            if func.is_entry_point {
                entry_point_count += 1;
                self.entry_points.push(EntryMeta {
                    id: func.id.clone(),
                    name: func.name.clone(),
                    qualified_name: func.qualified_name.clone(),
                    file: func.file.clone(),
                    line: func.start_line,
                });
            }

            if func.is_data_accessor {
                data_accessor_count += 1;
                let operations: BTreeSet<DataOperation> =
                    func.data_access.iter().map(|a| a.operation).collect();
                self.accessors.push(DataAccessorSummary {
                    id: func.id.clone(),
                    name: func.name.clone(),
                    file: func.file.clone(),
                    line: func.start_line,
                    tables: tables.iter().map(|t| t.to_string()).collect(),
                    operations: operations.into_iter().collect(),
                });
            }
        }

        self.files.push(FileIndexEntry {
            file: shard.file.clone(),
            file_hash: shard.hash(),
            function_count: shard.functions.len(),
            entry_point_count,
            data_accessor_count,
        });
    }

    /// Forward BFS from one entry point over resolved edges.
    /// Returns (reachable function ids excluding the start, tables, max depth).
    fn reach(&self, start: &str) -> (Vec<FunctionId>, Vec<String>, u32) {
        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut tables: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<(&str, u32)> = VecDeque::new();
        let mut max_depth = 0;

        visited.insert(start);
        queue.push_back((start, 0));

        while let Some((id, depth)) = queue.pop_front() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            max_depth = max_depth.max(depth);
            tables.extend(node.tables.iter().map(String::as_str));
            for callee in &node.callees {
                if visited.insert(callee.as_str()) {
                    queue.push_back((callee.as_str(), depth + 1));
                }
            }
        }

        let mut functions: Vec<FunctionId> = visited
            .into_iter()
            .filter(|id| *id != start && self.nodes.contains_key(*id))
            .map(str::to_string)
            .collect();
        functions.sort_unstable();
        (
            functions,
            tables.into_iter().map(str::to_string).collect(),
            max_depth,
        )
    }

    fn entry_point_details(&self) -> Vec<EntryPointDetail> {
        let mut details: Vec<EntryPointDetail> = self
            .entry_points
            .iter()
            .map(|ep| {
                let (reachable_functions, reachable_tables, max_depth) = self.reach(&ep.id);
                EntryPointDetail {
                    id: ep.id.clone(),
                    name: ep.name.clone(),
                    qualified_name: ep.qualified_name.clone(),
                    file: ep.file.clone(),
                    line: ep.line,
                    reachable_functions,
                    reachable_tables,
                    max_depth,
                }
            })
            .collect();
        details.sort_by(|a, b| a.id.cmp(&b.id));
        details
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl ShardStore {
    fn sweep(&self) -> Result<GraphSweep, StorageError> {
        let mut sweep = GraphSweep::default();
        self.for_each_shard(|shard| sweep.add_shard(shard))?;
        sweep.files.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(sweep)
    }

    /// Regenerate `index.json` and `entry-points.json` from one sweep.
    pub fn build_derived(&self) -> Result<(CallGraphIndex, EntryPointsData), StorageError> {
        let started = Instant::now();
        let sweep = self.sweep()?;
        let details = sweep.entry_point_details();
        let index = self.write_index(sweep, &details, started)?;
        let entry_points = self.write_entry_points(details)?;
        Ok((index, entry_points))
    }

    /// Regenerate `index.json` from the current shard set.
    pub fn build_index(&self) -> Result<CallGraphIndex, StorageError> {
        let started = Instant::now();
        let sweep = self.sweep()?;
        let details = sweep.entry_point_details();
        self.write_index(sweep, &details, started)
    }

    /// Regenerate `entry-points.json` from the current shard set.
    pub fn build_entry_points(&self) -> Result<EntryPointsData, StorageError> {
        let details = self.sweep()?.entry_point_details();
        self.write_entry_points(details)
    }

    fn write_index(
        &self,
        sweep: GraphSweep,
        details: &[EntryPointDetail],
        started: Instant,
    ) -> Result<CallGraphIndex, StorageError> {
        let avg_depth = if details.is_empty() {
            0.0
        } else {
            details.iter().map(|d| d.max_depth as f64).sum::<f64>() / details.len() as f64
        };

        let mut top_entry_points: Vec<EntryPointSummary> = details
            .iter()
            .map(|d| EntryPointSummary {
                id: d.id.clone(),
                name: d.name.clone(),
                file: d.file.clone(),
                line: d.line,
                reachable_functions: d.reachable_functions.len(),
                reachable_tables: d.reachable_tables.len(),
            })
            .collect();
        top_entry_points.sort_by(|a, b| {
            b.reachable_tables
                .cmp(&a.reachable_tables)
                .then(b.reachable_functions.cmp(&a.reachable_functions))
                .then(a.id.cmp(&b.id))
        });
        top_entry_points.truncate(self.top_n());

        let mut top_data_accessors = sweep.accessors.clone();
        top_data_accessors.sort_by(|a, b| b.tables.len().cmp(&a.tables.len()).then(a.id.cmp(&b.id)));
        top_data_accessors.truncate(self.top_n());

        let unresolved = sweep.total_calls - sweep.resolved_calls;
        let summary = CallGraphSummary {
            total_files: sweep.files.len(),
            total_functions: sweep.total_functions,
            total_calls: sweep.total_calls,
            resolved_call_sites: sweep.resolved_calls,
            unresolved_call_sites: unresolved,
            resolution_rate: if sweep.total_calls == 0 {
                0.0
            } else {
                sweep.resolved_calls as f64 / sweep.total_calls as f64
            },
            entry_points: sweep.entry_points.len(),
            data_accessors: sweep.accessors.len(),
            avg_depth,
        };

        let index = CallGraphIndex {
            version: FORMAT_VERSION.to_string(),
            generated_at: now_secs(),
            summary,
            files: sweep.files,
            top_entry_points,
            top_data_accessors,
        };
        self.write_document(INDEX_FILE, &index)?;

        info!(
            files = index.summary.total_files,
            functions = index.summary.total_functions,
            { metrics::INDEX_BUILD_TIME } = started.elapsed().as_millis() as u64,
            "call graph index built"
        );
        Ok(index)
    }

    fn write_entry_points(&self, details: Vec<EntryPointDetail>) -> Result<EntryPointsData, StorageError> {
        let data = EntryPointsData {
            version: FORMAT_VERSION.to_string(),
            generated_at: now_secs(),
            entry_points: details,
        };
        self.write_document(ENTRY_POINTS_FILE, &data)?;
        info!(entry_points = data.entry_points.len(), "entry points built");
        Ok(data)
    }

    /// The persisted index, if present and of the current format version.
    pub fn get_index(&self) -> Option<CallGraphIndex> {
        self.read_document::<CallGraphIndex>(INDEX_FILE)
            .filter(|index| index.version == FORMAT_VERSION)
    }

    /// The persisted entry-points document, if present and current.
    pub fn get_entry_points(&self) -> Option<EntryPointsData> {
        self.read_document::<EntryPointsData>(ENTRY_POINTS_FILE)
            .filter(|data| data.version == FORMAT_VERSION)
    }
}
