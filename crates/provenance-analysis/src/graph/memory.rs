//! In-memory call graph.

use provenance_core::types::collections::FxHashMap;
use provenance_core::{FileShard, FunctionId, FunctionNode};

use super::source::CallGraphSource;

/// All functions resident, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    functions: FxHashMap<FunctionId, FunctionNode>,
    by_file: FxHashMap<String, Vec<FunctionId>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_shards<I: IntoIterator<Item = FileShard>>(shards: I) -> Self {
        let mut graph = Self::new();
        for shard in shards {
            for func in shard.functions {
                graph.insert(func);
            }
        }
        graph
    }

    pub fn insert(&mut self, func: FunctionNode) {
        let ids = self.by_file.entry(func.file.clone()).or_default();
        if !ids.contains(&func.id) {
            ids.push(func.id.clone());
        }
        self.functions.insert(func.id.clone(), func);
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

fn sorted_by_id(mut found: Vec<FunctionNode>) -> Vec<FunctionNode> {
    found.sort_by(|a, b| a.id.cmp(&b.id));
    found
}

impl CallGraphSource for CallGraph {
    fn function(&self, id: &str) -> Option<FunctionNode> {
        self.functions.get(id).cloned()
    }

    fn functions_in_file(&self, file: &str) -> Vec<FunctionNode> {
        self.by_file
            .get(file)
            .map(|ids| ids.iter().filter_map(|id| self.functions.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    fn functions_named(&self, name: &str) -> Vec<FunctionNode> {
        sorted_by_id(
            self.functions
                .values()
                .filter(|f| f.name == name || f.qualified_name == name)
                .cloned()
                .collect(),
        )
    }

    fn functions_accessing(&self, table: &str, field: Option<&str>) -> Vec<FunctionNode> {
        sorted_by_id(
            self.functions
                .values()
                .filter(|f| f.accesses(table, field))
                .cloned()
                .collect(),
        )
    }

    fn is_built(&self) -> bool {
        !self.functions.is_empty()
    }

    fn location(&self) -> String {
        "in-memory graph".to_string()
    }
}
