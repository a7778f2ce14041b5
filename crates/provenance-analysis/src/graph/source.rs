//! The query-side graph interface and its shard-store implementation.

use provenance_core::FunctionNode;
use provenance_storage::ShardStore;
use tracing::warn;

/// What reachability, impact and enrichment need from a graph.
///
/// Every lookup returns owned nodes: a store-backed source cannot lend out
/// references into shards it may evict at any time.
pub trait CallGraphSource {
    fn function(&self, id: &str) -> Option<FunctionNode>;

    /// Functions defined in `file`, in shard order.
    fn functions_in_file(&self, file: &str) -> Vec<FunctionNode>;

    /// Functions whose simple or qualified name equals `name`, sorted by id.
    fn functions_named(&self, name: &str) -> Vec<FunctionNode>;

    /// Functions accessing `table` (and `field`, if given), sorted by id.
    fn functions_accessing(&self, table: &str, field: Option<&str>) -> Vec<FunctionNode>;

    /// Whether a graph has been built at all.
    fn is_built(&self) -> bool;

    /// Where the graph lives, for messages.
    fn location(&self) -> String;
}

impl CallGraphSource for ShardStore {
    fn function(&self, id: &str) -> Option<FunctionNode> {
        self.get_function(id)
    }

    fn functions_in_file(&self, file: &str) -> Vec<FunctionNode> {
        self.get_file_shard_by_path(file)
            .map(|shard| shard.functions.clone())
            .unwrap_or_default()
    }

    fn functions_named(&self, name: &str) -> Vec<FunctionNode> {
        let mut found = Vec::new();
        let swept = self.for_each_shard(|shard| {
            found.extend(
                shard
                    .functions
                    .iter()
                    .filter(|f| f.name == name || f.qualified_name == name)
                    .cloned(),
            );
        });
        if let Err(e) = swept {
            warn!(name, error = %e, "name lookup incomplete");
        }
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }

    fn functions_accessing(&self, table: &str, field: Option<&str>) -> Vec<FunctionNode> {
        match self.get_functions_by_table(table) {
            Ok(functions) => functions
                .into_iter()
                .filter(|f| f.accesses(table, field))
                .collect(),
            Err(e) => {
                warn!(table, error = %e, "table lookup failed");
                Vec::new()
            }
        }
    }

    fn is_built(&self) -> bool {
        self.is_available()
    }

    fn location(&self) -> String {
        self.root().display().to_string()
    }
}
