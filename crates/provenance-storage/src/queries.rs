//! Point lookups and store-level statistics.

use provenance_core::{DataAccessRef, FunctionId, FunctionNode, StorageError};
use serde::{Deserialize, Serialize};

use crate::store::ShardStore;

/// Aggregate counts over all shards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub files: usize,
    pub functions: usize,
    pub calls: usize,
    pub resolved_calls: usize,
    pub entry_points: usize,
    pub data_accessors: usize,
}

/// One data access together with the function performing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableAccess {
    pub function_id: FunctionId,
    pub function_name: String,
    pub file: String,
    pub access: DataAccessRef,
}

impl ShardStore {
    /// Whether any shard has been persisted.
    pub fn is_available(&self) -> bool {
        self.list_files().map(|files| !files.is_empty()).unwrap_or(false)
    }

    /// Counts gathered from one sweep over the shards.
    pub fn stats(&self) -> Result<StoreStats, StorageError> {
        let mut stats = StoreStats::default();
        stats.files = self.for_each_shard(|shard| {
            stats.functions += shard.functions.len();
            stats.calls += shard.call_count();
            stats.resolved_calls += shard.resolved_call_count();
            stats.entry_points += shard.functions.iter().filter(|f| f.is_entry_point).count();
            stats.data_accessors += shard.functions.iter().filter(|f| f.is_data_accessor).count();
        })?;
        Ok(stats)
    }

    /// Look up one function by id. Only its own shard is read.
    pub fn get_function(&self, id: &str) -> Option<FunctionNode> {
        let file = FunctionNode::file_from_id(id)?;
        self.get_file_shard_by_path(file)?.function(id).cloned()
    }

    /// Every function with at least one access to `table`, sorted by id.
    pub fn get_functions_by_table(&self, table: &str) -> Result<Vec<FunctionNode>, StorageError> {
        let mut found = Vec::new();
        self.for_each_shard(|shard| {
            found.extend(
                shard
                    .functions
                    .iter()
                    .filter(|f| f.accesses(table, None))
                    .cloned(),
            );
        })?;
        found.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(found)
    }

    /// Every individual access to `table`, ordered by function id then line.
    pub fn get_data_access_by_table(&self, table: &str) -> Result<Vec<TableAccess>, StorageError> {
        let mut found = Vec::new();
        self.for_each_shard(|shard| {
            for func in &shard.functions {
                for access in func.data_access.iter().filter(|a| a.table == table) {
                    found.push(TableAccess {
                        function_id: func.id.clone(),
                        function_name: func.qualified_name.clone(),
                        file: func.file.clone(),
                        access: access.clone(),
                    });
                }
            }
        })?;
        found.sort_by(|a, b| {
            a.function_id
                .cmp(&b.function_id)
                .then(a.access.line.cmp(&b.access.line))
        });
        Ok(found)
    }
}
