//! Query-side configuration.

use serde::{Deserialize, Serialize};

/// Configuration for reachability and impact queries.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Traversal depth bound. Default: unbounded.
    pub max_depth: Option<u32>,
    /// Length of the index's top entry point / data accessor lists. Default: 20.
    pub top_n: Option<usize>,
}

impl AnalysisConfig {
    pub const DEFAULT_TOP_N: usize = 20;

    pub fn effective_top_n(&self) -> usize {
        self.top_n.unwrap_or(Self::DEFAULT_TOP_N)
    }
}
