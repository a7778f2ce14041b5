//! provenance-analysis: everything built on top of the shard store.
//!
//! - `call_graph`: extraction contract, per-file builder, two-phase resolver, build pipeline
//! - `graph`: the read-only view queries run against (store-backed or in-memory)
//! - `reachability`: forward and inverse data reachability
//! - `impact`: reverse-call-graph blast radius with risk scoring
//! - `sensitivity`: pluggable field classification and regulation mapping
//! - `enrichment`: priority scoring for external security findings

pub mod call_graph;
pub mod enrichment;
pub mod graph;
pub mod impact;
pub mod reachability;
pub mod sensitivity;

pub use call_graph::{BuildResult, CallGraphExtractor, FileExtractionResult, StreamingBuilder};
pub use enrichment::EnrichmentEngine;
pub use graph::{CallGraph, CallGraphSource};
pub use impact::{ImpactAnalysisResult, ImpactAnalyzer};
pub use reachability::ReachabilityEngine;
pub use sensitivity::{KeywordClassifier, SensitivityClassifier};
