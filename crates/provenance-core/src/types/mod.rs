//! Shared types.

pub mod call_graph;
pub mod collections;
