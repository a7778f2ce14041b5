//! Read-only views of a resolved call graph.
//!
//! Queries are written against [`CallGraphSource`]. The store-backed
//! implementation reads shards on demand through the store's bounded cache;
//! [`CallGraph`] holds everything in memory for small graphs and tests.

mod memory;
mod source;

pub use memory::CallGraph;
pub use source::CallGraphSource;

use provenance_core::FunctionNode;

/// Index of the innermost function whose line range contains `line`.
/// Ties on span go to the first in slice order.
pub fn innermost_position(functions: &[FunctionNode], line: u32) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut best_size = u32::MAX;
    for (i, func) in functions.iter().enumerate() {
        if func.contains_line(line) && func.span() < best_size {
            best = Some(i);
            best_size = func.span();
        }
    }
    best
}

pub fn innermost_function(functions: &[FunctionNode], line: u32) -> Option<&FunctionNode> {
    innermost_position(functions, line).map(|i| &functions[i])
}
