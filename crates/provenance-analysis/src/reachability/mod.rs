//! Reachability Analysis Module
//!
//! Answers: "What data can this code ultimately access?" and the inverse,
//! "Which entry points can reach this table or field?"

mod engine;
mod types;

pub use engine::{ReachabilityEngine, WHOLE_TABLE};
pub(crate) use engine::{unwind, PathLinks};
pub use types::*;
