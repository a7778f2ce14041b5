//! Resolution strategies, tried in fixed order. First match wins.
//!
//! Each strategy is a pure function of the target, its candidates (sorted by
//! `(file, start_line, id)`) and the caller's context.

use serde::{Deserialize, Serialize};

use super::name_index::Candidate;

/// Which rule resolved a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Exactly one candidate, in the caller's file. Confidence: 0.95.
    SameFileUnique,
    /// Exactly one candidate, in another file. Confidence: 0.80.
    GlobalUnique,
    /// Several candidates, at least one in the caller's file. Confidence: 0.70.
    SameFileAmbiguous,
    /// Several candidates, none in the caller's file; the first by file path. Confidence: 0.40.
    CrossFileAmbiguous,
}

impl Resolution {
    pub fn confidence(&self) -> f64 {
        match self {
            Self::SameFileUnique => 0.95,
            Self::GlobalUnique => 0.80,
            Self::SameFileAmbiguous => 0.70,
            Self::CrossFileAmbiguous => 0.40,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SameFileUnique => "same_file_unique",
            Self::GlobalUnique => "global_unique",
            Self::SameFileAmbiguous => "same_file_ambiguous",
            Self::CrossFileAmbiguous => "cross_file_ambiguous",
        }
    }
}

/// What a strategy may know about the call site.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub caller_file: &'a str,
}

type Strategy = for<'c> fn(&str, &'c [Candidate], &ResolveContext<'_>) -> Option<&'c Candidate>;

const STRATEGIES: &[(Resolution, Strategy)] = &[
    (Resolution::SameFileUnique, same_file_unique),
    (Resolution::GlobalUnique, global_unique),
    (Resolution::SameFileAmbiguous, same_file_ambiguous),
    (Resolution::CrossFileAmbiguous, cross_file_ambiguous),
];

/// Resolve one call target. `None` means unresolved (confidence 0).
pub fn resolve_target<'c>(
    target: &str,
    candidates: &'c [Candidate],
    ctx: &ResolveContext<'_>,
) -> Option<(&'c Candidate, Resolution)> {
    STRATEGIES
        .iter()
        .find_map(|(resolution, strategy)| strategy(target, candidates, ctx).map(|c| (c, *resolution)))
}

fn same_file_unique<'c>(_target: &str, candidates: &'c [Candidate], ctx: &ResolveContext<'_>) -> Option<&'c Candidate> {
    match candidates {
        [only] if only.file == ctx.caller_file => Some(only),
        _ => None,
    }
}

fn global_unique<'c>(_target: &str, candidates: &'c [Candidate], _ctx: &ResolveContext<'_>) -> Option<&'c Candidate> {
    match candidates {
        [only] => Some(only),
        _ => None,
    }
}

fn same_file_ambiguous<'c>(_target: &str, candidates: &'c [Candidate], ctx: &ResolveContext<'_>) -> Option<&'c Candidate> {
    if candidates.len() < 2 {
        return None;
    }
    candidates.iter().find(|c| c.file == ctx.caller_file)
}

fn cross_file_ambiguous<'c>(_target: &str, candidates: &'c [Candidate], _ctx: &ResolveContext<'_>) -> Option<&'c Candidate> {
    if candidates.len() < 2 {
        return None;
    }
    candidates.first()
}
