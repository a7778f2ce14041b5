//! Call Graph Module
//!
//! Streaming call graph builder over the shard store.
//! Handles codebases of any size: only the name index is ever fully resident.
//!
//! Key components:
//! - `CallGraphExtractor` - seam where per-language extractors plug in
//! - `process_file` - one extraction result to one `FileShard`
//! - `CallResolver` - name index sweep, batched resolution, caller materialization
//! - `StreamingBuilder` - the whole pipeline, parallel per-file work + writer thread

mod builder;
mod callers;
mod extractor;
mod name_index;
mod resolver;
mod strategies;
mod table_validator;
mod writer;

pub use builder::{process_file, BuildResult, StreamingBuilder};
pub use callers::{apply_callers, collect_callers, CallerMap};
pub use extractor::{
    CallGraphExtractor, ExtractedCall, ExtractedClass, ExtractedDataAccess, ExtractedFunction,
    ExtractedImport, FileExtractionResult,
};
pub use name_index::{Candidate, NameIndex};
pub use resolver::{resolve_shard, CallResolver, ResolutionDiagnostics};
pub use strategies::{resolve_target, Resolution, ResolveContext};
pub use table_validator::is_valid_table_name;
