//! Per-file shard construction and the streaming build pipeline.

use std::path::Path;
use std::time::Instant;

use once_cell::sync::Lazy;
use provenance_core::config::BuildConfig;
use provenance_core::tracing::metrics;
use provenance_core::types::collections::FxHashSet;
use provenance_core::{
    CallEdge, CallGraphError, Cancellable, DataAccessRef, ErrorCode, ExtractionError, FileShard,
    FunctionNode,
};
use provenance_storage::ShardStore;
use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::extractor::{
    CallGraphExtractor, ExtractedCall, ExtractedDataAccess, ExtractedFunction, FileExtractionResult,
};
use super::resolver::{CallResolver, ResolutionDiagnostics};
use super::table_validator::is_valid_table_name;
use super::writer::{write_shards, WRITE_QUEUE_DEPTH};
use crate::graph::innermost_position;

/// Framework route markers: `@app.get(...)`, `@router.post`, `@GetMapping`, `[HttpPost]`, ...
static ROUTE_DECORATOR: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r"(?i)^[@\[]?\s*(?:\w+\.)?(?:route|get|post|put|patch|delete|api_view|(?:get|post|put|patch|delete|request)_?mapping|http(?:get|post|put|patch|delete))\b",
    )
    .ok()
});

/// Receivers that refer to the enclosing object rather than a type.
const SELF_RECEIVERS: &[&str] = &["self", "this", "cls", "super", "$this"];

fn is_route_handler(decorators: &[String]) -> bool {
    let Some(re) = ROUTE_DECORATOR.as_ref() else {
        return false;
    };
    decorators.iter().any(|d| re.is_match(d.trim()))
}

fn qualified_name(func: &ExtractedFunction, extraction: &FileExtractionResult) -> String {
    if let Some(q) = func.qualified_name.as_ref().filter(|q| !q.is_empty()) {
        return q.clone();
    }
    let class = func.class_name.clone().or_else(|| {
        extraction
            .classes
            .iter()
            .filter(|c| c.start_line <= func.start_line && func.start_line <= c.end_line)
            .min_by_key(|c| c.end_line.saturating_sub(c.start_line))
            .map(|c| c.name.clone())
    });
    match class {
        Some(class) => format!("{}.{}", class, func.name),
        None => func.name.clone(),
    }
}

fn call_target(call: &ExtractedCall) -> String {
    match call.receiver.as_deref() {
        Some(receiver) if !receiver.is_empty() && !SELF_RECEIVERS.contains(&receiver) => {
            format!("{}.{}", receiver, call.callee_name)
        }
        _ => call.callee_name.clone(),
    }
}

/// Turn one file's extraction into its shard.
///
/// Functions get deterministic ids; calls and data access attach to the
/// innermost function whose line range contains them. Anything outside every
/// function (module-level code) and any access with a noise table name is dropped.
pub fn process_file(
    file: &str,
    extraction: &FileExtractionResult,
    data_access: &[ExtractedDataAccess],
) -> FileShard {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut functions: Vec<FunctionNode> = Vec::with_capacity(extraction.functions.len());

    for func in &extraction.functions {
        let id = FunctionNode::make_id(file, &func.name, func.start_line);
        if !seen.insert(id.clone()) {
            debug!(file, id = %id, "duplicate function id, keeping first");
            continue;
        }
        functions.push(FunctionNode {
            id,
            name: func.name.clone(),
            qualified_name: qualified_name(func, extraction),
            file: file.to_string(),
            start_line: func.start_line,
            end_line: func.end_line.max(func.start_line),
            is_entry_point: func.is_exported || is_route_handler(&func.decorators),
            is_data_accessor: false,
            calls: Vec::new(),
            called_by: Vec::new(),
            data_access: Vec::new(),
        });
    }
    functions.sort_by(|a, b| a.start_line.cmp(&b.start_line).then_with(|| a.name.cmp(&b.name)));

    let mut orphan_calls = 0usize;
    for call in &extraction.calls {
        match innermost_position(&functions, call.line) {
            Some(i) => functions[i].calls.push(CallEdge::unresolved(call_target(call), call.line)),
            None => orphan_calls += 1,
        }
    }

    let mut rejected_tables = 0usize;
    for access in data_access {
        if !is_valid_table_name(&access.table) {
            rejected_tables += 1;
            continue;
        }
        if let Some(i) = innermost_position(&functions, access.line) {
            functions[i].data_access.push(DataAccessRef {
                table: access.table.trim().to_string(),
                operation: access.operation,
                line: access.line,
                fields: access.fields.clone(),
            });
        }
    }

    for func in &mut functions {
        func.calls.sort_by_key(|c| c.line);
        func.data_access.sort_by_key(|a| a.line);
        func.is_data_accessor = !func.data_access.is_empty();
    }

    if orphan_calls > 0 || rejected_tables > 0 {
        debug!(file, orphan_calls, rejected_tables, "dropped extraction items");
    }

    FileShard {
        file: file.to_string(),
        functions,
    }
}

/// Build result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildResult {
    /// Total files processed
    pub files_processed: usize,
    /// Total functions extracted
    pub total_functions: usize,
    /// Total call sites found
    pub total_calls: usize,
    /// Resolved call sites
    pub resolved_calls: usize,
    /// Resolution rate (0.0-1.0)
    pub resolution_rate: f64,
    /// Entry points found
    pub entry_points: usize,
    /// Data accessors found
    pub data_accessors: usize,
    /// Non-fatal errors, `[CODE] message`
    pub errors: Vec<String>,
    /// Build duration in milliseconds
    pub duration_ms: u64,
    pub resolution: ResolutionDiagnostics,
}

/// Full rebuild: extraction results in, resolved shards + index out.
pub struct StreamingBuilder<'a> {
    store: &'a ShardStore,
    config: BuildConfig,
    cancel: Option<&'a dyn Cancellable>,
}

impl<'a> StreamingBuilder<'a> {
    pub fn new(store: &'a ShardStore, config: BuildConfig) -> Self {
        Self {
            store,
            config,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, token: &'a dyn Cancellable) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|c| c.is_cancelled())
    }

    /// Run `op` on the configured pool, or rayon's global one.
    fn run_parallel<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match self.config.threads {
            Some(n) if n > 0 => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => pool.install(op),
                Err(e) => {
                    warn!(error = %e, "falling back to the global rayon pool");
                    op()
                }
            },
            _ => op(),
        }
    }

    /// Build from already-extracted files.
    pub fn build(&self, inputs: Vec<FileExtractionResult>) -> Result<BuildResult, CallGraphError> {
        self.build_inner(inputs, Vec::new(), Instant::now())
    }

    /// Read and extract `files` (relative to `root`) with the first extractor
    /// that handles each, then build. Unreadable or unsupported files are
    /// reported in `errors` and skipped.
    pub fn build_from_files(
        &self,
        root: &Path,
        files: &[String],
        extractors: &[Box<dyn CallGraphExtractor>],
    ) -> Result<BuildResult, CallGraphError> {
        let started = Instant::now();
        let extracted: Vec<Result<FileExtractionResult, ExtractionError>> = self.run_parallel(|| {
            files
                .par_iter()
                .map(|file| extract_file(root, file, extractors))
                .collect()
        });

        let mut inputs = Vec::with_capacity(extracted.len());
        let mut errors = Vec::new();
        for outcome in extracted {
            match outcome {
                Ok(result) => inputs.push(result),
                Err(e) => {
                    warn!(file = %e.file(), error = %e, "extraction failed, skipping file");
                    errors.push(e.coded_string());
                }
            }
        }
        self.build_inner(inputs, errors, started)
    }

    fn build_inner(
        &self,
        inputs: Vec<FileExtractionResult>,
        mut errors: Vec<String>,
        started: Instant,
    ) -> Result<BuildResult, CallGraphError> {
        let cleared = self.store.clear()?;
        debug!(cleared, "previous shards removed");

        // Phase 0: per-file shards, built in parallel, written by one thread.
        let store = self.store;
        let (tx, rx) = crossbeam_channel::bounded::<FileShard>(WRITE_QUEUE_DEPTH);
        let (report, warnings) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || write_shards(store, rx));
            let warnings: Vec<String> = self.run_parallel(|| {
                inputs
                    .par_iter()
                    .map_with(tx, |tx, input| {
                        let shard_started = Instant::now();
                        let shard = process_file(&input.file, input, &input.data_access_points);
                        debug!(
                            file = %input.file,
                            functions = shard.functions.len(),
                            { metrics::SHARD_BUILD_TIME } = shard_started.elapsed().as_millis() as u64,
                            "shard built"
                        );
                        if tx.send(shard).is_err() {
                            warn!(file = %input.file, "shard writer gone, dropping shard");
                        }
                        input
                            .errors
                            .iter()
                            .map(|message| {
                                ExtractionError::Failed {
                                    file: input.file.clone(),
                                    message: message.clone(),
                                }
                                .coded_string()
                            })
                            .collect::<Vec<_>>()
                    })
                    .flatten()
                    .collect()
            });
            (writer.join(), warnings)
        });
        let report = report.map_err(|_| CallGraphError::WriterFailed {
            message: "shard writer thread panicked".to_string(),
        })?;
        errors.extend(warnings);
        errors.extend(report.errors.iter().map(|e| e.coded_string()));

        if self.is_cancelled() {
            warn!("build cancelled before resolution");
            return Err(CallGraphError::Cancelled {
                completed_batches: 0,
            });
        }

        // Phases 1-3: name index, batched resolution, callers.
        let mut resolver =
            CallResolver::new(self.store).with_batch_size(self.config.effective_batch_size());
        if let Some(token) = self.cancel {
            resolver = resolver.with_cancellation(token);
        }
        let resolution = resolver.resolve()?;
        errors.extend(resolution.error_strings());

        // Derived documents.
        let (index, _) = self.store.build_derived()?;

        let summary = &index.summary;
        let result = BuildResult {
            files_processed: report.written,
            total_functions: summary.total_functions,
            total_calls: summary.total_calls,
            resolved_calls: summary.resolved_call_sites,
            resolution_rate: summary.resolution_rate,
            entry_points: summary.entry_points,
            data_accessors: summary.data_accessors,
            errors,
            duration_ms: started.elapsed().as_millis() as u64,
            resolution: resolution.data,
        };

        info!(
            files = result.files_processed,
            functions = result.total_functions,
            resolved = result.resolved_calls,
            errors = result.errors.len(),
            duration_ms = result.duration_ms,
            "call graph build complete"
        );
        Ok(result)
    }
}

fn extract_file(
    root: &Path,
    file: &str,
    extractors: &[Box<dyn CallGraphExtractor>],
) -> Result<FileExtractionResult, ExtractionError> {
    let extractor = extractors
        .iter()
        .find(|e| e.can_handle(file))
        .ok_or_else(|| ExtractionError::UnsupportedFile {
            file: file.to_string(),
        })?;
    let source = std::fs::read_to_string(root.join(file)).map_err(|e| ExtractionError::Unreadable {
        file: file.to_string(),
        message: e.to_string(),
    })?;
    let mut result = extractor.extract(&source, file)?;
    result.file = file.to_string();
    if result.language.is_empty() {
        result.language = extractor.language().to_string();
    }
    Ok(result)
}
