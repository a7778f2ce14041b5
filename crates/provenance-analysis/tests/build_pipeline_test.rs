//! End-to-end build: extraction results -> shards -> resolution -> index.

mod common;

use std::path::Path;

use common::*;
use provenance_analysis::call_graph::{CallResolver, FileExtractionResult};
use provenance_analysis::{CallGraphExtractor, StreamingBuilder};
use provenance_core::config::BuildConfig;
use provenance_core::{CallGraphError, Cancellable, CancellationToken, ExtractionError, FunctionNode};

fn edge_to<'a>(func: &'a FunctionNode, target: &str) -> &'a provenance_core::CallEdge {
    func.calls
        .iter()
        .find(|c| c.target == target)
        .unwrap_or_else(|| panic!("no call to {} in {}", target, func.id))
}

// ═══════════════════════════════════════════════════════════════════════════
// BUILD + RESOLVE
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn build_reports_counts() {
    let (_dir, store, result) = built_store();

    assert_eq!(result.files_processed, 4);
    assert_eq!(result.total_functions, 7);
    assert_eq!(result.total_calls, 5);
    assert_eq!(result.resolved_calls, 4);
    assert_eq!(result.entry_points, 2);
    assert_eq!(result.data_accessors, 2);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert!((result.resolution_rate - 0.8).abs() < 1e-9);

    assert_eq!(result.resolution.total_call_sites, 5);
    assert_eq!(result.resolution.unresolved, 1);
    assert_eq!(store.list_files().unwrap().len(), 4);
    assert!(store.get_index().is_some());
    assert!(store.get_entry_points().is_some());
}

#[test]
fn qualified_call_resolves_globally() {
    let (_dir, store, _) = built_store();
    let login = store.get_function(LOGIN_USER).unwrap();

    let edge = edge_to(&login, "AccountService.get_primary_account_id");
    assert!(edge.resolved);
    assert_eq!(edge.resolved_id.as_deref(), Some(GET_PRIMARY_ACCOUNT_ID));
    assert_eq!(edge.confidence, 0.80);

    let same_file = edge_to(&login, "_audit");
    assert_eq!(same_file.resolved_id.as_deref(), Some(AUDIT_HELPER));
    assert_eq!(same_file.confidence, 0.95);
}

#[test]
fn ambiguous_cross_file_target_resolves_at_low_confidence() {
    let (_dir, store, _) = built_store();
    let helper = store.get_function(AUDIT_HELPER).unwrap();

    let edge = edge_to(&helper, "record_event");
    assert!(edge.resolved);
    assert_eq!(edge.confidence, 0.40);
    // Lexicographically first file wins.
    assert_eq!(edge.resolved_id.as_deref(), Some(RECORD_EVENT));

    let unknown = edge_to(&helper, "print");
    assert!(!unknown.resolved);
    assert_eq!(unknown.confidence, 0.0);
    assert_eq!(unknown.resolved_id, None);
}

#[test]
fn callers_are_materialized() {
    let (_dir, store, _) = built_store();

    let callee = store.get_function(GET_PRIMARY_ACCOUNT_ID).unwrap();
    let callers: Vec<_> = callee.called_by.iter().map(|c| c.caller_id.as_str()).collect();
    assert_eq!(callers, vec![LOGIN_USER]);
    assert_eq!(callee.called_by[0].line, 15);

    let record = store.get_function(RECORD_EVENT).unwrap();
    assert_eq!(record.called_by.len(), 1);
    let legacy = store.get_function(LEGACY_RECORD_EVENT).unwrap();
    assert!(legacy.called_by.is_empty());
}

#[test]
fn entry_points_and_qualified_names() {
    let (_dir, store, _) = built_store();

    let login = store.get_function(LOGIN_USER).unwrap();
    assert!(login.is_entry_point);
    let helper = store.get_function(AUDIT_HELPER).unwrap();
    assert!(!helper.is_entry_point);

    let method = store.get_function(UPDATE_CLOCK_PIN).unwrap();
    assert_eq!(method.qualified_name, "AccountService.update_clock_pin");
    assert!(method.is_data_accessor);
    assert_eq!(method.data_access[0].fields, vec!["clock_pin_hash".to_string()]);
}

#[test]
fn re_resolving_is_idempotent() {
    let (_dir, store, _) = built_store();
    let before: Vec<_> = store
        .list_files()
        .unwrap()
        .iter()
        .map(|h| store.get_file_shard(h).unwrap().as_ref().clone())
        .collect();

    let again = CallResolver::new(&store).resolve().unwrap();
    assert!(again.is_clean());
    assert_eq!(again.data.shards_rewritten, 0);

    store.invalidate_cache(None);
    let after: Vec<_> = store
        .list_files()
        .unwrap()
        .iter()
        .map(|h| store.get_file_shard(h).unwrap().as_ref().clone())
        .collect();
    assert_eq!(before, after);
}

#[test]
fn rebuild_replaces_previous_graph() {
    let (_dir, store, _) = built_store();
    let result = StreamingBuilder::new(&store, BuildConfig::default())
        .build(vec![audit(AUDIT)])
        .unwrap();
    assert_eq!(result.files_processed, 1);
    assert_eq!(store.list_files().unwrap().len(), 1);
    assert!(store.get_function(LOGIN_USER).is_none());
}

#[test]
fn small_batches_give_the_same_graph() {
    let (_dir, store, _) = built_store();
    let reference: Vec<_> = store
        .list_files()
        .unwrap()
        .iter()
        .map(|h| store.get_file_shard(h).unwrap().as_ref().clone())
        .collect();

    let dir = tempfile::tempdir().unwrap();
    let other = open_store(&dir);
    let config = BuildConfig {
        resolution_batch_size: Some(1),
        threads: Some(2),
        ..Default::default()
    };
    let result = StreamingBuilder::new(&other, config).build(fixture_inputs()).unwrap();
    assert_eq!(result.resolution.batches, 4);

    let batched: Vec<_> = other
        .list_files()
        .unwrap()
        .iter()
        .map(|h| other.get_file_shard(h).unwrap().as_ref().clone())
        .collect();
    assert_eq!(reference, batched);
}

#[test]
fn empty_build_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let result = StreamingBuilder::new(&store, BuildConfig::default())
        .build(Vec::new())
        .unwrap();
    assert_eq!(result.files_processed, 0);
    assert_eq!(result.total_functions, 0);
    let index = store.get_index().unwrap();
    assert_eq!(index.summary.total_files, 0);
    assert!(index.top_entry_points.is_empty());
}

#[test]
fn extraction_errors_are_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let mut broken = auth_routes();
    broken.errors.push("unexpected token at 12:4".into());
    let result = StreamingBuilder::new(&store, BuildConfig::default())
        .build(vec![account_service(), broken])
        .unwrap();
    assert_eq!(result.files_processed, 2);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains(AUTH_ROUTES));
}

// ═══════════════════════════════════════════════════════════════════════════
// CANCELLATION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn cancelled_build_stops_before_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let token = CancellationToken::new();
    token.cancel();

    let err = StreamingBuilder::new(&store, BuildConfig::default())
        .with_cancellation(&token)
        .build(fixture_inputs())
        .unwrap_err();
    assert!(matches!(err, CallGraphError::Cancelled { completed_batches: 0 }));
    // Shards were written whole; none resolved.
    assert_eq!(store.list_files().unwrap().len(), 4);
    let login = store.get_function(LOGIN_USER).unwrap();
    assert!(login.calls.iter().all(|c| !c.resolved));
}

#[test]
fn cancelled_resolve_stops_between_batches() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    StreamingBuilder::new(&store, BuildConfig::default())
        .build(fixture_inputs())
        .unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let err = CallResolver::new(&store)
        .with_batch_size(1)
        .with_cancellation(&token)
        .resolve()
        .unwrap_err();
    assert!(matches!(err, CallGraphError::Cancelled { completed_batches: 1 }));
}

// ═══════════════════════════════════════════════════════════════════════════
// EXTRACTOR SEAM
// ═══════════════════════════════════════════════════════════════════════════

/// Treats every `def name` line as a one-line function and every
/// `call name` line as a call inside the preceding function.
struct LineExtractor;

impl CallGraphExtractor for LineExtractor {
    fn can_handle(&self, file: &str) -> bool {
        file.ends_with(".toy")
    }

    fn extract(&self, source: &str, file: &str) -> Result<FileExtractionResult, ExtractionError> {
        let mut result = FileExtractionResult {
            file: file.to_string(),
            ..Default::default()
        };
        let mut current: Option<usize> = None;
        for (i, line) in source.lines().enumerate() {
            let line_no = i as u32 + 1;
            if let Some(name) = line.strip_prefix("def ") {
                let mut f = function(name.trim(), line_no, line_no);
                f.is_exported = name.trim() == "main";
                result.functions.push(f);
                current = Some(result.functions.len() - 1);
            } else if let Some(name) = line.strip_prefix("call ") {
                let idx = current.ok_or_else(|| ExtractionError::Failed {
                    file: file.to_string(),
                    message: format!("call outside function at line {}", line_no),
                })?;
                result.functions[idx].end_line = line_no;
                result.calls.push(call(name.trim(), None, line_no));
            }
        }
        Ok(result)
    }

    fn language(&self) -> &str {
        "toy"
    }
}

#[test]
fn build_from_files_uses_extractors() {
    let src = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("main.toy"), "def main\ncall helper\n").unwrap();
    std::fs::write(src.path().join("lib.toy"), "def helper\n").unwrap();
    std::fs::write(src.path().join("bad.toy"), "call nothing\n").unwrap();
    std::fs::write(src.path().join("notes.md"), "# notes\n").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let extractors: Vec<Box<dyn CallGraphExtractor>> = vec![Box::new(LineExtractor)];
    let files: Vec<String> = ["main.toy", "lib.toy", "bad.toy", "notes.md", "missing.toy"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let result = StreamingBuilder::new(&store, BuildConfig::default())
        .build_from_files(Path::new(src.path()), &files, &extractors)
        .unwrap();

    assert_eq!(result.files_processed, 2);
    assert_eq!(result.errors.len(), 3, "{:?}", result.errors);
    assert_eq!(result.resolved_calls, 1);

    let main = store.get_function("main.toy:main:1").unwrap();
    assert!(main.is_entry_point);
    assert_eq!(main.calls[0].resolved_id.as_deref(), Some("lib.toy:helper:1"));
    assert_eq!(main.calls[0].confidence, 0.80);
}
