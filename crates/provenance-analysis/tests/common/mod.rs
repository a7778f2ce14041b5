//! Shared fixture: a small Python service with an account service, two auth
//! routes, and an ambiguous `record_event` helper defined in two audit modules.

#![allow(dead_code)]

use provenance_analysis::call_graph::{
    ExtractedCall, ExtractedClass, ExtractedDataAccess, ExtractedFunction, FileExtractionResult,
};
use provenance_analysis::{BuildResult, StreamingBuilder};
use provenance_core::config::BuildConfig;
use provenance_core::DataOperation;
use provenance_storage::ShardStore;
use tempfile::TempDir;

pub const ACCOUNT_SERVICE: &str = "services/account_service.py";
pub const AUTH_ROUTES: &str = "api/routes/auth.py";
pub const AUDIT: &str = "services/audit.py";
pub const LEGACY_AUDIT: &str = "services/legacy/audit.py";

pub const GET_PRIMARY_ACCOUNT_ID: &str = "services/account_service.py:get_primary_account_id:5";
pub const UPDATE_CLOCK_PIN: &str = "services/account_service.py:update_clock_pin:14";
pub const LOGIN_USER: &str = "api/routes/auth.py:login_user:10";
pub const SET_CLOCK_PIN: &str = "api/routes/auth.py:set_clock_pin:25";
pub const AUDIT_HELPER: &str = "api/routes/auth.py:_audit:40";
pub const RECORD_EVENT: &str = "services/audit.py:record_event:1";
pub const LEGACY_RECORD_EVENT: &str = "services/legacy/audit.py:record_event:1";

pub fn function(name: &str, start: u32, end: u32) -> ExtractedFunction {
    ExtractedFunction {
        name: name.to_string(),
        start_line: start,
        end_line: end,
        ..Default::default()
    }
}

pub fn method(class: &str, name: &str, start: u32, end: u32) -> ExtractedFunction {
    ExtractedFunction {
        class_name: Some(class.to_string()),
        ..function(name, start, end)
    }
}

pub fn exported(name: &str, start: u32, end: u32, route: &str) -> ExtractedFunction {
    ExtractedFunction {
        is_exported: true,
        decorators: vec![format!("@router.post(\"{}\")", route)],
        ..function(name, start, end)
    }
}

pub fn call(callee: &str, receiver: Option<&str>, line: u32) -> ExtractedCall {
    ExtractedCall {
        callee_name: callee.to_string(),
        line,
        receiver: receiver.map(str::to_string),
    }
}

pub fn access(table: &str, fields: &[&str], operation: DataOperation, line: u32) -> ExtractedDataAccess {
    ExtractedDataAccess {
        table: table.to_string(),
        fields: fields.iter().map(|f| f.to_string()).collect(),
        operation,
        line,
        confidence: 0.9,
    }
}

pub fn account_service() -> FileExtractionResult {
    FileExtractionResult {
        file: ACCOUNT_SERVICE.into(),
        language: "python".into(),
        classes: vec![ExtractedClass {
            name: "AccountService".into(),
            start_line: 1,
            end_line: 30,
        }],
        functions: vec![
            method("AccountService", "get_primary_account_id", 5, 12),
            method("AccountService", "update_clock_pin", 14, 22),
        ],
        data_access_points: vec![
            access("users", &["primary_account_id"], DataOperation::Read, 8),
            access("users", &["clock_pin_hash"], DataOperation::Write, 18),
        ],
        ..Default::default()
    }
}

pub fn auth_routes() -> FileExtractionResult {
    FileExtractionResult {
        file: AUTH_ROUTES.into(),
        language: "python".into(),
        functions: vec![
            exported("login_user", 10, 20, "/login"),
            exported("set_clock_pin", 25, 35, "/clock-pin"),
            function("_audit", 40, 45),
        ],
        calls: vec![
            call("get_primary_account_id", Some("AccountService"), 15),
            call("_audit", None, 16),
            call("update_clock_pin", Some("AccountService"), 30),
            call("record_event", None, 42),
            call("print", None, 43),
        ],
        ..Default::default()
    }
}

pub fn audit(file: &str) -> FileExtractionResult {
    FileExtractionResult {
        file: file.into(),
        language: "python".into(),
        functions: vec![function("record_event", 1, 6)],
        ..Default::default()
    }
}

pub fn fixture_inputs() -> Vec<FileExtractionResult> {
    vec![account_service(), auth_routes(), audit(AUDIT), audit(LEGACY_AUDIT)]
}

pub fn open_store(dir: &TempDir) -> ShardStore {
    ShardStore::open(dir.path().join("call-graph")).unwrap()
}

/// Build the fixture into a fresh store.
pub fn built_store() -> (TempDir, ShardStore, BuildResult) {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir);
    let result = StreamingBuilder::new(&store, BuildConfig::default())
        .build(fixture_inputs())
        .unwrap();
    (dir, store, result)
}
