//! Rejects table names that are extraction noise rather than real tables.

use once_cell::sync::Lazy;
use regex::Regex;

/// Identifier-ish: letters, digits, `_`, `.` (schema-qualified), `$`, `-`.
static TABLE_NAME: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.$\-]*$").ok());

/// Generic variable names extractors pick up from ORM calls on untyped values.
const NOISE_NAMES: &[&str] = &[
    "unknown", "item", "items", "data", "result", "results", "value", "values",
    "obj", "object", "entity", "entities", "record", "records", "row", "rows",
    "self", "this", "table", "query", "undefined", "null", "none", "temp", "tmp",
    "model", "instance", "res", "req", "response", "request",
];

const MAX_TABLE_NAME_LEN: usize = 128;

pub fn is_valid_table_name(table: &str) -> bool {
    let table = table.trim();
    if table.len() < 2 || table.len() > MAX_TABLE_NAME_LEN {
        return false;
    }
    if !TABLE_NAME.as_ref().map_or(true, |re| re.is_match(table)) {
        return false;
    }
    !NOISE_NAMES.iter().any(|n| n.eq_ignore_ascii_case(table))
}
