//! `called_by` materialization.
//!
//! Backward edges are derived state: they are recomputed from the forward
//! edges and overwritten wholesale, never patched.

use provenance_core::types::collections::FxHashMap;
use provenance_core::{CallerRef, FileShard, FunctionId};

/// callee id -> caller id -> lowest call line.
pub type CallerMap = FxHashMap<FunctionId, FxHashMap<FunctionId, u32>>;

/// Record every resolved edge leaving `shard`.
pub fn collect_callers(shard: &FileShard, map: &mut CallerMap) {
    for func in &shard.functions {
        for call in func.calls.iter().filter(|c| c.resolved) {
            let Some(callee) = call.resolved_id.as_ref() else {
                continue;
            };
            let line = map
                .entry(callee.clone())
                .or_default()
                .entry(func.id.clone())
                .or_insert(call.line);
            *line = (*line).min(call.line);
        }
    }
}

/// Overwrite each function's `called_by` from `map`: one ref per distinct
/// caller, sorted by caller id. Returns whether anything changed.
pub fn apply_callers(shard: &mut FileShard, map: &CallerMap) -> bool {
    let mut changed = false;
    for func in &mut shard.functions {
        let mut refs: Vec<CallerRef> = map
            .get(&func.id)
            .map(|callers| {
                callers
                    .iter()
                    .map(|(caller_id, line)| CallerRef {
                        caller_id: caller_id.clone(),
                        line: *line,
                    })
                    .collect()
            })
            .unwrap_or_default();
        refs.sort_by(|a, b| a.caller_id.cmp(&b.caller_id));
        if func.called_by != refs {
            func.called_by = refs;
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use provenance_core::{CallEdge, FunctionNode};

    fn node(file: &str, name: &str, line: u32) -> FunctionNode {
        FunctionNode {
            id: FunctionNode::make_id(file, name, line),
            name: name.into(),
            qualified_name: name.into(),
            file: file.into(),
            start_line: line,
            end_line: line + 10,
            is_entry_point: false,
            is_data_accessor: false,
            calls: Vec::new(),
            called_by: Vec::new(),
            data_access: Vec::new(),
        }
    }

    fn edge(to: &FunctionNode, line: u32) -> CallEdge {
        CallEdge {
            target: to.name.clone(),
            resolved: true,
            resolved_id: Some(to.id.clone()),
            confidence: 0.95,
            line,
        }
    }

    #[test]
    fn test_one_ref_per_caller_with_lowest_line() {
        let callee = node("a.py", "save", 30);
        let mut caller = node("a.py", "main", 1);
        caller.calls = vec![edge(&callee, 8), edge(&callee, 4), CallEdge::unresolved("print", 5)];

        let mut shard = FileShard::new("a.py");
        shard.functions = vec![caller, callee];

        let mut map = CallerMap::default();
        collect_callers(&shard, &mut map);
        assert!(apply_callers(&mut shard, &map));

        let refs = &shard.functions[1].called_by;
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].line, 4);
        assert!(shard.functions[0].called_by.is_empty());

        // Second application is a no-op.
        assert!(!apply_callers(&mut shard, &map));
    }

    #[test]
    fn test_stale_refs_are_cleared() {
        let mut lonely = node("b.py", "lonely", 1);
        lonely.called_by.push(CallerRef {
            caller_id: "gone.py:old:1".into(),
            line: 2,
        });
        let mut shard = FileShard::new("b.py");
        shard.functions.push(lonely);

        assert!(apply_callers(&mut shard, &CallerMap::default()));
        assert!(shard.functions[0].called_by.is_empty());
    }
}
