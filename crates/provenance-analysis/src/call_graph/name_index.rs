//! Global function-name index: the only whole-codebase structure kept resident.

use provenance_core::types::collections::{FxHashMap, SmallVec4};
use provenance_core::{FileShard, FunctionId};

/// A function a call target may refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: FunctionId,
    pub file: String,
    pub start_line: u32,
}

/// `name -> [candidate]` and `qualified name -> [candidate]`.
///
/// Candidate lists are kept sorted by `(file, start_line, id)` so that every
/// consumer sees the same order regardless of shard visiting order.
#[derive(Debug, Default)]
pub struct NameIndex {
    by_name: FxHashMap<String, SmallVec4<Candidate>>,
    by_qualified: FxHashMap<String, SmallVec4<Candidate>>,
    function_count: usize,
}

impl NameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_shard(&mut self, shard: &FileShard) {
        for func in &shard.functions {
            let candidate = Candidate {
                id: func.id.clone(),
                file: func.file.clone(),
                start_line: func.start_line,
            };
            insert_sorted(self.by_name.entry(func.name.clone()).or_default(), candidate.clone());
            insert_sorted(
                self.by_qualified.entry(func.qualified_name.clone()).or_default(),
                candidate,
            );
            self.function_count += 1;
        }
    }

    /// Candidates for a call target as written in code.
    ///
    /// A qualified target (`Type.method`, `mod::func`, `obj->method`) first tries
    /// an exact qualified-name match, then falls back to its last segment.
    pub fn candidates(&self, target: &str) -> &[Candidate] {
        let simple = last_segment(target);
        if simple.len() != target.len() {
            let dotted = target.replace("::", ".").replace("->", ".");
            if let Some(found) = self.by_qualified.get(&dotted) {
                return found.as_slice();
            }
        }
        self.by_name.get(simple).map(|c| c.as_slice()).unwrap_or(&[])
    }

    pub fn function_count(&self) -> usize {
        self.function_count
    }

    pub fn distinct_names(&self) -> usize {
        self.by_name.len()
    }
}

fn insert_sorted(list: &mut SmallVec4<Candidate>, candidate: Candidate) {
    let key = |c: &Candidate| (c.file.clone(), c.start_line, c.id.clone());
    let probe = key(&candidate);
    match list.binary_search_by(|c| key(c).cmp(&probe)) {
        Ok(_) => {}
        Err(pos) => list.insert(pos, candidate),
    }
}

/// Last segment after `.`, `::` or `->`.
pub(crate) fn last_segment(target: &str) -> &str {
    let cut = [
        target.rfind('.').map(|i| i + 1),
        target.rfind("::").map(|i| i + 2),
        target.rfind("->").map(|i| i + 2),
    ]
    .into_iter()
    .flatten()
    .max()
    .unwrap_or(0);
    &target[cut..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use provenance_core::FunctionNode;

    fn shard(file: &str, funcs: &[(&str, &str, u32)]) -> FileShard {
        let mut shard = FileShard::new(file);
        for (name, qualified, line) in funcs {
            shard.functions.push(FunctionNode {
                id: FunctionNode::make_id(file, name, *line),
                name: name.to_string(),
                qualified_name: qualified.to_string(),
                file: file.to_string(),
                start_line: *line,
                end_line: line + 5,
                is_entry_point: false,
                is_data_accessor: false,
                calls: Vec::new(),
                called_by: Vec::new(),
                data_access: Vec::new(),
            });
        }
        shard
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(last_segment("foo"), "foo");
        assert_eq!(last_segment("a.b.c"), "c");
        assert_eq!(last_segment("std::mem::take"), "take");
        assert_eq!(last_segment("$this->save"), "save");
    }

    #[test]
    fn test_qualified_lookup_before_simple() {
        let mut index = NameIndex::new();
        index.add_shard(&shard("a.py", &[("get", "UserRepo.get", 1)]));
        index.add_shard(&shard("b.py", &[("get", "OrderRepo.get", 1)]));

        assert_eq!(index.candidates("UserRepo.get").len(), 1);
        assert_eq!(index.candidates("UserRepo::get")[0].file, "a.py");
        // Unknown receiver falls back to the simple name.
        assert_eq!(index.candidates("repo.get").len(), 2);
        assert!(index.candidates("missing").is_empty());
    }

    #[test]
    fn test_order_independent_of_insertion() {
        let mut forward = NameIndex::new();
        forward.add_shard(&shard("a.py", &[("run", "run", 1)]));
        forward.add_shard(&shard("z.py", &[("run", "run", 1)]));

        let mut backward = NameIndex::new();
        backward.add_shard(&shard("z.py", &[("run", "run", 1)]));
        backward.add_shard(&shard("a.py", &[("run", "run", 1)]));

        assert_eq!(forward.candidates("run"), backward.candidates("run"));
        assert_eq!(forward.candidates("run")[0].file, "a.py");
    }
}
