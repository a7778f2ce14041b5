//! Shard store integration tests: persistence, cache bounds, derived documents.

use provenance_core::{
    shard_key, CallEdge, CallerRef, DataAccessRef, DataOperation, FileShard, FunctionNode,
    FORMAT_VERSION,
};
use provenance_storage::ShardStore;

fn function(file: &str, name: &str, start: u32, end: u32) -> FunctionNode {
    FunctionNode {
        id: FunctionNode::make_id(file, name, start),
        name: name.to_string(),
        qualified_name: name.to_string(),
        file: file.to_string(),
        start_line: start,
        end_line: end,
        is_entry_point: false,
        is_data_accessor: false,
        calls: Vec::new(),
        called_by: Vec::new(),
        data_access: Vec::new(),
    }
}

fn resolved_call(target: &FunctionNode, line: u32) -> CallEdge {
    CallEdge {
        target: target.name.clone(),
        resolved: true,
        resolved_id: Some(target.id.clone()),
        confidence: 0.8,
        line,
    }
}

/// routes.py:login -> service.py:load_user -> reads users.password_hash
fn small_graph() -> Vec<FileShard> {
    let mut load_user = function("service.py", "load_user", 1, 10);
    load_user.is_data_accessor = true;
    load_user.data_access.push(DataAccessRef {
        table: "users".into(),
        operation: DataOperation::Read,
        line: 4,
        fields: vec!["email".into(), "password_hash".into()],
    });

    let mut login = function("routes.py", "login", 1, 20);
    login.is_entry_point = true;
    login.calls.push(resolved_call(&load_user, 5));
    login.calls.push(CallEdge::unresolved("render", 6));

    load_user.called_by.push(CallerRef {
        caller_id: login.id.clone(),
        line: 5,
    });

    let mut routes = FileShard::new("routes.py");
    routes.functions.push(login);
    let mut service = FileShard::new("service.py");
    service.functions.push(load_user);
    vec![routes, service]
}

#[test]
fn test_shard_round_trip_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = ShardStore::open(dir.path()).unwrap();

    for shard in small_graph() {
        store.save_file_shard(&shard).unwrap();
        store.invalidate_cache(None);
        let loaded = store.get_file_shard(&shard_key(&shard.file)).unwrap();
        assert_eq!(*loaded, shard);
        let by_path = store.get_file_shard_by_path(&shard.file).unwrap();
        assert_eq!(*by_path, shard);
    }
}

#[test]
fn test_reopened_store_sees_shards() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = ShardStore::open(dir.path()).unwrap();
        for shard in small_graph() {
            store.save_file_shard(&shard).unwrap();
        }
    }
    let store = ShardStore::open(dir.path()).unwrap();
    assert!(store.is_available());
    assert_eq!(store.list_files().unwrap().len(), 2);
    assert_eq!(store.cached_shard_count(), 0);
}

#[test]
fn test_corrupt_shard_reads_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = ShardStore::open(dir.path()).unwrap();
    let hash = shard_key("broken.py");
    std::fs::write(dir.path().join("files").join(format!("{hash}.json")), b"{ not json").unwrap();

    assert!(store.get_file_shard(&hash).is_none());
    // Still listed, skipped by sweeps.
    assert_eq!(store.list_files().unwrap(), vec![hash]);
    let index = store.build_index().unwrap();
    assert_eq!(index.summary.total_files, 0);
}

#[test]
fn test_version_mismatch_reads_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    let store = ShardStore::open(dir.path()).unwrap();
    let hash = shard_key("old.py");
    let doc = serde_json::json!({ "version": "0.1", "file": "old.py", "functions": [] });
    std::fs::write(
        dir.path().join("files").join(format!("{hash}.json")),
        serde_json::to_vec(&doc).unwrap(),
    )
    .unwrap();
    assert!(store.get_file_shard(&hash).is_none());

    let current = serde_json::json!({ "version": FORMAT_VERSION, "file": "old.py", "functions": [] });
    std::fs::write(
        dir.path().join("files").join(format!("{hash}.json")),
        serde_json::to_vec(&current).unwrap(),
    )
    .unwrap();
    assert_eq!(store.get_file_shard(&hash).unwrap().file, "old.py");
}

#[test]
fn test_delete_evicts_and_removes() {
    let dir = tempfile::tempdir().unwrap();
    let store = ShardStore::open(dir.path()).unwrap();
    let hash = store.save_file_shard(&FileShard::new("gone.py")).unwrap();

    assert!(store.delete_file_shard(&hash).unwrap());
    assert!(!store.is_cached(&hash));
    assert!(store.get_file_shard(&hash).is_none());
    assert!(!store.delete_file_shard(&hash).unwrap());
    assert!(!store.is_available());
}

#[test]
fn test_sweep_leaves_cache_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let store = ShardStore::with_capacity(dir.path(), 4).unwrap().with_batch_size(3);
    for i in 0..10 {
        store.save_file_shard(&FileShard::new(format!("f{i}.py"))).unwrap();
    }
    store.invalidate_cache(None);

    let mut max_cached = 0;
    let visited = store
        .for_each_shard(|_| max_cached = max_cached.max(store.cached_shard_count()))
        .unwrap();
    assert_eq!(visited, 10);
    assert!(max_cached <= 3);
    assert_eq!(store.cached_shard_count(), 0);
}

#[test]
fn test_build_index_on_empty_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = ShardStore::open(dir.path()).unwrap();
    let index = store.build_index().unwrap();

    assert_eq!(index.version, FORMAT_VERSION);
    assert_eq!(index.summary.total_files, 0);
    assert!(index.top_entry_points.is_empty());
    assert!(index.top_data_accessors.is_empty());
    assert_eq!(index.summary.resolution_rate, 0.0);
}

#[test]
fn test_build_index_and_entry_points() {
    let dir = tempfile::tempdir().unwrap();
    let store = ShardStore::open(dir.path()).unwrap();
    for shard in small_graph() {
        store.save_file_shard(&shard).unwrap();
    }

    let index = store.build_index().unwrap();
    assert_eq!(index.summary.total_files, 2);
    assert_eq!(index.summary.total_functions, 2);
    assert_eq!(index.summary.total_calls, 2);
    assert_eq!(index.summary.resolved_call_sites, 1);
    assert_eq!(index.summary.unresolved_call_sites, 1);
    assert!((index.summary.resolution_rate - 0.5).abs() < 1e-9);
    assert_eq!(index.summary.entry_points, 1);
    assert_eq!(index.summary.data_accessors, 1);
    assert!((index.summary.avg_depth - 1.0).abs() < 1e-9);
    assert_eq!(index.files[0].file, "routes.py");

    let top = &index.top_entry_points[0];
    assert_eq!(top.name, "login");
    assert_eq!(top.reachable_functions, 1);
    assert_eq!(top.reachable_tables, 1);
    assert_eq!(index.top_data_accessors[0].tables, vec!["users".to_string()]);

    let eps = store.build_entry_points().unwrap();
    assert_eq!(eps.entry_points.len(), 1);
    assert_eq!(eps.entry_points[0].reachable_functions, vec!["service.py:load_user:1".to_string()]);
    assert_eq!(eps.entry_points[0].reachable_tables, vec!["users".to_string()]);

    // Persisted copies read back.
    assert_eq!(store.get_index().unwrap().summary, index.summary);
    assert_eq!(store.get_entry_points().unwrap().entry_points, eps.entry_points);
}

#[test]
fn test_build_derived_sweeps_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = ShardStore::open(dir.path()).unwrap();
    for shard in small_graph() {
        store.save_file_shard(&shard).unwrap();
    }

    let lookups = |s: &ShardStore| {
        let stats = s.cache_stats();
        stats.hits + stats.misses
    };
    let before = lookups(&store);
    let (index, eps) = store.build_derived().unwrap();
    assert_eq!(lookups(&store) - before, 2);

    assert_eq!(index.summary.total_files, 2);
    assert_eq!(index.summary.entry_points, eps.entry_points.len());
    assert_eq!(eps.entry_points[0].reachable_tables, vec!["users".to_string()]);
    assert_eq!(store.get_index().unwrap().summary, index.summary);
    assert_eq!(store.get_entry_points().unwrap().entry_points, eps.entry_points);
}

#[test]
fn test_index_rebuild_is_not_incremental() {
    let dir = tempfile::tempdir().unwrap();
    let store = ShardStore::open(dir.path()).unwrap();
    for shard in small_graph() {
        store.save_file_shard(&shard).unwrap();
    }
    assert_eq!(store.build_index().unwrap().summary.total_files, 2);

    store.delete_file_shard(&shard_key("routes.py")).unwrap();
    let index = store.build_index().unwrap();
    assert_eq!(index.summary.total_files, 1);
    assert_eq!(index.summary.entry_points, 0);
}

#[test]
fn test_top_n_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let store = ShardStore::open(dir.path()).unwrap().with_top_n(2);
    let mut shard = FileShard::new("api.py");
    for i in 0..5 {
        let mut f = function("api.py", &format!("handler{i}"), i * 10 + 1, i * 10 + 9);
        f.is_entry_point = true;
        shard.functions.push(f);
    }
    store.save_file_shard(&shard).unwrap();

    let index = store.build_index().unwrap();
    assert_eq!(index.summary.entry_points, 5);
    assert_eq!(index.top_entry_points.len(), 2);
}

#[test]
fn test_point_lookups() {
    let dir = tempfile::tempdir().unwrap();
    let store = ShardStore::open(dir.path()).unwrap();
    for shard in small_graph() {
        store.save_file_shard(&shard).unwrap();
    }

    let f = store.get_function("service.py:load_user:1").unwrap();
    assert_eq!(f.called_by.len(), 1);
    assert!(store.get_function("service.py:nope:1").is_none());
    assert!(store.get_function("garbage").is_none());

    let by_table = store.get_functions_by_table("users").unwrap();
    assert_eq!(by_table.len(), 1);
    assert_eq!(by_table[0].name, "load_user");

    let accesses = store.get_data_access_by_table("users").unwrap();
    assert_eq!(accesses.len(), 1);
    assert_eq!(accesses[0].access.operation, DataOperation::Read);
    assert!(store.get_data_access_by_table("orders").unwrap().is_empty());

    let stats = store.stats().unwrap();
    assert_eq!(stats.files, 2);
    assert_eq!(stats.calls, 2);
    assert_eq!(stats.resolved_calls, 1);
}
