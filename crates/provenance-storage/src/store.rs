//! Sharded call-graph persistence.
//!
//! Layout under the store root:
//! - `files/<hash>.json`: one [`FileShard`] per source file
//! - `index.json`: derived [`provenance_core::CallGraphIndex`]
//! - `entry-points.json`: derived [`provenance_core::EntryPointsData`]
//!
//! Every document carries a `version`. Reads that hit a missing, corrupt or
//! version-mismatched document return `None` and log; they never error.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use provenance_core::config::{AnalysisConfig, BuildConfig, ProvenanceConfig};
use provenance_core::tracing::metrics;
use provenance_core::{shard_key, FileShard, StorageError, FORMAT_VERSION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{CacheStats, ShardCache};

pub(crate) const FILES_DIR: &str = "files";
pub(crate) const INDEX_FILE: &str = "index.json";
pub(crate) const ENTRY_POINTS_FILE: &str = "entry-points.json";

/// On-disk shard document: the shard plus its format version.
#[derive(Serialize)]
struct ShardDocumentRef<'a> {
    version: &'a str,
    #[serde(flatten)]
    shard: &'a FileShard,
}

#[derive(Deserialize)]
struct ShardDocument {
    version: String,
    #[serde(flatten)]
    shard: FileShard,
}

/// File-backed shard store with a bounded read cache.
pub struct ShardStore {
    root: PathBuf,
    files_dir: PathBuf,
    cache: ShardCache,
    batch_size: usize,
    top_n: usize,
}

impl ShardStore {
    /// Open (creating if needed) a store rooted at `root` with default settings.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Self::with_capacity(root, BuildConfig::DEFAULT_CACHE_CAPACITY)
    }

    /// Open with an explicit cache bound (in shards).
    pub fn with_capacity(root: impl Into<PathBuf>, cache_capacity: u64) -> Result<Self, StorageError> {
        let root = root.into();
        if root.exists() && !root.is_dir() {
            return Err(StorageError::InvalidRoot {
                path: root.display().to_string(),
            });
        }
        let files_dir = root.join(FILES_DIR);
        fs::create_dir_all(&files_dir).map_err(|e| StorageError::io(&files_dir, e))?;

        Ok(Self {
            root,
            files_dir,
            cache: ShardCache::new(cache_capacity.max(1)),
            batch_size: BuildConfig::DEFAULT_BATCH_SIZE,
            top_n: AnalysisConfig::DEFAULT_TOP_N,
        })
    }

    /// Open the store a project's configuration points at.
    pub fn from_config(project_root: &Path, config: &ProvenanceConfig) -> Result<Self, StorageError> {
        Ok(Self::with_capacity(
            config.storage_path(project_root),
            config.build.effective_cache_capacity(),
        )?
        .with_batch_size(config.build.effective_batch_size())
        .with_top_n(config.analysis.effective_top_n()))
    }

    /// Shards read per sweep batch before the cache is cleared.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Length of the index's top entry point / data accessor lists.
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub(crate) fn top_n(&self) -> usize {
        self.top_n
    }

    fn shard_path(&self, hash: &str) -> PathBuf {
        self.files_dir.join(format!("{}.json", hash))
    }

    // ========================================================================
    // Shards
    // ========================================================================

    /// Persist a shard (write-through: disk and cache). Returns its hash.
    pub fn save_file_shard(&self, shard: &FileShard) -> Result<String, StorageError> {
        let hash = shard.hash();
        let doc = ShardDocumentRef {
            version: FORMAT_VERSION,
            shard,
        };
        write_json_atomic(&self.shard_path(&hash), &doc, &shard.file)?;
        self.cache.insert(hash.clone(), Arc::new(shard.clone()));
        debug!(file = %shard.file, hash = %hash, functions = shard.functions.len(), "shard saved");
        Ok(hash)
    }

    /// Load a shard by hash. `None` when missing, corrupt or from another format version.
    pub fn get_file_shard(&self, hash: &str) -> Option<Arc<FileShard>> {
        if let Some(shard) = self.cache.get(hash) {
            return Some(shard);
        }

        let path = self.shard_path(hash);
        let doc: ShardDocument = read_json(&path)?;
        if doc.version != FORMAT_VERSION {
            warn!(
                path = %path.display(),
                found = %doc.version,
                expected = FORMAT_VERSION,
                "shard version mismatch, treating as absent"
            );
            return None;
        }

        let shard = Arc::new(doc.shard);
        self.cache.insert(hash.to_string(), Arc::clone(&shard));
        Some(shard)
    }

    /// Load the shard for a source path.
    pub fn get_file_shard_by_path(&self, file: &str) -> Option<Arc<FileShard>> {
        self.get_file_shard(&shard_key(file))
    }

    /// Hashes of every persisted shard, sorted.
    pub fn list_files(&self) -> Result<Vec<String>, StorageError> {
        let entries = match fs::read_dir(&self.files_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::io(&self.files_dir, e)),
        };

        let mut hashes = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::io(&self.files_dir, e))?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                hashes.push(stem.to_string());
            }
        }
        hashes.sort_unstable();
        Ok(hashes)
    }

    /// Remove a shard from disk and cache. Returns whether a file existed.
    pub fn delete_file_shard(&self, hash: &str) -> Result<bool, StorageError> {
        self.cache.invalidate(Some(hash));
        let path = self.shard_path(hash);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    /// Remove every shard and derived document. Used before a full rebuild.
    pub fn clear(&self) -> Result<usize, StorageError> {
        let hashes = self.list_files()?;
        for hash in &hashes {
            self.delete_file_shard(hash)?;
        }
        for name in [INDEX_FILE, ENTRY_POINTS_FILE] {
            let path = self.root.join(name);
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::io(&path, e)),
            }
        }
        self.cache.invalidate(None);
        Ok(hashes.len())
    }

    // ========================================================================
    // Cache
    // ========================================================================

    /// Evict one shard from the read cache, or all of them.
    pub fn invalidate_cache(&self, hash: Option<&str>) {
        self.cache.invalidate(hash);
    }

    pub fn is_cached(&self, hash: &str) -> bool {
        self.cache.contains(hash)
    }

    pub fn cached_shard_count(&self) -> u64 {
        self.cache.len()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Visit every readable shard in `batch_size` chunks, evicting each chunk
    /// from the cache before loading the next. Unreadable shards are skipped.
    pub fn for_each_shard<F>(&self, mut f: F) -> Result<usize, StorageError>
    where
        F: FnMut(&FileShard),
    {
        let hashes = self.list_files()?;
        let mut visited = 0;
        for chunk in hashes.chunks(self.batch_size) {
            for hash in chunk {
                if let Some(shard) = self.get_file_shard(hash) {
                    f(shard.as_ref());
                    visited += 1;
                }
            }
            for hash in chunk {
                self.cache.invalidate(Some(hash));
            }
        }
        debug!(
            visited,
            { metrics::SHARD_CACHE_HIT_RATE } = self.cache.stats().hit_rate(),
            "shard sweep done"
        );
        Ok(visited)
    }

    // ========================================================================
    // Derived documents
    // ========================================================================

    pub(crate) fn write_document<T: Serialize>(&self, name: &str, doc: &T) -> Result<(), StorageError> {
        write_json_atomic(&self.root.join(name), doc, name)
    }

    pub(crate) fn read_document<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        read_json(&self.root.join(name))
    }
}

/// Write JSON to a sibling temp file, then rename over the target.
fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T, what: &str) -> Result<(), StorageError> {
    let json = serde_json::to_vec(value).map_err(|e| StorageError::Serialization {
        what: what.to_string(),
        message: e.to_string(),
    })?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| StorageError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| StorageError::io(path, e))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "unreadable document");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "corrupt document, treating as absent");
            None
        }
    }
}
