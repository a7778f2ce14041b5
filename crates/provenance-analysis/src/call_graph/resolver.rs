//! Cross-shard call resolution.
//!
//! Three passes over the store, each holding at most one batch of shards:
//! 1. name index sweep (the only whole-codebase structure kept resident)
//! 2. batched resolve + persist, evicting each batch from the read cache
//! 3. `called_by` materialization from the resolved forward edges
//!
//! Cancellation is checked between batches only, so a half-written batch is
//! never observable.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use provenance_core::tracing::metrics;
use provenance_core::{CallGraphError, Cancellable, FileShard, PipelineResult};
use provenance_storage::ShardStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::callers::{apply_callers, collect_callers, CallerMap};
use super::name_index::NameIndex;
use super::strategies::{resolve_target, Resolution, ResolveContext};

/// Resolution counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionDiagnostics {
    pub total_call_sites: usize,
    pub resolved: usize,
    pub unresolved: usize,
    pub by_strategy: BTreeMap<String, usize>,
    pub batches: usize,
    pub shards_rewritten: usize,
}

impl ResolutionDiagnostics {
    pub fn record(&mut self, resolution: Option<Resolution>) {
        self.total_call_sites += 1;
        match resolution {
            Some(r) => {
                self.resolved += 1;
                *self.by_strategy.entry(r.name().to_string()).or_default() += 1;
            }
            None => self.unresolved += 1,
        }
    }

    pub fn resolution_rate(&self) -> f64 {
        if self.total_call_sites == 0 {
            0.0
        } else {
            self.resolved as f64 / self.total_call_sites as f64
        }
    }
}

/// Recompute every call edge of `shard` against `index`.
///
/// Pure and idempotent: the same shard and index always produce the same
/// edges. Returns whether any edge changed.
pub fn resolve_shard(
    shard: &mut FileShard,
    index: &NameIndex,
    diagnostics: &mut ResolutionDiagnostics,
) -> bool {
    let ctx = ResolveContext {
        caller_file: &shard.file,
    };
    let mut changed = false;

    for func in &mut shard.functions {
        for call in &mut func.calls {
            let candidates = index.candidates(&call.target);
            let outcome = resolve_target(&call.target, candidates, &ctx);
            diagnostics.record(outcome.map(|(_, r)| r));

            let (resolved, resolved_id, confidence) = match outcome {
                Some((candidate, resolution)) => {
                    (true, Some(candidate.id.clone()), resolution.confidence())
                }
                None => (false, None, 0.0),
            };
            if call.resolved != resolved || call.resolved_id != resolved_id || call.confidence != confidence {
                call.resolved = resolved;
                call.resolved_id = resolved_id;
                call.confidence = confidence;
                changed = true;
            }
        }
    }
    changed
}

/// Batched resolver over a [`ShardStore`].
pub struct CallResolver<'a> {
    store: &'a ShardStore,
    batch_size: usize,
    cancel: Option<&'a dyn Cancellable>,
}

impl<'a> CallResolver<'a> {
    pub fn new(store: &'a ShardStore) -> Self {
        Self {
            store,
            batch_size: store.batch_size(),
            cancel: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_cancellation(mut self, token: &'a dyn Cancellable) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|c| c.is_cancelled())
    }

    /// Run all three passes. Per-shard write failures are collected, not fatal.
    pub fn resolve(&self) -> Result<PipelineResult<ResolutionDiagnostics>, CallGraphError> {
        let index = self.build_name_index()?;
        let mut result = self.resolve_with_index(&index)?;
        let caller_errors = self.materialize_callers()?;
        result.errors.extend(caller_errors.errors);
        Ok(result)
    }

    /// Phase 1: stream every shard once into a [`NameIndex`].
    pub fn build_name_index(&self) -> Result<NameIndex, CallGraphError> {
        let started = Instant::now();
        let mut index = NameIndex::new();
        let shards = self.store.for_each_shard(|shard| index.add_shard(shard))?;
        info!(
            shards,
            functions = index.function_count(),
            names = index.distinct_names(),
            { metrics::NAME_INDEX_TIME } = started.elapsed().as_millis() as u64,
            "name index built"
        );
        Ok(index)
    }

    /// Phase 2: resolve shards in batches against a complete index.
    pub fn resolve_with_index(
        &self,
        index: &NameIndex,
    ) -> Result<PipelineResult<ResolutionDiagnostics>, CallGraphError> {
        let hashes = self.store.list_files()?;
        let mut result = PipelineResult::new(ResolutionDiagnostics::default());

        for (batch, chunk) in hashes.chunks(self.batch_size).enumerate() {
            let started = Instant::now();
            for hash in chunk {
                let Some(shard) = self.store.get_file_shard(hash) else {
                    continue;
                };
                let mut shard = Arc::unwrap_or_clone(shard);
                if resolve_shard(&mut shard, index, &mut result.data) {
                    match self.store.save_file_shard(&shard) {
                        Ok(_) => result.data.shards_rewritten += 1,
                        Err(e) => {
                            warn!(file = %shard.file, error = %e, "failed to persist resolved shard");
                            result.add_error(CallGraphError::from(e));
                        }
                    }
                }
            }
            for hash in chunk {
                self.store.invalidate_cache(Some(hash));
            }
            result.data.batches += 1;
            debug!(
                batch,
                files = chunk.len(),
                { metrics::RESOLVE_BATCH_TIME } = started.elapsed().as_millis() as u64,
                "resolution batch persisted"
            );

            if self.is_cancelled() {
                warn!(completed_batches = batch + 1, "resolution cancelled");
                return Err(CallGraphError::Cancelled {
                    completed_batches: batch + 1,
                });
            }
        }

        info!(
            call_sites = result.data.total_call_sites,
            resolved = result.data.resolved,
            { metrics::RESOLUTION_RATE } = result.data.resolution_rate(),
            "call resolution complete"
        );
        Ok(result)
    }

    /// Phase 3: rebuild every `called_by` list from the forward edges.
    pub fn materialize_callers(&self) -> Result<PipelineResult<usize>, CallGraphError> {
        let mut map = CallerMap::default();
        self.store.for_each_shard(|shard| collect_callers(shard, &mut map))?;

        let hashes = self.store.list_files()?;
        let mut result = PipelineResult::new(0usize);
        for (batch, chunk) in hashes.chunks(self.batch_size).enumerate() {
            for hash in chunk {
                let Some(shard) = self.store.get_file_shard(hash) else {
                    continue;
                };
                let mut shard = Arc::unwrap_or_clone(shard);
                if apply_callers(&mut shard, &map) {
                    if let Err(e) = self.store.save_file_shard(&shard) {
                        warn!(file = %shard.file, error = %e, "failed to persist callers");
                        result.add_error(CallGraphError::from(e));
                        continue;
                    }
                    result.data += 1;
                }
            }
            for hash in chunk {
                self.store.invalidate_cache(Some(hash));
            }
            if self.is_cancelled() {
                warn!(completed_batches = batch + 1, "caller materialization cancelled");
                return Err(CallGraphError::Cancelled {
                    completed_batches: batch + 1,
                });
            }
        }
        debug!(shards_updated = result.data, "callers materialized");
        Ok(result)
    }
}
