//! Dedicated shard writer fed over a bounded channel.
//!
//! Per-file building runs on the rayon pool; all disk writes funnel through
//! one thread so workers never block each other on I/O.

use crossbeam_channel::Receiver;
use provenance_core::{FileShard, StorageError};
use provenance_storage::ShardStore;
use tracing::warn;

/// Shards in flight between workers and the writer.
pub(crate) const WRITE_QUEUE_DEPTH: usize = 256;

#[derive(Debug, Default)]
pub(crate) struct WriteReport {
    pub written: usize,
    pub errors: Vec<StorageError>,
}

/// Drain `receiver` until every sender is dropped.
pub(crate) fn write_shards(store: &ShardStore, receiver: Receiver<FileShard>) -> WriteReport {
    let mut report = WriteReport::default();
    for shard in receiver {
        match store.save_file_shard(&shard) {
            Ok(hash) => {
                store.invalidate_cache(Some(&hash));
                report.written += 1;
            }
            Err(e) => {
                warn!(file = %shard.file, error = %e, "shard write failed");
                report.errors.push(e);
            }
        }
    }
    report
}
