//! Write Coalescer Module
//!
//! Debounces repeated writes to the same target path into a single physical
//! write carrying the last payload, and supports an immediate flush-all for
//! shutdown and directory reconfiguration. Each pending write is a
//! cancellable delayed task keyed by the resolved file path, so a
//! compression-preference change mid-burst cannot leave a duplicate pending
//! write under the old path.
//!
//! Physical writes are atomic: bytes land in a `.tmp` sibling first and are
//! renamed into place, so a reader never observes a half-written file.

use crate::config::DEBOUNCE_WRITE_DELAY;
use crate::envelope::CacheEnvelope;
use crate::{codec, Result};
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A write waiting for its debounce window to elapse
struct PendingWrite {
    /// Stamp distinguishing this entry from a superseding one for the same
    /// path; the timer task only fires if its stamp still matches
    generation: u64,
    handle: JoinHandle<()>,
    job: Arc<WriteJob>,
}

/// Everything needed to perform one physical write
#[derive(Debug)]
pub struct WriteJob {
    /// Final file path for the chosen format
    pub target: PathBuf,
    /// Path of the other format variant, deleted before writing so at most
    /// one representation stays authoritative
    pub alternate: PathBuf,
    pub envelope: CacheEnvelope<Value>,
    pub compressed: bool,
}

/// Per-path debounced write scheduler
pub struct WriteCoalescer {
    pending: Arc<Mutex<HashMap<PathBuf, PendingWrite>>>,
    next_generation: AtomicU64,
    delay: Duration,
}

impl WriteCoalescer {
    pub fn new() -> Self {
        Self::with_delay(DEBOUNCE_WRITE_DELAY)
    }

    /// Coalescer with a custom debounce window (shortened in tests)
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            delay,
        }
    }

    /// Schedule a debounced write, superseding any pending write for the
    /// same target path or its alternate-format sibling.
    pub async fn schedule(&self, job: WriteJob) {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        let job = Arc::new(job);

        let mut pending = self.pending.lock().await;
        if let Some(prev) = pending.remove(&job.target) {
            prev.handle.abort();
            debug!("Superseded pending cache write: path={:?}", job.target);
        }
        if let Some(prev) = pending.remove(&job.alternate) {
            prev.handle.abort();
            debug!(
                "Cancelled pending alternate-format write: path={:?}",
                job.alternate
            );
        }

        let table = Arc::clone(&self.pending);
        let task_job = Arc::clone(&job);
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut pending = table.lock().await;
                match pending.get(&task_job.target) {
                    Some(entry) if entry.generation == generation => {
                        pending.remove(&task_job.target);
                    }
                    // Superseded or flushed while sleeping
                    _ => return,
                }
            }
            if let Err(e) = execute_write(&task_job).await {
                warn!(
                    "Debounced cache write failed: path={:?}, error={}",
                    task_job.target, e
                );
            }
        });

        pending.insert(
            job.target.clone(),
            PendingWrite {
                generation,
                handle,
                job,
            },
        );
    }

    /// Cancel pending writes for the given paths without performing them.
    ///
    /// Used by `delete` so a debounced write cannot resurrect an entry the
    /// caller just removed.
    pub async fn cancel(&self, targets: &[PathBuf]) {
        let mut pending = self.pending.lock().await;
        for target in targets {
            if let Some(prev) = pending.remove(target) {
                prev.handle.abort();
                debug!("Cancelled pending cache write: path={:?}", target);
            }
        }
    }

    /// Cancel every pending write without performing it.
    ///
    /// Used by `clear_all` so nothing scheduled before the wipe lands
    /// after it.
    pub async fn cancel_all(&self) {
        let mut pending = self.pending.lock().await;
        for (path, entry) in pending.drain() {
            entry.handle.abort();
            debug!("Cancelled pending cache write: path={:?}", path);
        }
    }

    /// Cancel every timer and perform all pending writes immediately, in
    /// parallel. Individual failures are logged and swallowed; flushing is
    /// a best-effort shutdown path.
    pub async fn flush_all(&self) {
        let drained: Vec<PendingWrite> = {
            let mut pending = self.pending.lock().await;
            pending.drain().map(|(_, entry)| entry).collect()
        };
        if drained.is_empty() {
            return;
        }
        debug!("Flushing {} pending cache writes", drained.len());

        let writes = drained.into_iter().map(|entry| {
            entry.handle.abort();
            let job = entry.job;
            async move {
                if let Err(e) = execute_write(&job).await {
                    warn!(
                        "Flushed cache write failed: path={:?}, error={}",
                        job.target, e
                    );
                }
            }
        });
        join_all(writes).await;
    }

    /// Number of writes currently waiting on their debounce window
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

impl Default for WriteCoalescer {
    fn default() -> Self {
        Self::new()
    }
}

/// Perform one physical write: clean up the alternate-format file, then
/// serialize and commit atomically via a temp-file rename.
async fn execute_write(job: &WriteJob) -> Result<()> {
    match tokio::fs::remove_file(&job.alternate).await {
        Ok(()) => debug!(
            "Removed alternate-format cache file: path={:?}",
            job.alternate
        ),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            "Failed to remove alternate-format cache file: path={:?}, error={}",
            job.alternate, e
        ),
    }

    let bytes = codec::encode(&job.envelope, job.compressed)?;
    let temp_path = job.target.with_extension("tmp");
    tokio::fs::write(&temp_path, &bytes).await?;
    tokio::fs::rename(&temp_path, &job.target).await?;
    debug!(
        "Cache write committed: path={:?}, bytes={}, compressed={}",
        job.target,
        bytes.len(),
        job.compressed
    );
    Ok(())
}
