//! Cache Facade Module
//!
//! The public surface of the local response cache: `get`/`set`/`delete`
//! plus the maintenance operations (`clear_all`, `purge_expired`,
//! `get_stats`, `get_age`) and directory lifecycle (`init`, `reinit`,
//! `cache_dir`).
//!
//! The facade never raises for corrupt data, missing files, or an
//! unavailable directory; all such conditions collapse to a miss or a
//! no-op with internal logging. The cache is a performance layer, never
//! the reason a data fetch fails.
//!
//! Reads probe the compressed file first, then the uncompressed one
//! (`TryCompressed -> TryUncompressed -> Miss`): a prior run may have
//! written either format depending on the compression preference at the
//! time, and both must stay readable across preference changes.

use crate::codec;
use crate::config::{self, DataDirResolver, Preferences};
use crate::directory::DirectoryManager;
use crate::envelope::CacheEnvelope;
use crate::paths;
use crate::validator::{self, CacheHit, IntegritySampler, ReferenceListSampler, Verdict};
use crate::writer::{WriteCoalescer, WriteJob};
use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Snapshot of on-disk and runtime cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of cache files on disk
    pub file_count: usize,
    /// Combined size of all cache files in bytes
    pub total_size_bytes: u64,
    /// Cache files stored gzip-compressed
    pub compressed_files: usize,
    /// Cache files stored as plain JSON
    pub uncompressed_files: usize,
    /// File counts grouped by record type
    pub files_by_type: HashMap<String, usize>,
    /// Lookups served from disk since construction
    pub hits: u64,
    /// Lookups that fell through to a miss since construction
    pub misses: u64,
    /// Writes currently waiting on their debounce window
    pub pending_writes: usize,
}

/// Local on-disk response cache for INSPIRE-HEP literature data.
///
/// Constructed once at host-application start with the host's preference
/// store and data-directory resolver injected, then shared by `Arc` among
/// the consumers (reference-list controllers, citation dialogs, author
/// profile views).
pub struct InspireLocalCache {
    prefs: Arc<dyn Preferences>,
    dirs: DirectoryManager,
    writer: WriteCoalescer,
    sampler: Arc<dyn IntegritySampler>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl InspireLocalCache {
    /// Cache with the default reference-list integrity sampler
    pub fn new(prefs: Arc<dyn Preferences>, resolver: Arc<dyn DataDirResolver>) -> Self {
        Self::with_sampler(prefs, resolver, Arc::new(ReferenceListSampler))
    }

    /// Cache with a custom integrity-sampling strategy
    pub fn with_sampler(
        prefs: Arc<dyn Preferences>,
        resolver: Arc<dyn DataDirResolver>,
        sampler: Arc<dyn IntegritySampler>,
    ) -> Self {
        Self {
            dirs: DirectoryManager::new(Arc::clone(&prefs), resolver),
            writer: WriteCoalescer::new(),
            prefs,
            sampler,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Resolve the storage root ahead of the first read or write
    pub async fn init(&self) {
        self.dirs.ensure_ready().await;
    }

    /// Flush pending writes and re-resolve the storage root.
    ///
    /// Called when the custom-directory preference changes.
    pub async fn reinit(&self) {
        self.writer.flush_all().await;
        self.dirs.reset().await;
        self.dirs.ensure_ready().await;
    }

    /// The resolved cache directory, if available
    pub async fn cache_dir(&self) -> Option<PathBuf> {
        self.dirs.current_root().await
    }

    /// Perform all pending debounced writes immediately.
    ///
    /// Used before host shutdown so a burst of trailing `set` calls is not
    /// lost with the process.
    pub async fn flush_writes(&self) {
        self.writer.flush_all().await;
    }

    /// Look up a cached entry.
    ///
    /// Returns `None` when the cache is disabled, the entry is absent,
    /// expired, or failed validation.
    pub async fn get(&self, record_type: &str, key: &str, sort: Option<&str>) -> Option<CacheHit> {
        self.lookup(record_type, key, sort, false).await
    }

    /// Look up a cached entry, returning expired data flagged with
    /// `expired: true` instead of missing.
    ///
    /// The offline-fallback read path: when no live source is reachable,
    /// stale data with a visible age beats no data.
    pub async fn get_allow_expired(
        &self,
        record_type: &str,
        key: &str,
        sort: Option<&str>,
    ) -> Option<CacheHit> {
        self.lookup(record_type, key, sort, true).await
    }

    /// Store a payload, fire-and-forget.
    ///
    /// No-op when the cache is disabled or the directory is unavailable.
    /// The physical write is debounced; a burst of `set` calls for the
    /// same key collapses into one write carrying the last payload. Write
    /// failures are logged, never reported to the caller.
    pub async fn set(
        &self,
        record_type: &str,
        key: &str,
        payload: Value,
        sort: Option<&str>,
        total_count: Option<u64>,
    ) {
        let Some(root) = self.usable_root().await else {
            return;
        };

        let ttl_hours = config::ttl_hours_for(record_type, self.prefs.default_ttl_hours());
        let compressed = self.prefs.compression_enabled();
        let envelope = CacheEnvelope::new(record_type, key, ttl_hours, payload, total_count);
        debug!(
            "Scheduling cache write: type={}, key={}, ttl_hours={}, compressed={}",
            record_type, key, ttl_hours, compressed
        );
        self.writer
            .schedule(WriteJob {
                target: paths::resolve_path(&root, record_type, key, sort, compressed),
                alternate: paths::resolve_path(&root, record_type, key, sort, !compressed),
                envelope,
                compressed,
            })
            .await;
    }

    /// Remove both format variants of an entry, cancelling any pending
    /// write for it first.
    pub async fn delete(&self, record_type: &str, key: &str, sort: Option<&str>) {
        let Some(root) = self.usable_root().await else {
            return;
        };
        let variants = [
            paths::resolve_path(&root, record_type, key, sort, true),
            paths::resolve_path(&root, record_type, key, sort, false),
        ];
        self.writer.cancel(&variants).await;
        for path in &variants {
            remove_file_quiet(path).await;
        }
    }

    /// Remove every cache file, returning how many were removed.
    ///
    /// Pending debounced writes are cancelled first so nothing scheduled
    /// before the wipe lands after it.
    pub async fn clear_all(&self) -> usize {
        let Some(root) = self.usable_root().await else {
            return 0;
        };
        self.writer.cancel_all().await;
        let files = self.list_cache_files(&root).await;

        let removals = files.into_iter().map(|path| async move {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
                Err(e) => {
                    warn!("Failed to remove cache file: path={:?}, error={}", path, e);
                    0
                }
            }
        });
        let removed = join_all(removals).await.into_iter().sum();
        debug!("Cleared cache: removed={}", removed);
        removed
    }

    /// Remove expired and undecodable entries, returning how many files
    /// were removed.
    ///
    /// The completeness flag is ignored here: any decodable file whose TTL
    /// has elapsed is removable, and anything unreadable is garbage.
    pub async fn purge_expired(&self) -> usize {
        let Some(root) = self.usable_root().await else {
            return 0;
        };
        let now_millis = Utc::now().timestamp_millis();
        let files = self.list_cache_files(&root).await;

        let purges = files.into_iter().map(|path| async move {
            let compressed = paths::path_is_compressed(&path);
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(_) => return 0usize,
            };
            let expired = match codec::decode::<Value>(&bytes, compressed) {
                Ok(envelope) => envelope.is_expired(now_millis),
                Err(e) => {
                    warn!("Purging unreadable cache file: path={:?}, error={}", path, e);
                    true
                }
            };
            if expired {
                match tokio::fs::remove_file(&path).await {
                    Ok(()) => 1,
                    Err(e) => {
                        warn!("Failed to purge cache file: path={:?}, error={}", path, e);
                        0
                    }
                }
            } else {
                0
            }
        });
        let purged = join_all(purges).await.into_iter().sum();
        debug!("Purged expired cache entries: removed={}", purged);
        purged
    }

    /// Age in whole hours of whichever format variant is found first, or
    /// `-1` when absent, unreadable, or the cache is disabled
    pub async fn get_age(&self, record_type: &str, key: &str, sort: Option<&str>) -> i64 {
        let Some(root) = self.usable_root().await else {
            return -1;
        };
        let now_millis = Utc::now().timestamp_millis();
        for compressed in [true, false] {
            let path = paths::resolve_path(&root, record_type, key, sort, compressed);
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(_) => continue,
            };
            match codec::decode::<Value>(&bytes, compressed) {
                Ok(envelope) => return envelope.age_hours(now_millis),
                Err(_) => continue,
            }
        }
        -1
    }

    /// Collect on-disk and runtime statistics
    pub async fn get_stats(&self) -> CacheStats {
        let mut stats = CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            pending_writes: self.writer.pending_count().await,
            ..CacheStats::default()
        };
        let Some(root) = self.usable_root().await else {
            return stats;
        };

        let files = self.list_cache_files(&root).await;
        let sizes = join_all(files.iter().map(|path| async move {
            tokio::fs::metadata(path).await.map(|m| m.len()).ok()
        }))
        .await;

        for (path, size) in files.iter().zip(sizes) {
            let Some(size) = size else { continue };
            stats.file_count += 1;
            stats.total_size_bytes += size;
            if paths::path_is_compressed(path) {
                stats.compressed_files += 1;
            } else {
                stats.uncompressed_files += 1;
            }
            if let Some(record_type) = paths::record_type_of(path) {
                *stats.files_by_type.entry(record_type).or_insert(0) += 1;
            }
        }
        stats
    }

    /// Storage root when the cache is enabled and the directory resolved
    async fn usable_root(&self) -> Option<PathBuf> {
        if !self.prefs.cache_enabled() {
            return None;
        }
        self.dirs.ensure_ready().await
    }

    /// The `TryCompressed -> TryUncompressed -> Miss` read path
    async fn lookup(
        &self,
        record_type: &str,
        key: &str,
        sort: Option<&str>,
        ignore_ttl: bool,
    ) -> Option<CacheHit> {
        let root = self.usable_root().await?;

        for compressed in [true, false] {
            let path = paths::resolve_path(&root, record_type, key, sort, compressed);
            let bytes = match tokio::fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!("Failed to read cache file: path={:?}, error={}", path, e);
                    continue;
                }
            };

            let envelope: CacheEnvelope<Value> = match codec::decode(&bytes, compressed) {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(
                        "Removing unreadable cache file: path={:?}, error={}",
                        path, e
                    );
                    remove_file_quiet(&path).await;
                    continue;
                }
            };

            match validator::validate(envelope, ignore_ttl, self.sampler.as_ref()) {
                Verdict::Valid(hit) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        "Cache hit: type={}, key={}, age_hours={}, expired={}",
                        record_type, key, hit.age_hours, hit.expired
                    );
                    return Some(hit);
                }
                Verdict::Reject { delete_file } => {
                    if delete_file {
                        remove_file_quiet(&path).await;
                    }
                }
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!("Cache miss: type={}, key={}", record_type, key);
        None
    }

    /// Children of the cache root that match the cache extension set
    async fn list_cache_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to list cache directory: path={:?}, error={}", root, e);
                return files;
            }
        };
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if paths::is_cache_file(&path) {
                        files.push(path);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Cache directory listing failed: path={:?}, error={}", root, e);
                    break;
                }
            }
        }
        files
    }
}

async fn remove_file_quiet(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed cache file: path={:?}", path),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove cache file: path={:?}, error={}", path, e),
    }
}
