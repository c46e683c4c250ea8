//! Directory Manager Module
//!
//! Resolves and validates the storage root: a user-configured custom
//! directory when set and writable, otherwise a fixed subdirectory of the
//! host data directory. Initialization is lazy, idempotent, and guarded so
//! concurrent first callers observe a single resolution attempt. Any
//! resolution failure lands the manager in an explicit `Disabled` state and
//! every higher-level operation degrades to cache-miss behavior instead of
//! raising.

use crate::config::{DataDirResolver, Preferences, CACHE_DIR_NAME};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Sentinel file used for the custom-directory write probe
const WRITE_PROBE_NAME: &str = ".write-probe";

/// Resolution state of the storage root
#[derive(Debug, Clone)]
enum RootState {
    Uninitialized,
    Ready(PathBuf),
    Disabled,
}

/// Lazily resolved storage root with explicit disabled degradation
pub struct DirectoryManager {
    prefs: Arc<dyn Preferences>,
    resolver: Arc<dyn DataDirResolver>,
    state: RwLock<RootState>,
    /// Serializes the first resolution so concurrent callers all observe
    /// one initialization attempt
    init_lock: Mutex<()>,
}

impl DirectoryManager {
    pub fn new(prefs: Arc<dyn Preferences>, resolver: Arc<dyn DataDirResolver>) -> Self {
        Self {
            prefs,
            resolver,
            state: RwLock::new(RootState::Uninitialized),
            init_lock: Mutex::new(()),
        }
    }

    /// Resolve the storage root, initializing on first call.
    ///
    /// Returns `None` when resolution failed and the cache is disabled.
    pub async fn ensure_ready(&self) -> Option<PathBuf> {
        match &*self.state.read().await {
            RootState::Ready(root) => return Some(root.clone()),
            RootState::Disabled => return None,
            RootState::Uninitialized => {}
        }

        let _guard = self.init_lock.lock().await;

        // A concurrent caller may have finished initialization while this
        // one waited on the lock.
        match &*self.state.read().await {
            RootState::Ready(root) => return Some(root.clone()),
            RootState::Disabled => return None,
            RootState::Uninitialized => {}
        }

        let resolved = self.resolve_root().await;
        let mut state = self.state.write().await;
        match resolved {
            Some(root) => {
                info!("Cache directory ready: path={:?}", root);
                *state = RootState::Ready(root.clone());
                Some(root)
            }
            None => {
                warn!("Cache directory unavailable, cache disabled");
                *state = RootState::Disabled;
                None
            }
        }
    }

    /// Drop the resolved root so the next `ensure_ready` re-resolves.
    ///
    /// Used when the custom-directory preference changes; the facade
    /// flushes pending writes before calling this.
    pub async fn reset(&self) {
        let _guard = self.init_lock.lock().await;
        *self.state.write().await = RootState::Uninitialized;
        debug!("Cache directory state reset");
    }

    /// The resolved root, if initialization succeeded
    pub async fn current_root(&self) -> Option<PathBuf> {
        self.ensure_ready().await
    }

    async fn resolve_root(&self) -> Option<PathBuf> {
        if let Some(custom) = self.prefs.custom_cache_dir() {
            let trimmed = custom.trim();
            if !trimmed.is_empty() {
                let custom_root = PathBuf::from(trimmed).join(CACHE_DIR_NAME);
                match Self::prepare_custom_dir(&custom_root).await {
                    Ok(()) => return Some(custom_root),
                    Err(e) => {
                        warn!(
                            "Custom cache directory unusable, falling back to default: path={:?}, error={}",
                            custom_root, e
                        );
                    }
                }
            }
        }

        let default_root = self.resolver.data_dir().join(CACHE_DIR_NAME);
        match tokio::fs::create_dir_all(&default_root).await {
            Ok(()) => Some(default_root),
            Err(e) => {
                warn!(
                    "Failed to create default cache directory: path={:?}, error={}",
                    default_root, e
                );
                None
            }
        }
    }

    /// Create the custom directory and confirm writability with a
    /// create-then-delete sentinel file.
    async fn prepare_custom_dir(root: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(root).await?;
        let probe = root.join(WRITE_PROBE_NAME);
        tokio::fs::write(&probe, b"probe").await?;
        tokio::fs::remove_file(&probe).await?;
        Ok(())
    }
}
