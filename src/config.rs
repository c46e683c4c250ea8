//! Configuration Module
//!
//! Host-collaborator interfaces (preference store, data-directory resolver)
//! and the record-type TTL policy. The cache reads four preferences: the
//! enabled flag, an optional custom cache directory, the default TTL in
//! hours, and the compression flag. All tuning constants live here.

use std::path::PathBuf;
use std::sync::RwLock;
use std::time::Duration;

/// Subdirectory name nested under the host data directory (or the custom
/// directory) that holds all cache files
pub const CACHE_DIR_NAME: &str = "inspire-cache";

/// Default TTL applied to record types without a fixed policy (one week)
pub const DEFAULT_TTL_HOURS: f64 = 168.0;

/// Fixed short TTL for import candidate lists; kept small so the offline
/// fallback path serves recent data only
pub const CANDIDATE_LIST_TTL_HOURS: f64 = 6.0;

/// Delay before a scheduled write fires; repeated writes to the same path
/// within this window collapse into one
pub const DEBOUNCE_WRITE_DELAY: Duration = Duration::from_millis(500);

/// Record type for a paper's reference list
pub const RECORD_TYPE_REFERENCES: &str = "references";

/// Record type for a paper's citing-papers list
pub const RECORD_TYPE_CITED_BY: &str = "cited-by";

/// Record type for an author profile
pub const RECORD_TYPE_AUTHOR_PROFILE: &str = "author-profile";

/// Record type for batch-import candidate lists
pub const RECORD_TYPE_CANDIDATE_LIST: &str = "candidate-list";

/// TTL policy by record type.
///
/// A published record's reference list is immutable, so `references`
/// entries never expire. Candidate lists get a fixed short TTL. Everything
/// else uses the preferences default.
pub fn ttl_hours_for(record_type: &str, default_ttl_hours: f64) -> f64 {
    match record_type {
        RECORD_TYPE_REFERENCES => 0.0,
        RECORD_TYPE_CANDIDATE_LIST => CANDIDATE_LIST_TTL_HOURS,
        _ => default_ttl_hours,
    }
}

/// Preference store consumed from the host application
pub trait Preferences: Send + Sync {
    /// Master switch; when false every `get` misses and every `set` is a no-op
    fn cache_enabled(&self) -> bool;

    /// User-configured cache directory, if any; blank values are ignored
    fn custom_cache_dir(&self) -> Option<String>;

    /// Default TTL in hours for record types without a fixed policy
    fn default_ttl_hours(&self) -> f64;

    /// Whether new entries are written gzip-compressed
    fn compression_enabled(&self) -> bool;
}

/// Host resolver for the default data directory the cache nests under
pub trait DataDirResolver: Send + Sync {
    fn data_dir(&self) -> PathBuf;
}

/// Data-dir resolver wrapping a fixed path
pub struct HostDataDir {
    root: PathBuf,
}

impl HostDataDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl DataDirResolver for HostDataDir {
    fn data_dir(&self) -> PathBuf {
        self.root.clone()
    }
}

#[derive(Debug, Clone)]
struct PreferenceValues {
    cache_enabled: bool,
    custom_cache_dir: Option<String>,
    default_ttl_hours: f64,
    compression_enabled: bool,
}

/// In-process preference store.
///
/// Used as the embedding default and as the test fake; hosts with their own
/// preference backend implement [`Preferences`] directly.
pub struct MemoryPreferences {
    values: RwLock<PreferenceValues>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self {
            values: RwLock::new(PreferenceValues {
                cache_enabled: true,
                custom_cache_dir: None,
                default_ttl_hours: DEFAULT_TTL_HOURS,
                compression_enabled: true,
            }),
        }
    }

    pub fn set_cache_enabled(&self, enabled: bool) {
        self.values.write().unwrap().cache_enabled = enabled;
    }

    pub fn set_custom_cache_dir(&self, dir: Option<String>) {
        self.values.write().unwrap().custom_cache_dir = dir;
    }

    pub fn set_default_ttl_hours(&self, hours: f64) {
        self.values.write().unwrap().default_ttl_hours = hours;
    }

    pub fn set_compression_enabled(&self, enabled: bool) {
        self.values.write().unwrap().compression_enabled = enabled;
    }
}

impl Default for MemoryPreferences {
    fn default() -> Self {
        Self::new()
    }
}

impl Preferences for MemoryPreferences {
    fn cache_enabled(&self) -> bool {
        self.values.read().unwrap().cache_enabled
    }

    fn custom_cache_dir(&self) -> Option<String> {
        self.values.read().unwrap().custom_cache_dir.clone()
    }

    fn default_ttl_hours(&self) -> f64 {
        self.values.read().unwrap().default_ttl_hours
    }

    fn compression_enabled(&self) -> bool {
        self.values.read().unwrap().compression_enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_lists_are_permanent() {
        assert_eq!(ttl_hours_for(RECORD_TYPE_REFERENCES, 24.0), 0.0);
    }

    #[test]
    fn candidate_lists_use_the_fixed_short_ttl() {
        assert_eq!(
            ttl_hours_for(RECORD_TYPE_CANDIDATE_LIST, 24.0),
            CANDIDATE_LIST_TTL_HOURS
        );
    }

    #[test]
    fn other_types_use_the_configured_default() {
        assert_eq!(ttl_hours_for(RECORD_TYPE_CITED_BY, 24.0), 24.0);
        assert_eq!(ttl_hours_for(RECORD_TYPE_AUTHOR_PROFILE, 24.0), 24.0);
        assert_eq!(ttl_hours_for("something-new", 12.5), 12.5);
    }

    #[test]
    fn memory_preferences_round_trip() {
        let prefs = MemoryPreferences::new();
        assert!(prefs.cache_enabled());
        assert!(prefs.compression_enabled());

        prefs.set_cache_enabled(false);
        prefs.set_compression_enabled(false);
        prefs.set_custom_cache_dir(Some("/tmp/x".to_string()));
        prefs.set_default_ttl_hours(1.5);

        assert!(!prefs.cache_enabled());
        assert!(!prefs.compression_enabled());
        assert_eq!(prefs.custom_cache_dir().as_deref(), Some("/tmp/x"));
        assert_eq!(prefs.default_ttl_hours(), 1.5);
    }
}
