//! Cache Envelope Module
//!
//! The versioned on-disk unit wrapping a cached payload with the metadata
//! needed for TTL expiry and read-side validation. Field names on the wire
//! are the deployed short codes (`v`, `t`, `k`, `ts`, `ttl`, `d`, `c`, `n`);
//! any change to the byte layout requires bumping [`CACHE_FORMAT_VERSION`],
//! since old-version files are treated as unreadable (no migration path).

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Current on-disk format version. Entries written with any other version
/// are rejected on read.
pub const CACHE_FORMAT_VERSION: u32 = 2;

/// Milliseconds per TTL hour.
pub const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// On-disk envelope for a single cached entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEnvelope<T> {
    /// Format version; must equal [`CACHE_FORMAT_VERSION`] to be readable
    #[serde(rename = "v")]
    pub format_version: u32,
    /// Logical category of the payload (e.g. "references", "cited-by")
    #[serde(rename = "t")]
    pub record_type: String,
    /// Caller-supplied logical identifier, stored unsanitized
    #[serde(rename = "k")]
    pub key: String,
    /// Wall-clock write timestamp in epoch milliseconds; TTL is evaluated
    /// against this, never against filesystem mtime
    #[serde(rename = "ts")]
    pub written_at_millis: i64,
    /// TTL in hours; `<= 0` means the entry never expires
    #[serde(rename = "ttl")]
    pub ttl_hours: f64,
    /// The cached value
    #[serde(rename = "d")]
    pub payload: T,
    /// False for an entry written mid-operation; such entries are garbage
    #[serde(rename = "c")]
    pub complete: bool,
    /// Optional upstream total count for truncated-result detection
    #[serde(rename = "n", default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
}

impl<T> CacheEnvelope<T> {
    /// Create a complete envelope stamped with the current wall-clock time
    pub fn new(
        record_type: &str,
        key: &str,
        ttl_hours: f64,
        payload: T,
        total_count: Option<u64>,
    ) -> Self {
        Self {
            format_version: CACHE_FORMAT_VERSION,
            record_type: record_type.to_string(),
            key: key.to_string(),
            written_at_millis: Utc::now().timestamp_millis(),
            ttl_hours,
            payload,
            complete: true,
            total_count,
        }
    }

    /// Age of the entry in milliseconds at the given wall-clock instant
    pub fn age_millis(&self, now_millis: i64) -> i64 {
        now_millis - self.written_at_millis
    }

    /// Whether the TTL has elapsed at the given wall-clock instant
    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.ttl_hours > 0.0 && self.age_millis(now_millis) as f64 > self.ttl_hours * MILLIS_PER_HOUR
    }

    /// Age in whole hours, rounded to the nearest hour
    pub fn age_hours(&self, now_millis: i64) -> i64 {
        (self.age_millis(now_millis) as f64 / MILLIS_PER_HOUR).round() as i64
    }
}
