//! Validator Module
//!
//! Read-side validation of decoded envelopes: format version, completeness,
//! structural integrity sampling, and TTL expiry. Produces a verdict telling
//! the caller whether the entry is usable and whether the backing file
//! should be deleted.
//!
//! Integrity sampling inspects a bounded subset of an ordered payload so a
//! read never costs a full scan of a large reference list, while still
//! catching truncated enrichment passes at the head, tail, and middle of
//! the sequence, the three most likely locations for a partial-write
//! artifact.

use crate::envelope::{CacheEnvelope, CACHE_FORMAT_VERSION};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

/// Case-insensitive title marker left by an enrichment pass that failed
pub const PLACEHOLDER_TITLE: &str = "title unavailable";

/// Case-insensitive author marker left by an enrichment pass that failed
pub const PLACEHOLDER_AUTHOR: &str = "unknown author";

/// How many leading elements get the unconditional structural check
const HEAD_SAMPLE_COUNT: usize = 3;

/// How many elements the midpoint scan inspects before giving up
const MIDPOINT_SCAN_LIMIT: usize = 100;

/// A validated cache entry returned to the caller
#[derive(Debug, Clone)]
pub struct CacheHit {
    /// The cached payload
    pub data: Value,
    /// Entry age in hours, rounded to the nearest hour
    pub age_hours: i64,
    /// Upstream total count recorded at write time, if any
    pub total: Option<u64>,
    /// True when the entry outlived its TTL but was returned anyway
    /// (offline-fallback read)
    pub expired: bool,
}

/// Outcome of validating a decoded envelope
#[derive(Debug)]
pub enum Verdict {
    /// Entry is usable
    Valid(CacheHit),
    /// Entry is not usable; `delete_file` says whether the backing file is
    /// garbage (incomplete or failed integrity) or should be left on disk
    /// (version mismatch, plain TTL expiry)
    Reject { delete_file: bool },
}

/// Structural integrity check over a cached payload.
///
/// Strategy interface so the bounded-sampling rules can be swapped per
/// record family without touching the validation pipeline.
pub trait IntegritySampler: Send + Sync {
    /// Returns false when the payload shows signs of truncation or a
    /// failed enrichment pass
    fn check(&self, payload: &Value) -> bool;
}

/// Default sampler for reference-entry lists.
///
/// Non-sequence payloads pass untouched. For sequences, the first
/// [`HEAD_SAMPLE_COUNT`] elements must be objects carrying an `authors`
/// array and a string `title`. Up to three enrichable elements (those with
/// a non-empty `recordId`) are then located at the head, tail, and
/// midpoint of the sequence and checked for enrichment completeness:
/// a real title and a non-placeholder author list. Elements without a
/// `recordId` are exempt, since they cannot be enriched from the remote
/// source.
pub struct ReferenceListSampler;

impl ReferenceListSampler {
    fn entry_is_well_formed(entry: &Value) -> bool {
        let Some(object) = entry.as_object() else {
            return false;
        };
        let authors_ok = object.get("authors").map(Value::is_array).unwrap_or(false);
        let title_ok = object.get("title").map(Value::is_string).unwrap_or(false);
        authors_ok && title_ok
    }

    fn has_record_id(entry: &Value) -> bool {
        match entry.get("recordId") {
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Null) | None => false,
            Some(_) => true,
        }
    }

    fn author_is_placeholder(author: &Value) -> bool {
        author
            .as_str()
            .map(|s| s.trim().eq_ignore_ascii_case(PLACEHOLDER_AUTHOR))
            .unwrap_or(false)
    }

    /// Enrichment-completeness check for an element known to carry a
    /// `recordId`
    fn entry_is_enriched(entry: &Value) -> bool {
        let title_ok = entry
            .get("title")
            .and_then(Value::as_str)
            .map(|t| !t.is_empty() && !t.trim().eq_ignore_ascii_case(PLACEHOLDER_TITLE))
            .unwrap_or(false);
        if !title_ok {
            return false;
        }

        match entry.get("authors").and_then(Value::as_array) {
            Some(authors) if authors.is_empty() => false,
            Some(authors) if authors.len() == 1 && Self::author_is_placeholder(&authors[0]) => false,
            Some(_) => true,
            None => false,
        }
    }
}

impl IntegritySampler for ReferenceListSampler {
    fn check(&self, payload: &Value) -> bool {
        let Some(entries) = payload.as_array() else {
            return true;
        };
        if entries.is_empty() {
            return true;
        }

        for (index, entry) in entries.iter().take(HEAD_SAMPLE_COUNT).enumerate() {
            if !Self::entry_is_well_formed(entry) {
                debug!("Integrity sample failed structural check: index={}", index);
                return false;
            }
        }

        // Up to three enrichable elements: first, last, and one from a
        // bounded window at the midpoint. The same element may be sampled
        // twice for short sequences; the check is idempotent.
        let first = entries.iter().find(|e| Self::has_record_id(e));
        let last = entries.iter().rev().find(|e| Self::has_record_id(e));
        let midpoint = entries
            .iter()
            .skip(entries.len() / 2)
            .take(MIDPOINT_SCAN_LIMIT)
            .find(|e| Self::has_record_id(e));

        for sample in [first, last, midpoint].into_iter().flatten() {
            if !Self::entry_is_enriched(sample) {
                debug!("Integrity sample failed enrichment check");
                return false;
            }
        }
        true
    }
}

/// Validate a decoded envelope against version, completeness, integrity,
/// and TTL rules.
///
/// `ignore_ttl` enables the offline-fallback read: an expired entry is
/// returned flagged instead of rejected. Expiry never marks the file for
/// deletion; only `purge_expired` removes expired files.
pub fn validate(
    envelope: CacheEnvelope<Value>,
    ignore_ttl: bool,
    sampler: &dyn IntegritySampler,
) -> Verdict {
    validate_at(envelope, ignore_ttl, sampler, Utc::now().timestamp_millis())
}

/// [`validate`] against an explicit wall-clock instant
pub fn validate_at(
    envelope: CacheEnvelope<Value>,
    ignore_ttl: bool,
    sampler: &dyn IntegritySampler,
    now_millis: i64,
) -> Verdict {
    if envelope.format_version != CACHE_FORMAT_VERSION {
        // A newer format written by a future version of the tool may land
        // here; the file stays on disk.
        warn!(
            "Cache entry version mismatch: type={}, key={}, found={}, expected={}",
            envelope.record_type, envelope.key, envelope.format_version, CACHE_FORMAT_VERSION
        );
        return Verdict::Reject { delete_file: false };
    }

    if !envelope.complete {
        warn!(
            "Incomplete cache entry from an interrupted write: type={}, key={}",
            envelope.record_type, envelope.key
        );
        return Verdict::Reject { delete_file: true };
    }

    if !sampler.check(&envelope.payload) {
        warn!(
            "Cache entry failed integrity sampling: type={}, key={}",
            envelope.record_type, envelope.key
        );
        return Verdict::Reject { delete_file: true };
    }

    let expired = envelope.is_expired(now_millis);
    if expired && !ignore_ttl {
        debug!(
            "Cache entry expired: type={}, key={}, age_hours={}",
            envelope.record_type,
            envelope.key,
            envelope.age_hours(now_millis)
        );
        return Verdict::Reject { delete_file: false };
    }

    Verdict::Valid(CacheHit {
        age_hours: envelope.age_hours(now_millis),
        total: envelope.total_count,
        expired,
        data: envelope.payload,
    })
}
