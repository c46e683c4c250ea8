//! Local on-disk response cache for INSPIRE-HEP literature data.
//!
//! Caches API responses (reference lists, citation lists, author profiles,
//! import candidates) as versioned envelopes with TTL expiry, optional gzip
//! compression, read-side integrity validation with self-healing deletion
//! of corrupt entries, and debounced coalesced writes.
//!
//! The cache is a performance layer: it never raises across its public
//! boundary for corrupt data, missing files, or an unavailable directory.
//! Every such condition degrades to a miss or a no-op, at worst forcing a
//! redundant network fetch.

pub mod cache;
pub mod codec;
pub mod config;
pub mod directory;
pub mod envelope;
pub mod error;
pub mod paths;
pub mod validator;
pub mod writer;

pub use cache::{CacheStats, InspireLocalCache};
pub use config::{DataDirResolver, HostDataDir, MemoryPreferences, Preferences};
pub use envelope::{CacheEnvelope, CACHE_FORMAT_VERSION};
pub use error::{CacheError, Result};
pub use validator::{CacheHit, IntegritySampler, ReferenceListSampler};
