//! Error Module
//!
//! Defines error types and result types used throughout the cache subsystem.
//! Corrupt-data and missing-file conditions never cross the public cache
//! boundary as errors; they collapse to misses with internal logging.

use thiserror::Error;

/// Main error type for the local cache
#[derive(Error, Debug, Clone)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Compression error: {0}")]
    Compression(String),

    #[error("Directory error: {0}")]
    Directory(String),

    #[error("Corrupt cache entry: {0}")]
    Corrupt(String),

    #[error("Cache is disabled")]
    Disabled,
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Serialization(err.to_string())
    }
}

/// Result type alias for the local cache
pub type Result<T> = std::result::Result<T, CacheError>;
