//! Codec Module
//!
//! Serializes envelopes to and from their on-disk byte form, optionally
//! gzip-compressed. Compression is a pure boundary concern: nothing above
//! this layer knows whether a given file is compressed except through the
//! file extension that selected the `compressed` flag.

use crate::envelope::CacheEnvelope;
use crate::{CacheError, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::{Read, Write};

/// Serialize an envelope, gzip-compressing the JSON bytes when requested
pub fn encode<T: Serialize>(envelope: &CacheEnvelope<T>, compressed: bool) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(envelope)?;
    if !compressed {
        return Ok(json);
    }

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(&json)
        .map_err(|e| CacheError::Compression(format!("gzip encode failed: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| CacheError::Compression(format!("gzip finish failed: {}", e)))
}

/// Deserialize an envelope from its on-disk bytes.
///
/// Any failure (malformed JSON, truncated gzip stream) is returned as an
/// error value; callers treat the file as unreadable and delete it.
pub fn decode<T: DeserializeOwned>(bytes: &[u8], compressed: bool) -> Result<CacheEnvelope<T>> {
    if !compressed {
        return Ok(serde_json::from_slice(bytes)?);
    }

    let mut decoder = GzDecoder::new(bytes);
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .map_err(|e| CacheError::Compression(format!("gzip decode failed: {}", e)))?;
    Ok(serde_json::from_slice(&json)?)
}
