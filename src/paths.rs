//! Path Mapper Module
//!
//! Deterministic mapping from (record type, key, sort qualifier, compression
//! flag) to a sanitized file name under the cache root. Pure functions, no
//! I/O, so callers can compute both format-variant paths and probe each.

use std::path::{Path, PathBuf};

/// Extension for uncompressed entries
pub const PLAIN_EXTENSION: &str = ".json";

/// Extension for gzip-compressed entries
pub const COMPRESSED_EXTENSION: &str = ".json.gz";

/// Replace every character outside `[A-Za-z0-9._-]` with `_`.
///
/// Defends against path traversal and invalid filename characters; upstream
/// record identifiers are free-form.
pub fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Reduce a sort qualifier to its alphanumeric characters, `_`-prefixed.
///
/// Returns an empty string when no qualifier is given or nothing survives
/// the stripping.
pub fn sanitize_sort_qualifier(sort: Option<&str>) -> String {
    let stripped: String = sort
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if stripped.is_empty() {
        String::new()
    } else {
        format!("_{}", stripped)
    }
}

/// File name for an entry: `{recordType}_{safeKey}{safeSuffix}{ext}`
pub fn cache_file_name(record_type: &str, key: &str, sort: Option<&str>, compressed: bool) -> String {
    let ext = if compressed { COMPRESSED_EXTENSION } else { PLAIN_EXTENSION };
    format!(
        "{}_{}{}{}",
        record_type,
        sanitize_key(key),
        sanitize_sort_qualifier(sort),
        ext
    )
}

/// Full path for an entry under the resolved cache root
pub fn resolve_path(
    root: &Path,
    record_type: &str,
    key: &str,
    sort: Option<&str>,
    compressed: bool,
) -> PathBuf {
    root.join(cache_file_name(record_type, key, sort, compressed))
}

/// Whether a directory child is one of ours (matches the extension set)
pub fn is_cache_file(path: &Path) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name.ends_with(COMPRESSED_EXTENSION) || name.ends_with(PLAIN_EXTENSION),
        None => false,
    }
}

/// Whether a cache file holds the gzip-compressed form
pub fn path_is_compressed(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| name.ends_with(COMPRESSED_EXTENSION))
        .unwrap_or(false)
}

/// Record type encoded in a cache file name, if the name parses
pub fn record_type_of(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let (record_type, rest) = name.split_once('_')?;
    if record_type.is_empty() || rest.is_empty() {
        return None;
    }
    Some(record_type.to_string())
}
