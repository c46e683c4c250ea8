use inspire_cache::{
    codec, paths, CacheEnvelope, HostDataDir, InspireLocalCache, MemoryPreferences,
    CACHE_FORMAT_VERSION,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

const HOUR_MILLIS: i64 = 3_600_000;

fn build_cache(temp: &TempDir) -> InspireLocalCache {
    InspireLocalCache::new(
        Arc::new(MemoryPreferences::new()),
        Arc::new(HostDataDir::new(temp.path().to_path_buf())),
    )
}

fn good_entry(i: usize) -> Value {
    json!({
        "title": format!("Paper {}", i),
        "authors": ["A. Author"],
        "recordId": format!("{}", 1000 + i),
    })
}

/// Write an envelope straight to disk, bypassing the coalescer, so tests
/// can plant entries with arbitrary metadata.
async fn plant(
    cache: &InspireLocalCache,
    envelope: &CacheEnvelope<Value>,
    sort: Option<&str>,
    compressed: bool,
) -> PathBuf {
    cache.init().await;
    let root = cache.cache_dir().await.unwrap();
    let path = paths::resolve_path(&root, &envelope.record_type, &envelope.key, sort, compressed);
    tokio::fs::write(&path, codec::encode(envelope, compressed).unwrap())
        .await
        .unwrap();
    path
}

#[tokio::test]
async fn incomplete_entry_is_a_miss_and_the_file_is_deleted() {
    let temp = TempDir::new().unwrap();
    let cache = build_cache(&temp);

    let mut envelope = CacheEnvelope::new("references", "1", 0.0, json!([good_entry(0)]), None);
    envelope.complete = false;
    let path = plant(&cache, &envelope, None, false).await;

    assert!(cache.get("references", "1", None).await.is_none());
    assert!(!path.exists());
}

#[tokio::test]
async fn stale_version_entry_is_a_miss_but_the_file_survives() {
    let temp = TempDir::new().unwrap();
    let cache = build_cache(&temp);

    let mut envelope = CacheEnvelope::new("references", "2", 0.0, json!([good_entry(0)]), None);
    envelope.format_version = CACHE_FORMAT_VERSION - 1;
    let path = plant(&cache, &envelope, None, false).await;

    assert!(cache.get("references", "2", None).await.is_none());
    assert!(path.exists());
}

#[tokio::test]
async fn corrupt_bytes_are_a_miss_and_the_file_is_deleted() {
    let temp = TempDir::new().unwrap();
    let cache = build_cache(&temp);
    cache.init().await;
    let root = cache.cache_dir().await.unwrap();

    let path = paths::resolve_path(&root, "references", "3", None, false);
    tokio::fs::write(&path, b"{definitely not json").await.unwrap();

    assert!(cache.get("references", "3", None).await.is_none());
    assert!(!path.exists());
}

#[tokio::test]
async fn truncated_gzip_falls_through_to_the_plain_variant() {
    let temp = TempDir::new().unwrap();
    let cache = build_cache(&temp);

    let envelope = CacheEnvelope::new("references", "4", 0.0, json!([good_entry(0)]), None);
    let plain_path = plant(&cache, &envelope, None, false).await;

    let root = cache.cache_dir().await.unwrap();
    let gz_path = paths::resolve_path(&root, "references", "4", None, true);
    let mut gz_bytes = codec::encode(&envelope, true).unwrap();
    gz_bytes.truncate(gz_bytes.len() / 2);
    tokio::fs::write(&gz_path, &gz_bytes).await.unwrap();

    let hit = cache.get("references", "4", None).await.unwrap();
    assert_eq!(hit.data, json!([good_entry(0)]));
    assert!(!gz_path.exists());
    assert!(plain_path.exists());
}

#[tokio::test]
async fn forged_enrichment_is_a_miss_and_the_file_is_deleted() {
    let temp = TempDir::new().unwrap();
    let cache = build_cache(&temp);

    let mut entries: Vec<Value> = (0..10).map(good_entry).collect();
    entries[9] = json!({
        "title": "Title unavailable",
        "authors": ["A. Author"],
        "recordId": "1009",
    });
    let envelope = CacheEnvelope::new("references", "5", 0.0, json!(entries), None);
    let path = plant(&cache, &envelope, None, false).await;

    assert!(cache.get("references", "5", None).await.is_none());
    assert!(!path.exists());
}

#[tokio::test]
async fn the_same_sequence_with_a_real_title_passes() {
    let temp = TempDir::new().unwrap();
    let cache = build_cache(&temp);

    let entries: Vec<Value> = (0..10).map(good_entry).collect();
    let envelope = CacheEnvelope::new("references", "6", 0.0, json!(entries.clone()), None);
    let path = plant(&cache, &envelope, None, false).await;

    let hit = cache.get("references", "6", None).await.unwrap();
    assert_eq!(hit.data, json!(entries));
    assert!(path.exists());
}

#[tokio::test]
async fn sequences_without_record_ids_pass_regardless_of_placeholders() {
    let temp = TempDir::new().unwrap();
    let cache = build_cache(&temp);

    let entries = json!([
        {"title": "Title unavailable", "authors": []},
        {"title": "", "authors": ["Unknown Author"]},
    ]);
    let envelope = CacheEnvelope::new("references", "7", 0.0, entries.clone(), None);
    plant(&cache, &envelope, None, false).await;

    let hit = cache.get("references", "7", None).await.unwrap();
    assert_eq!(hit.data, entries);
}

#[tokio::test]
async fn expired_entry_is_a_miss_but_the_file_survives() {
    let temp = TempDir::new().unwrap();
    let cache = build_cache(&temp);

    let mut envelope = CacheEnvelope::new("cited-by", "8", 1.0, json!([good_entry(0)]), None);
    envelope.written_at_millis -= 2 * HOUR_MILLIS;
    let path = plant(&cache, &envelope, None, false).await;

    assert!(cache.get("cited-by", "8", None).await.is_none());
    assert!(path.exists());
}

#[tokio::test]
async fn expired_entry_is_returned_flagged_on_the_offline_fallback_path() {
    let temp = TempDir::new().unwrap();
    let cache = build_cache(&temp);

    let mut envelope = CacheEnvelope::new("cited-by", "9", 1.0, json!([good_entry(0)]), Some(3));
    envelope.written_at_millis -= 5 * HOUR_MILLIS;
    let path = plant(&cache, &envelope, None, false).await;

    let hit = cache.get_allow_expired("cited-by", "9", None).await.unwrap();
    assert!(hit.expired);
    assert_eq!(hit.age_hours, 5);
    assert_eq!(hit.total, Some(3));
    assert!(path.exists());
}

#[tokio::test]
async fn permanent_entries_are_returned_at_any_age() {
    let temp = TempDir::new().unwrap();
    let cache = build_cache(&temp);

    let mut envelope = CacheEnvelope::new("references", "10", 0.0, json!([good_entry(0)]), None);
    envelope.written_at_millis -= 10_000 * HOUR_MILLIS;
    plant(&cache, &envelope, None, false).await;

    let hit = cache.get("references", "10", None).await.unwrap();
    assert!(!hit.expired);
    assert_eq!(hit.age_hours, 10_000);
}
