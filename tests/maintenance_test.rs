use inspire_cache::{
    codec, paths, CacheEnvelope, HostDataDir, InspireLocalCache, MemoryPreferences,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

const HOUR_MILLIS: i64 = 3_600_000;

fn build_cache(temp: &TempDir) -> (Arc<MemoryPreferences>, InspireLocalCache) {
    let prefs = Arc::new(MemoryPreferences::new());
    let cache = InspireLocalCache::new(
        prefs.clone(),
        Arc::new(HostDataDir::new(temp.path().to_path_buf())),
    );
    (prefs, cache)
}

fn reference_entry(title: &str) -> Value {
    json!({"title": title, "authors": ["X. Author"]})
}

async fn plant(cache: &InspireLocalCache, envelope: &CacheEnvelope<Value>, compressed: bool) {
    cache.init().await;
    let root = cache.cache_dir().await.unwrap();
    let path = paths::resolve_path(&root, &envelope.record_type, &envelope.key, None, compressed);
    tokio::fs::write(&path, codec::encode(envelope, compressed).unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn purge_removes_expired_entries_and_keeps_fresh_ones() {
    let temp = TempDir::new().unwrap();
    let (_prefs, cache) = build_cache(&temp);

    // Fresh permanent entry.
    let permanent = CacheEnvelope::new("references", "keep", 0.0, json!([reference_entry("A")]), None);
    plant(&cache, &permanent, false).await;

    // Expired entry.
    let mut expired = CacheEnvelope::new("cited-by", "drop", 1.0, json!([reference_entry("B")]), None);
    expired.written_at_millis -= 2 * HOUR_MILLIS;
    plant(&cache, &expired, false).await;

    assert_eq!(cache.purge_expired().await, 1);

    let root = cache.cache_dir().await.unwrap();
    assert!(paths::resolve_path(&root, "references", "keep", None, false).exists());
    assert!(!paths::resolve_path(&root, "cited-by", "drop", None, false).exists());
}

#[tokio::test]
async fn purge_removes_undecodable_files() {
    let temp = TempDir::new().unwrap();
    let (_prefs, cache) = build_cache(&temp);
    cache.init().await;
    let root = cache.cache_dir().await.unwrap();

    tokio::fs::write(root.join("references_junk.json"), b"not json")
        .await
        .unwrap();

    assert_eq!(cache.purge_expired().await, 1);
    assert!(!root.join("references_junk.json").exists());
}

#[tokio::test]
async fn purge_ignores_the_completeness_flag() {
    let temp = TempDir::new().unwrap();
    let (_prefs, cache) = build_cache(&temp);

    // Incomplete but fresh: purge leaves it for the read path to clean up.
    let mut incomplete =
        CacheEnvelope::new("references", "partial", 0.0, json!([reference_entry("A")]), None);
    incomplete.complete = false;
    plant(&cache, &incomplete, false).await;

    assert_eq!(cache.purge_expired().await, 0);
    let root = cache.cache_dir().await.unwrap();
    assert!(paths::resolve_path(&root, "references", "partial", None, false).exists());
}

#[tokio::test]
async fn clear_all_removes_only_cache_files_and_reports_the_count() {
    let temp = TempDir::new().unwrap();
    let (prefs, cache) = build_cache(&temp);

    prefs.set_compression_enabled(false);
    for key in ["1", "2"] {
        cache
            .set("references", key, json!([reference_entry("T")]), None, None)
            .await;
    }
    prefs.set_compression_enabled(true);
    cache
        .set("author-profile", "J.Doe.1", json!({"name": "J. Doe"}), None, None)
        .await;
    cache.flush_writes().await;

    let root = cache.cache_dir().await.unwrap();
    tokio::fs::write(root.join("unrelated.txt"), b"keep me")
        .await
        .unwrap();

    assert_eq!(cache.clear_all().await, 3);
    assert!(root.join("unrelated.txt").exists());
    assert!(cache.get("references", "1", None).await.is_none());
}

#[tokio::test]
async fn get_age_reports_hours_since_write() {
    let temp = TempDir::new().unwrap();
    let (_prefs, cache) = build_cache(&temp);

    let mut envelope = CacheEnvelope::new("cited-by", "old", 0.0, json!([reference_entry("A")]), None);
    envelope.written_at_millis -= 5 * HOUR_MILLIS;
    plant(&cache, &envelope, true).await;

    assert_eq!(cache.get_age("cited-by", "old", None).await, 5);
    assert_eq!(cache.get_age("cited-by", "absent", None).await, -1);
}

#[tokio::test]
async fn get_age_reads_whichever_variant_exists() {
    let temp = TempDir::new().unwrap();
    let (_prefs, cache) = build_cache(&temp);

    let mut envelope = CacheEnvelope::new("references", "p", 0.0, json!([reference_entry("A")]), None);
    envelope.written_at_millis -= HOUR_MILLIS;
    plant(&cache, &envelope, false).await;

    assert_eq!(cache.get_age("references", "p", None).await, 1);
}

#[tokio::test]
async fn stats_reflect_disk_contents_and_counters() {
    let temp = TempDir::new().unwrap();
    let (prefs, cache) = build_cache(&temp);

    prefs.set_compression_enabled(true);
    cache
        .set("references", "1", json!([reference_entry("A")]), None, None)
        .await;
    prefs.set_compression_enabled(false);
    cache
        .set("cited-by", "2", json!([reference_entry("B")]), None, None)
        .await;
    cache.flush_writes().await;

    let _ = cache.get("references", "1", None).await;
    let _ = cache.get("references", "missing", None).await;

    let stats = cache.get_stats().await;
    assert_eq!(stats.file_count, 2);
    assert_eq!(stats.compressed_files, 1);
    assert_eq!(stats.uncompressed_files, 1);
    assert!(stats.total_size_bytes > 0);
    assert_eq!(stats.files_by_type.get("references"), Some(&1));
    assert_eq!(stats.files_by_type.get("cited-by"), Some(&1));
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.pending_writes, 0);
}

#[tokio::test]
async fn facade_falls_back_to_the_default_dir_when_the_custom_dir_is_unusable() {
    let temp = TempDir::new().unwrap();
    let (prefs, cache) = build_cache(&temp);

    prefs.set_custom_cache_dir(Some("/proc/no-such-place/cache".to_string()));
    cache
        .set("references", "1", json!([reference_entry("A")]), None, None)
        .await;
    cache.flush_writes().await;

    let root = cache.cache_dir().await.unwrap();
    assert!(root.starts_with(temp.path()));
    assert!(cache.get("references", "1", None).await.is_some());
}
