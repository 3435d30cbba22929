use plextube::cache::{CacheStore, JsonCacheStore, MetadataCache, Resolution, VideoMetadata};
use plextube::extract::VideoId;
use plextube::provider::{MetadataProvider, ProviderError};
use std::fs;
use tempfile::tempdir;

fn sample(title: &str) -> VideoMetadata {
    VideoMetadata {
        title: title.to_string(),
        channel_name: "Channel".to_string(),
        description: "A description".to_string(),
        published_at: "2023-01-15T10:00:00Z".to_string(),
    }
}

struct SingleAnswer(VideoMetadata);

impl MetadataProvider for SingleAnswer {
    fn lookup_by_id(&self, _id: &VideoId) -> Result<VideoMetadata, ProviderError> {
        Ok(self.0.clone())
    }
}

#[test]
fn test_flush_then_load_round_trips_every_entry() {
    let dir = tempdir().unwrap();
    let store = JsonCacheStore::new(dir.path().join("metadata_cache.json"));

    let mut cache = MetadataCache::new();
    cache.insert(VideoId::new("AAAAAAAAAAA"), sample("First"));
    cache.insert(VideoId::new("BBBBBBBBBBB"), sample("Second"));
    cache.insert(VideoId::new("CCCCCCCCCCC"), sample("Third"));
    store.flush(&cache);

    let reloaded = store.load();
    assert_eq!(reloaded, cache);
    assert_eq!(
        reloaded
            .get(&VideoId::new("BBBBBBBBBBB"))
            .map(|m| m.title.as_str()),
        Some("Second")
    );
}

#[test]
fn test_cache_document_is_sorted_and_stable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("metadata_cache.json");
    let store = JsonCacheStore::new(path.clone());

    // Insert out of order; the document should come out sorted by id.
    let mut cache = MetadataCache::new();
    cache.insert(VideoId::new("zzzzzzzzzzz"), sample("Last"));
    cache.insert(VideoId::new("aaaaaaaaaaa"), sample("First"));
    store.flush(&cache);

    let document = fs::read_to_string(&path).unwrap();
    let first = document.find("aaaaaaaaaaa").unwrap();
    let last = document.find("zzzzzzzzzzz").unwrap();
    assert!(first < last);

    // Re-flushing identical content produces an identical document.
    store.flush(&cache);
    assert_eq!(fs::read_to_string(&path).unwrap(), document);
}

#[test]
fn test_resolve_miss_is_durable_after_flush() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("metadata_cache.json");
    let id = VideoId::new("dQw4w9WgXcQ");
    let provider = SingleAnswer(sample("Fetched"));

    let store = JsonCacheStore::new(path.clone());
    let mut cache = store.load();
    match cache.resolve(&id, &provider) {
        Resolution::Fetched(metadata) => assert_eq!(metadata.title, "Fetched"),
        other => panic!("expected a provider fetch, got {other:?}"),
    }
    store.flush(&cache);

    // A fresh store sees the entry and answers without the provider.
    let mut reopened = JsonCacheStore::new(path).load();
    match reopened.resolve(&id, &provider) {
        Resolution::Hit(metadata) => assert_eq!(metadata.title, "Fetched"),
        other => panic!("expected a cache hit, got {other:?}"),
    }
}
