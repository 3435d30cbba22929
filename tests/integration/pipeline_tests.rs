use chrono::NaiveDate;
use plextube::cache::{CacheStore, JsonCacheStore, MetadataCache, VideoMetadata};
use plextube::extract::VideoId;
use plextube::hydrate::{Hydrator, HydratorConfig};
use plextube::provider::{MetadataProvider, ProviderError};
use plextube::server::{LibraryItem, MediaServer, ServerError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

/// In-memory library that applies mutations to its own items, so a second
/// run sees the state the first run produced.
#[derive(Default)]
struct FakeServer {
    items: RefCell<Vec<LibraryItem>>,
    mutation_log: RefCell<Vec<String>>,
    fail_summary_for: Option<String>,
    fail_listing: bool,
}

impl FakeServer {
    fn new(items: Vec<LibraryItem>) -> Self {
        FakeServer {
            items: RefCell::new(items),
            ..FakeServer::default()
        }
    }

    fn mutation_count(&self) -> usize {
        self.mutation_log.borrow().len()
    }

    fn title_of(&self, rating_key: &str) -> String {
        self.items
            .borrow()
            .iter()
            .find(|item| item.rating_key == rating_key)
            .map(|item| item.title.clone())
            .unwrap()
    }

    fn apply(&self, rating_key: &str, change: impl FnOnce(&mut LibraryItem)) {
        let mut items = self.items.borrow_mut();
        if let Some(item) = items.iter_mut().find(|i| i.rating_key == rating_key) {
            change(item);
        }
    }
}

impl MediaServer for FakeServer {
    fn list_items(&self, _section_key: &str) -> Result<Vec<LibraryItem>, ServerError> {
        if self.fail_listing {
            return Err(ServerError::Transport("connection reset".to_string()));
        }
        Ok(self.items.borrow().clone())
    }

    fn set_title(&self, item: &LibraryItem, title: &str) -> Result<(), ServerError> {
        self.mutation_log
            .borrow_mut()
            .push(format!("title:{}", item.rating_key));
        let title = title.to_string();
        self.apply(&item.rating_key, |i| i.title = title);
        Ok(())
    }

    fn set_summary(&self, item: &LibraryItem, summary: &str) -> Result<(), ServerError> {
        if self.fail_summary_for.as_deref() == Some(item.rating_key.as_str()) {
            return Err(ServerError::Status {
                status: 500,
                operation: "update the summary",
            });
        }
        self.mutation_log
            .borrow_mut()
            .push(format!("summary:{}", item.rating_key));
        let summary = summary.to_string();
        self.apply(&item.rating_key, |i| i.summary = summary);
        Ok(())
    }

    fn set_original_date(&self, item: &LibraryItem, date: NaiveDate) -> Result<(), ServerError> {
        self.mutation_log
            .borrow_mut()
            .push(format!("date:{}", item.rating_key));
        self.apply(&item.rating_key, |i| i.original_date = Some(date));
        Ok(())
    }
}

struct FakeProvider {
    responses: HashMap<String, VideoMetadata>,
    calls: RefCell<Vec<String>>,
    quota_exhausted: bool,
}

impl FakeProvider {
    fn new(responses: HashMap<String, VideoMetadata>) -> Self {
        FakeProvider {
            responses,
            calls: RefCell::new(Vec::new()),
            quota_exhausted: false,
        }
    }

    fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }
}

impl MetadataProvider for FakeProvider {
    fn lookup_by_id(&self, id: &VideoId) -> Result<VideoMetadata, ProviderError> {
        self.calls.borrow_mut().push(id.to_string());
        if self.quota_exhausted {
            return Err(ProviderError::QuotaExceeded);
        }
        self.responses
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.clone()))
    }
}

/// Provider that requests shutdown once it has served a set number of
/// lookups, simulating Ctrl+C arriving in the middle of a run.
struct TrippingProvider {
    inner: FakeProvider,
    flag: Arc<AtomicBool>,
    trip_after: usize,
}

impl MetadataProvider for TrippingProvider {
    fn lookup_by_id(&self, id: &VideoId) -> Result<VideoMetadata, ProviderError> {
        let result = self.inner.lookup_by_id(id);
        if self.inner.call_count() >= self.trip_after {
            self.flag.store(true, Ordering::SeqCst);
        }
        result
    }
}

/// Store that keeps every flushed snapshot, for asserting checkpoint cadence.
#[derive(Default)]
struct SnapshotStore {
    flushes: RefCell<Vec<MetadataCache>>,
}

impl CacheStore for SnapshotStore {
    fn load(&self) -> MetadataCache {
        self.flushes.borrow().last().cloned().unwrap_or_default()
    }

    fn flush(&self, cache: &MetadataCache) {
        self.flushes.borrow_mut().push(cache.clone());
    }
}

fn video_id(n: usize) -> String {
    format!("{n:011}")
}

fn library_item(n: usize) -> LibraryItem {
    LibraryItem {
        rating_key: n.to_string(),
        title: format!("raw upload {n}"),
        summary: String::new(),
        original_date: None,
        file_path: Some(PathBuf::from(format!("/media/upload [{}].mp4", video_id(n)))),
    }
}

fn video_metadata(n: usize) -> VideoMetadata {
    VideoMetadata {
        title: format!("Video {n}"),
        channel_name: "Channel".to_string(),
        description: format!("Description of video {n}"),
        published_at: "2023-06-01T12:00:00Z".to_string(),
    }
}

fn library_of(count: usize) -> (Vec<LibraryItem>, HashMap<String, VideoMetadata>) {
    let items = (1..=count).map(library_item).collect();
    let responses = (1..=count)
        .map(|n| (video_id(n), video_metadata(n)))
        .collect();
    (items, responses)
}

fn quick_config() -> HydratorConfig {
    HydratorConfig::default().with_provider_delay(Duration::ZERO)
}

fn stored_cache(path: &Path) -> MetadataCache {
    JsonCacheStore::new(path.to_path_buf()).load()
}

#[test]
fn test_full_run_hydrates_every_stale_item() {
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("metadata_cache.json");
    let (items, responses) = library_of(5);
    let server = FakeServer::new(items);
    let provider = FakeProvider::new(responses);
    let store = JsonCacheStore::new(cache_path.clone());

    let summary = Hydrator::new(quick_config())
        .run(&server, &provider, &store, "1")
        .unwrap();

    assert_eq!(summary.total_items, 5);
    assert_eq!(summary.processed, 5);
    assert_eq!(summary.updated, 5);
    assert_eq!(summary.unchanged, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.provider_calls, 5);
    assert_eq!(summary.cache_hits, 0);
    assert!(!summary.interrupted);

    // Title, summary and date were all written back.
    assert_eq!(server.title_of("3"), "Channel - Video 3");
    assert_eq!(server.mutation_count(), 15);

    // Every resolved id reached the durable cache.
    assert_eq!(stored_cache(&cache_path).len(), 5);
}

#[test]
fn test_second_run_is_idempotent() {
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("metadata_cache.json");
    let (items, responses) = library_of(4);
    let server = FakeServer::new(items);
    let store = JsonCacheStore::new(cache_path);

    let first_provider = FakeProvider::new(responses.clone());
    let first = Hydrator::new(quick_config())
        .run(&server, &first_provider, &store, "1")
        .unwrap();
    assert_eq!(first.updated, 4);
    let mutations_after_first = server.mutation_count();

    let second_provider = FakeProvider::new(responses);
    let second = Hydrator::new(quick_config())
        .run(&server, &second_provider, &store, "1")
        .unwrap();

    assert_eq!(second.updated, 0);
    assert_eq!(second.unchanged, 4);
    assert_eq!(second.failed, 0);
    // Everything came from the on-disk cache, nothing was written again.
    assert_eq!(second.cache_hits, 4);
    assert_eq!(second_provider.call_count(), 0);
    assert_eq!(server.mutation_count(), mutations_after_first);
}

#[test]
fn test_mutation_failure_on_one_item_does_not_abort_the_run() {
    let dir = tempdir().unwrap();
    let (items, responses) = library_of(10);
    let mut server = FakeServer::new(items);
    server.fail_summary_for = Some("5".to_string());
    let provider = FakeProvider::new(responses);
    let store = JsonCacheStore::new(dir.path().join("metadata_cache.json"));

    let summary = Hydrator::new(quick_config())
        .run(&server, &provider, &store, "1")
        .unwrap();

    assert_eq!(summary.processed, 10);
    assert_eq!(summary.updated, 9);
    assert_eq!(summary.failed, 1);
    // The title write for item 5 landed before the summary write failed.
    assert!(server
        .mutation_log
        .borrow()
        .contains(&"title:5".to_string()));
    assert_eq!(server.title_of("5"), "Channel - Video 5");
}

#[test]
fn test_checkpoint_written_every_ten_items_and_at_the_end() {
    let (items, responses) = library_of(23);
    let server = FakeServer::new(items);
    let provider = FakeProvider::new(responses);
    let store = SnapshotStore::default();

    let summary = Hydrator::new(quick_config())
        .run(&server, &provider, &store, "1")
        .unwrap();

    assert_eq!(summary.processed, 23);
    assert_eq!(summary.cache_flushes, 3);
    let flushes = store.flushes.borrow();
    assert_eq!(flushes.len(), 3);
    assert_eq!(flushes[0].len(), 10);
    assert_eq!(flushes[1].len(), 20);
    assert_eq!(flushes[2].len(), 23);
}

#[test]
fn test_failed_lookup_is_retried_on_the_next_run() {
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("metadata_cache.json");
    let (items, mut responses) = library_of(2);
    let missing_id = video_id(2);
    responses.remove(&missing_id);
    let server = FakeServer::new(items);
    let store = JsonCacheStore::new(cache_path.clone());

    let first_provider = FakeProvider::new(responses.clone());
    let first = Hydrator::new(quick_config())
        .run(&server, &first_provider, &store, "1")
        .unwrap();
    assert_eq!(first.failed, 1);
    assert_eq!(first.provider_calls, 1);

    // Only the successful lookup was cached.
    let cached = stored_cache(&cache_path);
    assert_eq!(cached.len(), 1);
    assert!(!cached.contains(&VideoId::new(missing_id.clone())));

    // The unresolved id goes back to the provider next time around.
    let second_provider = FakeProvider::new(responses);
    Hydrator::new(quick_config())
        .run(&server, &second_provider, &store, "1")
        .unwrap();
    assert_eq!(second_provider.calls.borrow().as_slice(), [missing_id]);
}

#[test]
fn test_dry_run_resolves_but_writes_nothing_to_the_server() {
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("metadata_cache.json");
    let (items, responses) = library_of(3);
    let server = FakeServer::new(items);
    let provider = FakeProvider::new(responses);
    let store = JsonCacheStore::new(cache_path.clone());

    let summary = Hydrator::new(quick_config().with_dry_run(true))
        .run(&server, &provider, &store, "1")
        .unwrap();

    assert_eq!(summary.updated, 3);
    assert_eq!(server.mutation_count(), 0);
    assert_eq!(server.title_of("2"), "raw upload 2");
    // Lookups still happen and still land in the cache.
    assert_eq!(stored_cache(&cache_path).len(), 3);
}

#[test]
fn test_items_without_recognizable_ids_are_skipped_not_fatal() {
    let dir = tempdir().unwrap();
    let (mut items, responses) = library_of(1);
    items.push(LibraryItem {
        rating_key: "90".to_string(),
        title: "no file".to_string(),
        summary: String::new(),
        original_date: None,
        file_path: None,
    });
    items.push(LibraryItem {
        rating_key: "91".to_string(),
        title: "opaque file".to_string(),
        summary: String::new(),
        original_date: None,
        file_path: Some(PathBuf::from("/media/holiday_footage.mp4")),
    });
    let server = FakeServer::new(items);
    let provider = FakeProvider::new(responses);
    let store = JsonCacheStore::new(dir.path().join("metadata_cache.json"));

    let summary = Hydrator::new(quick_config())
        .run(&server, &provider, &store, "1")
        .unwrap();

    assert_eq!(summary.total_items, 3);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.failed, 2);
}

#[test]
fn test_quota_errors_are_not_cached() {
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("metadata_cache.json");
    let (items, responses) = library_of(2);
    let server = FakeServer::new(items);
    let store = JsonCacheStore::new(cache_path.clone());

    let mut exhausted = FakeProvider::new(responses.clone());
    exhausted.quota_exhausted = true;
    let first = Hydrator::new(quick_config())
        .run(&server, &exhausted, &store, "1")
        .unwrap();
    assert_eq!(first.failed, 2);
    assert_eq!(first.provider_calls, 0);
    assert!(stored_cache(&cache_path).is_empty());

    // Once the quota recovers the same items resolve normally.
    let recovered = FakeProvider::new(responses);
    let second = Hydrator::new(quick_config())
        .run(&server, &recovered, &store, "1")
        .unwrap();
    assert_eq!(second.updated, 2);
    assert_eq!(second.failed, 0);
}

#[test]
fn test_shutdown_mid_run_stops_cleanly_and_saves_the_cache() {
    let dir = tempdir().unwrap();
    let cache_path = dir.path().join("metadata_cache.json");
    let (items, responses) = library_of(10);
    let server = FakeServer::new(items);
    let flag = Arc::new(AtomicBool::new(false));
    let provider = TrippingProvider {
        inner: FakeProvider::new(responses),
        flag: flag.clone(),
        trip_after: 3,
    };
    let store = JsonCacheStore::new(cache_path.clone());

    let config = quick_config().with_shutdown_flag(flag);
    let summary = Hydrator::new(config)
        .run(&server, &provider, &store, "1")
        .unwrap();

    // The item in flight finishes, then the loop stops.
    assert!(summary.interrupted);
    assert_eq!(summary.processed, 3);
    assert_eq!(summary.updated, 3);
    assert_eq!(stored_cache(&cache_path).len(), 3);
}

#[test]
fn test_listing_failure_still_flushes_the_cache() {
    let mut server = FakeServer::new(Vec::new());
    server.fail_listing = true;
    let provider = FakeProvider::new(HashMap::new());
    let store = SnapshotStore::default();

    let result = Hydrator::new(quick_config()).run(&server, &provider, &store, "1");

    assert!(result.is_err());
    assert_eq!(store.flushes.borrow().len(), 1);
}
