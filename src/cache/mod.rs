//! Persistent video metadata cache with read-through resolution.
//!
//! The cache is an in-memory identifier → metadata mapping owned by the
//! orchestrator for the duration of a run. Lookups go through
//! [`MetadataCache::resolve`]: hits short-circuit, misses fetch from the
//! provider and store the result. Failed lookups are never stored, so a
//! transient provider outage cannot be remembered as "no metadata."
//!
//! Durability is handled by a [`CacheStore`], which persists the whole
//! mapping as one JSON document (see [`JsonCacheStore`]).

mod store;

pub use store::{CacheStore, JsonCacheStore, NullCacheStore, CACHE_FILE_NAME};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::extract::VideoId;
use crate::provider::MetadataProvider;

/// Metadata resolved for one video, as stored in the cache document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub description: String,
    /// ISO-8601 timestamp, or empty when the provider supplied none.
    #[serde(default)]
    pub published_at: String,
}

/// Outcome of a read-through lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Served from the cache; no provider call was made.
    Hit(VideoMetadata),
    /// Fetched live from the provider and stored in the cache.
    Fetched(VideoMetadata),
    /// The provider could not supply metadata; nothing was cached.
    Unavailable,
}

impl Resolution {
    /// The resolved metadata, if any.
    #[must_use]
    pub fn metadata(&self) -> Option<&VideoMetadata> {
        match self {
            Self::Hit(metadata) | Self::Fetched(metadata) => Some(metadata),
            Self::Unavailable => None,
        }
    }

    /// True when the provider was actually contacted (successfully or not).
    #[must_use]
    pub fn required_provider_call(&self) -> bool {
        !matches!(self, Self::Hit(_))
    }
}

/// In-memory identifier → metadata mapping.
///
/// A `BTreeMap` keeps key order stable so the persisted document diffs
/// cleanly between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataCache {
    entries: BTreeMap<VideoId, VideoMetadata>,
}

impl MetadataCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pure lookup without side effects.
    #[must_use]
    pub fn get(&self, id: &VideoId) -> Option<&VideoMetadata> {
        self.entries.get(id)
    }

    /// True when `id` has a cached entry.
    #[must_use]
    pub fn contains(&self, id: &VideoId) -> bool {
        self.entries.contains_key(id)
    }

    /// Inserts or replaces the entry for `id`.
    pub fn insert(&mut self, id: VideoId, metadata: VideoMetadata) {
        self.entries.insert(id, metadata);
    }

    /// Read-through lookup.
    ///
    /// On a hit the provider is not contacted. On a miss the provider is
    /// queried; a successful response is stored before returning. Not-found
    /// and transient failures both yield [`Resolution::Unavailable`] and
    /// leave the cache untouched, so a later run can retry.
    pub fn resolve(&mut self, id: &VideoId, provider: &dyn MetadataProvider) -> Resolution {
        if let Some(found) = self.entries.get(id) {
            log::debug!("Cache hit for {id}");
            return Resolution::Hit(found.clone());
        }

        match provider.lookup_by_id(id) {
            Ok(metadata) => {
                log::debug!("Fetched metadata for {id} from provider");
                self.entries.insert(id.clone(), metadata.clone());
                Resolution::Fetched(metadata)
            }
            Err(err) if err.is_transient() => {
                log::error!("Provider lookup failed for {id}: {err}");
                Resolution::Unavailable
            }
            Err(err) => {
                log::warn!("No provider metadata for {id}: {err}");
                Resolution::Unavailable
            }
        }
    }
}
