//! Durable storage for the cache document.
//!
//! Persistence is strictly best-effort: a run must always be able to
//! proceed without a readable or writable cache file, so [`CacheStore`]
//! exposes infallible `load`/`flush` that log and degrade instead of
//! propagating I/O errors.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::MetadataCache;

/// Default filename of the cache document, kept next to the binary.
pub const CACHE_FILE_NAME: &str = "metadata_cache.json";

/// Persistence seam for the metadata cache.
///
/// The orchestrator only ever talks to this trait, so tests can substitute
/// an in-memory implementation and exercise the read-through and
/// checkpoint contracts without touching the filesystem.
pub trait CacheStore {
    /// Reads the persisted mapping.
    ///
    /// A missing or malformed document yields an empty cache; neither is
    /// an error.
    fn load(&self) -> MetadataCache;

    /// Writes the full mapping to durable storage.
    ///
    /// Failures are logged and swallowed; losing a checkpoint never stops
    /// the pipeline.
    fn flush(&self, cache: &MetadataCache);
}

/// File-backed store holding one pretty-printed JSON document.
#[derive(Debug, Clone)]
pub struct JsonCacheStore {
    path: PathBuf,
}

impl JsonCacheStore {
    /// Creates a store backed by the document at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<MetadataCache> {
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read cache file: {}", self.path.display()))?;
        let cache = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse cache file: {}", self.path.display()))?;
        Ok(cache)
    }

    fn write(&self, cache: &MetadataCache) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create cache directory: {}", parent.display())
                })?;
            }
        }
        let json =
            serde_json::to_string_pretty(cache).context("Failed to serialize cache document")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write cache file: {}", self.path.display()))?;
        Ok(())
    }
}

impl CacheStore for JsonCacheStore {
    fn load(&self) -> MetadataCache {
        if !self.path.exists() {
            log::info!(
                "No cache file at {}; starting with an empty cache",
                self.path.display()
            );
            return MetadataCache::new();
        }
        match self.read() {
            Ok(cache) => {
                log::info!(
                    "Loaded metadata cache with {} entries from {}",
                    cache.len(),
                    self.path.display()
                );
                cache
            }
            Err(err) => {
                log::warn!("Failed to load cache file: {err:#}. Starting with an empty cache.");
                MetadataCache::new()
            }
        }
    }

    fn flush(&self, cache: &MetadataCache) {
        match self.write(cache) {
            Ok(()) => log::debug!(
                "Saved metadata cache with {} entries to {}",
                cache.len(),
                self.path.display()
            ),
            Err(err) => log::warn!("Failed to save cache file: {err:#}"),
        }
    }
}

/// Store that persists nothing; backs the `--no-cache` mode.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCacheStore;

impl CacheStore for NullCacheStore {
    fn load(&self) -> MetadataCache {
        MetadataCache::new()
    }

    fn flush(&self, _cache: &MetadataCache) {}
}
