//! Hydration pipeline orchestrator.
//!
//! # Overview
//!
//! Drives the per-item pipeline over a library section:
//! 1. **Identify**: take the video ID from the item's media file name (see [`crate::extract`])
//! 2. **Resolve**: look the ID up in the metadata cache, falling back to the provider (see [`crate::cache`])
//! 3. **Compare**: compose the target title and diff it, the summary, and the
//!    publish date against the item's current record (see [`crate::compose`], [`crate::detect`])
//! 4. **Apply**: write the changed fields back to the media server, or report
//!    them in dry-run mode
//!
//! Single items failing never abort the run; every failure becomes a counter
//! in the final [`RunSummary`]. The in-memory cache is flushed to the store
//! every [`DEFAULT_CHECKPOINT_INTERVAL`] completed items and once more at the
//! end of the run, whichever way the run ends.
//!
//! # Example
//!
//! ```no_run
//! use plextube::cache::JsonCacheStore;
//! use plextube::hydrate::{Hydrator, HydratorConfig};
//! use plextube::provider::YouTubeClient;
//! use plextube::server::PlexClient;
//!
//! let server = PlexClient::new("http://localhost:32400", "plex-token");
//! let provider = YouTubeClient::new("youtube-api-key");
//! let store = JsonCacheStore::new("metadata_cache.json");
//!
//! let hydrator = Hydrator::new(HydratorConfig::default().with_dry_run(true));
//! let summary = hydrator.run(&server, &provider, &store, "7").unwrap();
//! println!("{}", summary.render(true));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use yansi::Paint;

use crate::cache::{CacheStore, MetadataCache, Resolution, VideoMetadata};
use crate::compose;
use crate::detect::{self, Decision};
use crate::extract;
use crate::progress::ProgressCallback;
use crate::provider::MetadataProvider;
use crate::server::{LibraryItem, MediaServer, ServerError};

/// Number of completed items between cache checkpoints.
pub const DEFAULT_CHECKPOINT_INTERVAL: usize = 10;

/// Pause after each live provider call, to bound the request rate.
pub const DEFAULT_PROVIDER_DELAY: Duration = Duration::from_millis(100);

/// Configuration for a hydration run.
#[derive(Clone)]
pub struct HydratorConfig {
    /// Report intended changes without mutating the media server.
    pub dry_run: bool,
    /// Log per-item resolution detail at info level.
    pub verbose: bool,
    /// Flush the cache after this many items complete.
    pub checkpoint_interval: usize,
    /// Sleep inserted after items that hit the provider; cache hits skip it.
    pub provider_delay: Duration,
    /// Optional shutdown flag for graceful termination between items.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl fmt::Debug for HydratorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HydratorConfig")
            .field("dry_run", &self.dry_run)
            .field("verbose", &self.verbose)
            .field("checkpoint_interval", &self.checkpoint_interval)
            .field("provider_delay", &self.provider_delay)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for HydratorConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            verbose: false,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            provider_delay: DEFAULT_PROVIDER_DELAY,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl HydratorConfig {
    /// Enable or disable dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Enable or disable per-item detail logging.
    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Set the checkpoint interval (minimum 1).
    #[must_use]
    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.checkpoint_interval = interval.max(1);
        self
    }

    /// Set the pause inserted after live provider calls.
    #[must_use]
    pub fn with_provider_delay(mut self, delay: Duration) -> Self {
        self.provider_delay = delay;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Library item field a hydration run can rewrite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Summary,
    Date,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title => write!(f, "title"),
            Self::Summary => write!(f, "summary"),
            Self::Date => write!(f, "publish date"),
        }
    }
}

/// A concrete field write, planned from a [`Decision`].
enum FieldUpdate {
    Title(String),
    Summary(String),
    Date(chrono::NaiveDate),
}

impl FieldUpdate {
    fn kind(&self) -> Field {
        match self {
            Self::Title(_) => Field::Title,
            Self::Summary(_) => Field::Summary,
            Self::Date(_) => Field::Date,
        }
    }
}

/// Terminal state of one item's trip through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// All planned field updates were written to the server.
    Applied(Vec<Field>),
    /// Dry run: changes were detected but nothing was written.
    WouldApply(Vec<Field>),
    /// The item already matches the resolved metadata.
    Unchanged,
    /// The item has no media file, or no video ID could be taken from it.
    Unresolvable,
    /// Metadata was available neither in the cache nor from the provider.
    Unavailable,
    /// Some field updates were written before one failed.
    PartiallyApplied { applied: Vec<Field>, error: String },
    /// The first field update already failed; nothing was written.
    Failed { error: String },
}

impl ItemOutcome {
    /// Whether this outcome counts toward the run's failure total.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Unresolvable | Self::Unavailable | Self::PartiallyApplied { .. } | Self::Failed { .. }
        )
    }
}

/// Aggregate counters and timings for one hydration run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items the library reported before processing started.
    pub total_items: usize,
    /// Items that ran the full pipeline (updated, unchanged, or failed mid-apply).
    pub processed: usize,
    /// Items with at least one field applied, or would-apply in dry-run mode.
    pub updated: usize,
    /// Items already matching the resolved metadata.
    pub unchanged: usize,
    /// Items that failed at any stage.
    pub failed: usize,
    pub cache_hits: usize,
    /// Successful live metadata fetches.
    pub provider_calls: usize,
    pub cache_flushes: usize,
    pub duration: Duration,
    /// True when the run stopped early on an abort request.
    pub interrupted: bool,
}

impl RunSummary {
    /// Renders the end-of-run report block.
    #[must_use]
    pub fn render(&self, dry_run: bool) -> String {
        use std::fmt::Write as _;

        let updated = if self.updated > 0 {
            self.updated.green().to_string()
        } else {
            self.updated.to_string()
        };
        let failed = if self.failed > 0 {
            self.failed.red().to_string()
        } else {
            self.failed.to_string()
        };
        let mode = if dry_run {
            "DRY RUN (no changes written)".yellow().to_string()
        } else {
            "LIVE".to_string()
        };

        let rule = "=".repeat(50);
        let mut out = String::new();
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{}", "HYDRATION SUMMARY".bold());
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{:<18}{}", "Items processed:", self.processed);
        let _ = writeln!(out, "{:<18}{}", "Items updated:", updated);
        let _ = writeln!(out, "{:<18}{}", "Already current:", self.unchanged);
        let _ = writeln!(out, "{:<18}{}", "Items failed:", failed);
        let _ = writeln!(out, "{:<18}{}", "Cache hits:", self.cache_hits);
        let _ = writeln!(out, "{:<18}{}", "Provider calls:", self.provider_calls);
        let _ = writeln!(out, "{:<18}{}", "Cache saves:", self.cache_flushes);
        let _ = writeln!(out, "{:<18}{:.1}s", "Elapsed:", self.duration.as_secs_f64());
        let _ = writeln!(out, "{:<18}{}", "Mode:", mode);
        if self.interrupted {
            let _ = writeln!(out, "{}", "Run interrupted before the last item".yellow());
        }
        let _ = write!(out, "{rule}");
        out
    }
}

/// Failures that abort a whole run.
///
/// Everything else is absorbed at the item boundary and reported through
/// [`RunSummary`] counters.
#[derive(Debug, thiserror::Error)]
pub enum HydrateError {
    #[error("failed to list library items: {0}")]
    ListItems(#[from] ServerError),
}

/// Sequential hydration pipeline over one library section.
#[derive(Debug, Default)]
pub struct Hydrator {
    config: HydratorConfig,
}

impl Hydrator {
    /// Creates a hydrator with the given configuration.
    #[must_use]
    pub fn new(config: HydratorConfig) -> Self {
        Self { config }
    }

    /// Creates a hydrator with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(HydratorConfig::default())
    }

    /// Runs the pipeline over every item of the section addressed by
    /// `section_key`.
    ///
    /// Per-item failures are counted, never propagated. The only fatal
    /// failure is the initial item listing; the cache is still flushed
    /// before that error is returned. An abort request stops the loop
    /// between items and yields a summary with `interrupted` set, not an
    /// error.
    pub fn run(
        &self,
        server: &dyn MediaServer,
        provider: &dyn MetadataProvider,
        store: &dyn CacheStore,
        section_key: &str,
    ) -> Result<RunSummary, HydrateError> {
        let started = Instant::now();
        let mut summary = RunSummary::default();
        let mut cache = store.load();
        log::info!("Loaded metadata cache with {} entries", cache.len());

        log::info!("Fetching library items...");
        let items = match server.list_items(section_key) {
            Ok(items) => items,
            Err(err) => {
                self.checkpoint(store, &cache, &mut summary);
                return Err(HydrateError::ListItems(err));
            }
        };
        summary.total_items = items.len();

        if items.is_empty() {
            log::info!("No items found in the library");
            self.checkpoint(store, &cache, &mut summary);
            summary.duration = started.elapsed();
            return Ok(summary);
        }

        log::info!(
            "Hydrating {} items{}",
            items.len(),
            if self.config.dry_run { " (dry run)" } else { "" }
        );
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_start(items.len());
        }

        let interval = self.config.checkpoint_interval.max(1);
        let mut completed = 0usize;
        for (idx, item) in items.iter().enumerate() {
            if self.config.is_shutdown_requested() {
                log::warn!(
                    "Abort requested, stopping after {completed} of {} items",
                    items.len()
                );
                summary.interrupted = true;
                break;
            }
            if let Some(ref callback) = self.config.progress_callback {
                callback.on_item(idx + 1, &item.title);
            }

            let (outcome, live_call) =
                self.process_item(server, provider, &mut cache, item, &mut summary);
            record(&outcome, &mut summary);
            completed += 1;

            if completed % interval == 0 {
                self.checkpoint(store, &cache, &mut summary);
            }
            if live_call && !self.config.provider_delay.is_zero() {
                thread::sleep(self.config.provider_delay);
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_finish();
        }
        self.checkpoint(store, &cache, &mut summary);
        summary.duration = started.elapsed();
        Ok(summary)
    }

    /// Runs one item through identify, resolve, compare, and apply.
    ///
    /// Returns the item's terminal outcome and whether resolution hit the
    /// provider (live calls trigger the courtesy delay even when they fail).
    fn process_item(
        &self,
        server: &dyn MediaServer,
        provider: &dyn MetadataProvider,
        cache: &mut MetadataCache,
        item: &LibraryItem,
        summary: &mut RunSummary,
    ) -> (ItemOutcome, bool) {
        let Some(ref path) = item.file_path else {
            log::warn!("No media file for item '{}'", item.title);
            return (ItemOutcome::Unresolvable, false);
        };
        let Some(id) = extract::video_id(path) else {
            return (ItemOutcome::Unresolvable, false);
        };

        let resolution = cache.resolve(&id, provider);
        let live_call = resolution.required_provider_call();
        let metadata = match resolution {
            Resolution::Hit(metadata) => {
                summary.cache_hits += 1;
                metadata
            }
            Resolution::Fetched(metadata) => {
                summary.provider_calls += 1;
                metadata
            }
            Resolution::Unavailable => return (ItemOutcome::Unavailable, true),
        };

        let new_title = compose::title(&metadata.channel_name, &metadata.title);
        self.log_item_detail(item, id.as_str(), &metadata, &new_title);

        let decision = detect::changes(item, &new_title, &metadata);
        if !decision.any() {
            if self.config.verbose {
                log::info!("No changes needed for '{}'", item.title);
            } else {
                log::debug!("No changes needed for '{}'", item.title);
            }
            return (ItemOutcome::Unchanged, live_call);
        }

        let updates = plan_updates(&decision, new_title, &metadata);
        if self.config.dry_run {
            let fields: Vec<Field> = updates.iter().map(FieldUpdate::kind).collect();
            if !fields.is_empty() {
                log::info!(
                    "Would update {} for '{}' (dry run)",
                    format_fields(&fields),
                    item.title
                );
            }
            return (ItemOutcome::WouldApply(fields), live_call);
        }
        if updates.is_empty() {
            return (ItemOutcome::Unchanged, live_call);
        }
        (apply_updates(server, item, updates), live_call)
    }

    fn log_item_detail(&self, item: &LibraryItem, id: &str, metadata: &VideoMetadata, new_title: &str) {
        if !self.config.verbose {
            log::debug!("'{}' [{id}] -> '{new_title}'", item.title);
            return;
        }
        log::info!("Current: {}", item.title);
        log::info!("Video ID: {id}");
        log::info!("Channel: {}", metadata.channel_name);
        log::info!("New title: {new_title}");
        if !metadata.description.is_empty() {
            log::info!("Description: {}", preview(&metadata.description, 100));
        }
        if let Some(date) = detect::published_date(&metadata.published_at) {
            log::info!("Published: {date}");
            match item.original_date {
                Some(current) => log::info!("Current date: {current}"),
                None => log::info!("Current date: not set"),
            }
        }
    }

    fn checkpoint(&self, store: &dyn CacheStore, cache: &MetadataCache, summary: &mut RunSummary) {
        store.flush(cache);
        summary.cache_flushes += 1;
    }
}

/// Folds an item outcome into the run counters.
fn record(outcome: &ItemOutcome, summary: &mut RunSummary) {
    match outcome {
        ItemOutcome::Applied(_) | ItemOutcome::WouldApply(_) => {
            summary.processed += 1;
            summary.updated += 1;
        }
        ItemOutcome::Unchanged => {
            summary.processed += 1;
            summary.unchanged += 1;
        }
        ItemOutcome::Unresolvable | ItemOutcome::Unavailable => summary.failed += 1,
        ItemOutcome::PartiallyApplied { .. } | ItemOutcome::Failed { .. } => {
            summary.processed += 1;
            summary.failed += 1;
        }
    }
}

/// Turns a change decision into concrete field writes.
///
/// The summary is only written when the new description is non-empty, and
/// the date only when the provider timestamp parses to a calendar date.
fn plan_updates(decision: &Decision, new_title: String, metadata: &VideoMetadata) -> Vec<FieldUpdate> {
    let mut updates = Vec::new();
    if decision.title_changed {
        updates.push(FieldUpdate::Title(new_title));
    }
    if decision.summary_changed && !metadata.description.is_empty() {
        updates.push(FieldUpdate::Summary(metadata.description.clone()));
    }
    if decision.date_changed {
        if let Some(date) = detect::published_date(&metadata.published_at) {
            updates.push(FieldUpdate::Date(date));
        }
    }
    updates
}

/// Writes the planned updates to the server, stopping at the first failure.
///
/// Fields already written stay written; the outcome records how far the
/// apply got.
fn apply_updates(
    server: &dyn MediaServer,
    item: &LibraryItem,
    updates: Vec<FieldUpdate>,
) -> ItemOutcome {
    let mut applied = Vec::new();
    for update in updates {
        let kind = update.kind();
        let result = match &update {
            FieldUpdate::Title(value) => server.set_title(item, value),
            FieldUpdate::Summary(value) => server.set_summary(item, value),
            FieldUpdate::Date(date) => server.set_original_date(item, *date),
        };
        match result {
            Ok(()) => applied.push(kind),
            Err(err) => {
                log::error!("Failed to set {kind} for '{}': {err}", item.title);
                let error = err.to_string();
                return if applied.is_empty() {
                    ItemOutcome::Failed { error }
                } else {
                    ItemOutcome::PartiallyApplied { applied, error }
                };
            }
        }
    }
    log::info!("Updated {} for '{}'", format_fields(&applied), item.title);
    ItemOutcome::Applied(applied)
}

fn format_fields(fields: &[Field]) -> String {
    fields
        .iter()
        .map(Field::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// First `max_chars` characters of `text`, with an ellipsis when trimmed.
fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}...")
}
