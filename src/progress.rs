//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements
//! [`ProgressCallback`] to display a visual progress bar while the
//! hydration pipeline walks a library section.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

/// Progress callback for the hydration pipeline.
///
/// Implement this trait to receive progress updates while items are
/// being hydrated.
pub trait ProgressCallback: Send + Sync {
    /// Called once before the first item.
    ///
    /// # Arguments
    ///
    /// * `total` - Total number of items in the library section
    fn on_start(&self, total: usize);

    /// Called as each item starts processing.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `title` - Title of the item being processed
    fn on_item(&self, current: usize, title: &str);

    /// Called after the last item, or when the run stops early.
    fn on_finish(&self);
}

/// Progress reporter using indicatif.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bar will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use plextube::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            quiet,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }
}

impl ProgressCallback for Progress {
    fn on_start(&self, total: usize) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total as u64);
        pb.set_style(Self::style());
        pb.set_message("Hydrating");
        let mut bar = self.bar.lock().unwrap();
        *bar = Some(pb);
    }

    fn on_item(&self, current: usize, title: &str) {
        if self.quiet {
            return;
        }

        if let Some(ref pb) = *self.bar.lock().unwrap() {
            pb.set_position(current as u64);
            pb.set_message(truncate_title(title, 30));
        }
    }

    fn on_finish(&self) {
        if self.quiet {
            return;
        }

        if let Some(pb) = self.bar.lock().unwrap().take() {
            pb.finish_and_clear();
        }
    }
}

/// Truncate a title for display in the progress bar.
fn truncate_title(title: &str, max_chars: usize) -> String {
    if title.chars().count() <= max_chars {
        return title.to_string();
    }

    let head: String = title.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{head}...")
}
