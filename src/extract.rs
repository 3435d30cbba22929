//! Video identifier extraction from library file paths.
//!
//! Downloaders embed the 11-character video ID in the filename, either in
//! brackets or parentheses (`yt-dlp`'s default output templates) or as an
//! underscore-separated suffix right before the media extension. Only the
//! final path segment is inspected; directory names never contribute an ID.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

/// Length of a video identifier in characters.
pub const ID_LENGTH: usize = 11;

/// Ordered extraction rules. Earlier rules win when a filename satisfies
/// several: brackets first, then parentheses, then the underscore suffix
/// per known extension.
const ID_PATTERNS: [&str; 5] = [
    r"\[([A-Za-z0-9_-]{11})\]",
    r"\(([A-Za-z0-9_-]{11})\)",
    r"_([A-Za-z0-9_-]{11})\.mp4",
    r"_([A-Za-z0-9_-]{11})\.mkv",
    r"_([A-Za-z0-9_-]{11})\.avi",
];

fn patterns() -> &'static [Regex; 5] {
    static PATTERNS: OnceLock<[Regex; 5]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        ID_PATTERNS.map(|pattern| Regex::new(pattern).expect("static ID pattern compiles"))
    })
}

/// An opaque 11-character video identifier.
///
/// The alphabet is `[A-Za-z0-9_-]`. Values produced by [`video_id`] are
/// guaranteed to match it; values loaded from a cache document are taken
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    /// Wraps a raw identifier string without validation.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the video identifier embedded in `path`'s filename.
///
/// Applies the extraction rules in order and returns the first captured
/// token. `None` means no rule matched; this is an expected outcome for
/// items that were not produced by a downloader, and is logged as a
/// warning so unresolvable items can be traced.
#[must_use]
pub fn video_id(path: &Path) -> Option<VideoId> {
    let name = path.file_name()?.to_string_lossy();

    for pattern in patterns() {
        if let Some(captures) = pattern.captures(&name) {
            if let Some(token) = captures.get(1) {
                return Some(VideoId::new(token.as_str()));
            }
        }
    }

    log::warn!("Could not extract a video ID from filename: {name}");
    None
}
