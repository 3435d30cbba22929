//! Field-level change detection between a library item and provider metadata.
//!
//! Detection is pure: it compares strings and dates and produces a
//! [`Decision`], leaving all mutation to the orchestrator.

use chrono::{DateTime, NaiveDate, Utc};

use crate::cache::VideoMetadata;
use crate::server::LibraryItem;

/// Which fields of an item differ from the resolved metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Decision {
    pub title_changed: bool,
    pub summary_changed: bool,
    pub date_changed: bool,
}

impl Decision {
    /// True when at least one field differs.
    #[must_use]
    pub fn any(&self) -> bool {
        self.title_changed || self.summary_changed || self.date_changed
    }
}

/// Compares `item` against `metadata` and the freshly composed title.
///
/// Title and summary use exact string inequality (an absent summary counts
/// as empty). The date compares calendar days only: the provider timestamp
/// is normalized to UTC and reduced to a date before comparison, and an
/// unparsable provider timestamp never flags a change.
#[must_use]
pub fn changes(item: &LibraryItem, composed_title: &str, metadata: &VideoMetadata) -> Decision {
    let title_changed = item.title != composed_title;
    let summary_changed = item.summary != metadata.description;

    let date_changed = match published_date(&metadata.published_at) {
        Some(published) => match item.original_date {
            Some(current) => current != published,
            None => true,
        },
        None => false,
    };

    Decision {
        title_changed,
        summary_changed,
        date_changed,
    }
}

/// Reduces a provider publish timestamp to a UTC calendar date.
///
/// Accepts full RFC 3339 timestamps (the provider's usual shape) and bare
/// `YYYY-MM-DD` dates. Returns `None` for empty or unparsable input;
/// unparsable values are logged since they usually mean the provider's
/// payload shape changed.
#[must_use]
pub fn published_date(raw: &str) -> Option<NaiveDate> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc).date_naive());
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(err) => {
            log::warn!("Failed to parse publish date '{raw}': {err}");
            None
        }
    }
}
