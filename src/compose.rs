//! Display title composition from provider metadata.
//!
//! Titles are rebuilt as `"{channel} - {title}"` with both halves sanitized
//! so the result renders cleanly in media-server UIs and stays safe for
//! filename-derived contexts. The transform is pure and total.

/// Hard limit on a sanitized string, in characters.
const MAX_CHARS: usize = 200;

/// Where to cut before appending the ellipsis marker.
const TRUNCATE_CHARS: usize = 197;

/// Composes the display title for a video.
///
/// Both inputs are sanitized independently, then joined with `" - "`.
#[must_use]
pub fn title(channel_name: &str, video_title: &str) -> String {
    format!("{} - {}", sanitize(channel_name), sanitize(video_title))
}

/// Sanitizes one metadata string for display.
///
/// Replaces unsafe characters with fixed substitutes, collapses whitespace
/// runs to a single space, trims the ends, and truncates to [`MAX_CHARS`]
/// characters (cutting at [`TRUNCATE_CHARS`] plus an ellipsis marker).
#[must_use]
pub fn sanitize(text: &str) -> String {
    let mut replaced = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '/' | '\\' | '|' => replaced.push('-'),
            ':' => replaced.push_str(" -"),
            '*' | '?' => {}
            '"' => replaced.push('\''),
            '<' => replaced.push('('),
            '>' => replaced.push(')'),
            '\n' | '\r' | '\t' => replaced.push(' '),
            _ => replaced.push(ch),
        }
    }

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() > MAX_CHARS {
        let cut: String = collapsed.chars().take(TRUNCATE_CHARS).collect();
        format!("{cut}...")
    } else {
        collapsed
    }
}
