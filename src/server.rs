//! Media server interface and the Plex HTTP client.
//!
//! The pipeline only depends on the [`MediaServer`] trait; [`PlexClient`]
//! is the production implementation speaking Plex's JSON API over blocking
//! HTTP.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// One entry of a media library, as the pipeline sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryItem {
    /// Server-side key addressing this item in mutation calls.
    pub rating_key: String,
    pub title: String,
    /// Empty when the server holds no summary for the item.
    pub summary: String,
    pub original_date: Option<NaiveDate>,
    /// Path of the first media part; `None` when the item has no file.
    pub file_path: Option<PathBuf>,
}

/// A named library section on the media server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySection {
    pub key: String,
    pub title: String,
    /// Section content type as reported by the server (movie, show, ...).
    pub kind: String,
}

/// Query and mutation surface of the media server.
///
/// Every mutation is independently callable and independently fallible;
/// the orchestrator decides how to react to partial failure.
pub trait MediaServer {
    /// Lists every item of the section addressed by `section_key`.
    fn list_items(&self, section_key: &str) -> Result<Vec<LibraryItem>, ServerError>;

    fn set_title(&self, item: &LibraryItem, title: &str) -> Result<(), ServerError>;

    fn set_summary(&self, item: &LibraryItem, summary: &str) -> Result<(), ServerError>;

    fn set_original_date(&self, item: &LibraryItem, date: NaiveDate) -> Result<(), ServerError>;
}

/// Failure modes of a media-server request.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The server answered with a non-success status.
    #[error("media server returned HTTP {status} while trying to {operation}")]
    Status { status: u16, operation: &'static str },
    /// Network-level failure (DNS, connect, timeout).
    #[error("media server request failed: {0}")]
    Transport(String),
    /// Response body did not match the expected shape.
    #[error("media server response malformed: {0}")]
    Malformed(String),
}

/// Request timeout for media-server calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking Plex API client.
pub struct PlexClient {
    agent: ureq::Agent,
    base_url: String,
    token: String,
}

impl PlexClient {
    /// Creates a client for the server at `base_url` (trailing slashes are
    /// tolerated) authenticating with `token`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Verifies connectivity and returns the server's advertised name.
    pub fn server_name(&self) -> Result<String, ServerError> {
        let identity: Envelope<ServerIdentity> = self.get_json("/", "identify the server")?;
        Ok(identity.media_container.friendly_name)
    }

    /// Lists all library sections on the server.
    pub fn sections(&self) -> Result<Vec<LibrarySection>, ServerError> {
        let body: Envelope<SectionContainer> =
            self.get_json("/library/sections", "list library sections")?;
        Ok(body
            .media_container
            .directories
            .into_iter()
            .map(|section| LibrarySection {
                key: section.key,
                title: section.title,
                kind: section.kind,
            })
            .collect())
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        operation: &'static str,
    ) -> Result<T, ServerError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .agent
            .get(&url)
            .set("Accept", "application/json")
            .set("X-Plex-Token", &self.token)
            .call()
            .map_err(|err| request_error(err, operation))?;
        response
            .into_json()
            .map_err(|err| ServerError::Malformed(err.to_string()))
    }

    fn put_field(
        &self,
        item: &LibraryItem,
        operation: &'static str,
        field: &str,
        value: &str,
    ) -> Result<(), ServerError> {
        let url = format!("{}/library/metadata/{}", self.base_url, item.rating_key);
        self.agent
            .put(&url)
            .set("X-Plex-Token", &self.token)
            .query(&format!("{field}.value"), value)
            .query(&format!("{field}.locked"), "1")
            .call()
            .map(|_| ())
            .map_err(|err| request_error(err, operation))
    }
}

impl MediaServer for PlexClient {
    fn list_items(&self, section_key: &str) -> Result<Vec<LibraryItem>, ServerError> {
        let path = format!("/library/sections/{section_key}/all");
        let body: Envelope<ItemContainer> = self.get_json(&path, "list library items")?;
        let items: Vec<LibraryItem> = body
            .media_container
            .metadata
            .into_iter()
            .map(ItemEntry::into_item)
            .collect();
        log::debug!("Listed {} items from section {section_key}", items.len());
        Ok(items)
    }

    fn set_title(&self, item: &LibraryItem, title: &str) -> Result<(), ServerError> {
        self.put_field(item, "set the title", "title", title)
    }

    fn set_summary(&self, item: &LibraryItem, summary: &str) -> Result<(), ServerError> {
        self.put_field(item, "set the summary", "summary", summary)
    }

    fn set_original_date(&self, item: &LibraryItem, date: NaiveDate) -> Result<(), ServerError> {
        let value = date.format("%Y-%m-%d").to_string();
        self.put_field(
            item,
            "set the originally-available date",
            "originallyAvailableAt",
            &value,
        )
    }
}

fn request_error(err: ureq::Error, operation: &'static str) -> ServerError {
    match err {
        ureq::Error::Status(status, _) => ServerError::Status { status, operation },
        ureq::Error::Transport(transport) => ServerError::Transport(transport.to_string()),
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "MediaContainer")]
    media_container: T,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ServerIdentity {
    friendly_name: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SectionContainer {
    #[serde(rename = "Directory")]
    directories: Vec<SectionEntry>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SectionEntry {
    key: String,
    title: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ItemContainer {
    #[serde(rename = "Metadata")]
    metadata: Vec<ItemEntry>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ItemEntry {
    rating_key: String,
    title: String,
    summary: String,
    originally_available_at: String,
    #[serde(rename = "Media")]
    media: Vec<MediaEntry>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct MediaEntry {
    #[serde(rename = "Part")]
    part: Vec<PartEntry>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PartEntry {
    file: String,
}

impl ItemEntry {
    fn into_item(self) -> LibraryItem {
        let original_date = NaiveDate::parse_from_str(&self.originally_available_at, "%Y-%m-%d").ok();
        let file_path = self
            .media
            .into_iter()
            .flat_map(|media| media.part)
            .map(|part| part.file)
            .find(|file| !file.is_empty())
            .map(PathBuf::from);
        LibraryItem {
            rating_key: self.rating_key,
            title: self.title,
            summary: self.summary,
            original_date,
            file_path,
        }
    }
}
