//! Metadata provider interface and the YouTube Data API v3 client.

use serde::Deserialize;
use std::time::Duration;

use crate::cache::VideoMetadata;
use crate::extract::VideoId;

/// Resolves video identifiers to their metadata.
pub trait MetadataProvider {
    /// Looks up one identifier.
    ///
    /// A missing record is an error ([`ProviderError::NotFound`]), not an
    /// empty metadata value, so callers can distinguish "no such video"
    /// from transient outages.
    fn lookup_by_id(&self, id: &VideoId) -> Result<VideoMetadata, ProviderError>;
}

/// Failure modes of a metadata lookup.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider has no record for this identifier.
    #[error("no video found for id {0}")]
    NotFound(VideoId),
    /// Daily quota exhausted or the API key was rejected.
    #[error("provider quota exceeded or API key invalid (HTTP 403)")]
    QuotaExceeded,
    /// Unexpected HTTP status.
    #[error("provider returned HTTP {status}")]
    Status { status: u16 },
    /// Network-level failure (DNS, connect, timeout).
    #[error("provider request failed: {0}")]
    Transport(String),
    /// Response body did not match the expected shape.
    #[error("provider response malformed: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Transient failures may succeed on a later run and are logged louder.
    /// `NotFound` is a definitive answer for this run.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }
}

/// YouTube Data API v3 videos endpoint.
const VIDEOS_ENDPOINT: &str = "https://www.googleapis.com/youtube/v3/videos";

/// Request timeout for provider calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Blocking YouTube Data API v3 client.
pub struct YouTubeClient {
    agent: ureq::Agent,
    api_key: String,
}

impl YouTubeClient {
    /// Creates a client authenticating with `api_key`.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            agent,
            api_key: api_key.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct VideoResource {
    snippet: Snippet,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct Snippet {
    title: String,
    channel_title: String,
    description: String,
    published_at: String,
}

impl From<Snippet> for VideoMetadata {
    fn from(snippet: Snippet) -> Self {
        Self {
            title: snippet.title,
            channel_name: snippet.channel_title,
            description: snippet.description,
            published_at: snippet.published_at,
        }
    }
}

impl MetadataProvider for YouTubeClient {
    fn lookup_by_id(&self, id: &VideoId) -> Result<VideoMetadata, ProviderError> {
        let response = self
            .agent
            .get(VIDEOS_ENDPOINT)
            .query("part", "snippet")
            .query("id", id.as_str())
            .query("key", &self.api_key)
            .call();

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(403, _)) => return Err(ProviderError::QuotaExceeded),
            Err(ureq::Error::Status(status, _)) => return Err(ProviderError::Status { status }),
            Err(ureq::Error::Transport(transport)) => {
                return Err(ProviderError::Transport(transport.to_string()))
            }
        };

        let body: VideoListResponse = response
            .into_json()
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;

        match body.items.into_iter().next() {
            Some(video) => Ok(video.snippet.into()),
            None => Err(ProviderError::NotFound(id.clone())),
        }
    }
}
