//! Connection settings for the media server and metadata provider.
//!
//! Settings are layered: built-in defaults, then the platform config file,
//! then environment variables, with CLI flags (handled in [`crate::cli`])
//! taking final precedence. The bare variable names `PLEX_URL`,
//! `PLEX_TOKEN`, `YOUTUBE_API_KEY`, and `LIBRARY_NAME` are honored for
//! compatibility with other Plex tooling; `PLEXTUBE_`-prefixed variables
//! override them.

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Unprefixed environment variables merged into the settings.
const RAW_ENV_KEYS: [&str; 4] = ["plex_url", "plex_token", "youtube_api_key", "library_name"];

/// Layered connection settings.
///
/// Every field is optional here; [`crate::run_app`] decides which ones a
/// given subcommand actually requires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the Plex server, e.g. `http://localhost:32400`.
    pub plex_url: Option<String>,
    /// Plex authentication token.
    pub plex_token: Option<String>,
    /// YouTube Data API key.
    pub youtube_api_key: Option<String>,
    /// Library section to hydrate.
    pub library_name: Option<String>,
    /// Metadata cache file location.
    pub cache_path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the config file and environment.
    pub fn load() -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = Self::config_path() {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::raw().only(&RAW_ENV_KEYS))
            .merge(Env::prefixed("PLEXTUBE_"))
            .extract()
    }

    /// Platform-specific path of the optional config file.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "plextube", "plextube")?;
        Some(project_dirs.config_dir().join("config.toml"))
    }
}
