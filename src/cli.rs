//! Command-line interface definitions for plextube.
//!
//! This module defines all CLI arguments, subcommands, and options using the
//! clap derive API. Global options (verbosity, color, JSON errors) sit above
//! subcommands for the hydration run and library listing.
//!
//! # Example
//!
//! ```bash
//! # Hydrate the "YouTube" section
//! plextube run --library YouTube
//!
//! # Preview changes without writing anything
//! plextube run --library YouTube --dry-run
//!
//! # List the sections the server offers
//! plextube libraries
//!
//! # Verbose mode for debugging
//! plextube -v run --library YouTube
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Hydrates Plex library metadata from YouTube IDs embedded in filenames.
///
/// plextube walks a Plex library section, takes the YouTube video ID out of
/// each item's media filename, resolves it against the YouTube Data API
/// through a persistent local cache, and rewrites stale titles, summaries,
/// and publish dates on the server.
#[derive(Debug, Parser)]
#[command(name = "plextube")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Report fatal errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for plextube.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Hydrate a library section against the metadata provider
    Run(RunArgs),
    /// List the library sections on the server
    Libraries(LibrariesArgs),
}

/// Plex connection options shared by all subcommands.
///
/// Values left unset here fall back to the config file; see
/// [`crate::settings`].
#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Base URL of the Plex server (e.g., http://localhost:32400)
    #[arg(long, value_name = "URL", env = "PLEX_URL")]
    pub server_url: Option<String>,

    /// Plex authentication token
    #[arg(long, value_name = "TOKEN", env = "PLEX_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// Arguments for the run subcommand.
#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Library section to hydrate
    #[arg(short, long, value_name = "NAME", env = "LIBRARY_NAME")]
    pub library: Option<String>,

    /// YouTube Data API key
    #[arg(long, value_name = "KEY", env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Preview changes without writing to the server
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Path to the metadata cache file
    ///
    /// If not specified, the cache lives next to the executable.
    #[arg(long, value_name = "PATH")]
    pub cache: Option<PathBuf>,

    /// Disable the metadata cache for this run
    #[arg(long, conflicts_with = "cache")]
    pub no_cache: bool,
}

/// Arguments for the libraries subcommand.
#[derive(Debug, Args)]
pub struct LibrariesArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,
}
