//! plextube - Plex library hydration from YouTube metadata
//!
//! plextube walks a Plex library section whose media filenames carry
//! YouTube video IDs, resolves each ID against the YouTube Data API
//! through a persistent JSON cache, and reconciles titles, summaries,
//! and publish dates on the server.

pub mod cache;
pub mod cli;
pub mod compose;
pub mod detect;
pub mod error;
pub mod extract;
pub mod hydrate;
pub mod logging;
pub mod progress;
pub mod provider;
pub mod server;
pub mod settings;
pub mod signal;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use yansi::Paint;

use crate::cache::{CacheStore, JsonCacheStore, NullCacheStore, CACHE_FILE_NAME};
use crate::cli::{Cli, Commands, ConnectionArgs, LibrariesArgs, RunArgs};
use crate::error::ExitCode;
use crate::hydrate::{Hydrator, HydratorConfig, RunSummary};
use crate::progress::Progress;
use crate::provider::YouTubeClient;
use crate::server::PlexClient;
use crate::settings::Settings;
use crate::signal::ShutdownHandler;

/// Run the application with parsed CLI arguments.
///
/// Returns the exit code the process should report, or an error for
/// failures that prevented the run from starting or finishing.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color {
        yansi::disable();
    }

    let handler = signal::install_handler()?;

    match cli.command {
        Commands::Run(args) => run_hydration(args, cli.verbose, cli.quiet, &handler),
        Commands::Libraries(args) => list_libraries(args),
    }
}

fn run_hydration(
    args: RunArgs,
    verbose: u8,
    quiet: bool,
    handler: &ShutdownHandler,
) -> Result<ExitCode> {
    let settings = Settings::load().context("Failed to load configuration")?;

    let api_key = require(
        args.api_key.or_else(|| settings.youtube_api_key.clone()),
        "YouTube API key",
        "--api-key, YOUTUBE_API_KEY, or youtube_api_key in the config file",
    )?;
    let library = require(
        args.library.or_else(|| settings.library_name.clone()),
        "library",
        "--library, LIBRARY_NAME, or library_name in the config file",
    )?;

    let (server, _) = connect(args.connection, &settings)?;

    let sections = server
        .sections()
        .context("Failed to list library sections")?;
    let wanted = library.to_lowercase();
    let Some(section) = sections.iter().find(|s| s.title.to_lowercase() == wanted) else {
        let names: Vec<&str> = sections.iter().map(|s| s.title.as_str()).collect();
        anyhow::bail!(
            "Library '{}' not found. Available libraries: {}",
            library,
            names.join(", ")
        );
    };
    log::info!("Processing library: {} ({})", section.title, section.kind);

    let provider = YouTubeClient::new(api_key);

    let store: Box<dyn CacheStore> = if args.no_cache {
        log::info!("Metadata cache disabled for this run");
        Box::new(NullCacheStore)
    } else {
        let path = args
            .cache
            .or_else(|| settings.cache_path.clone())
            .unwrap_or_else(default_cache_path);
        log::debug!("Using metadata cache at {}", path.display());
        Box::new(JsonCacheStore::new(path))
    };

    let mut config = HydratorConfig::default()
        .with_dry_run(args.dry_run)
        .with_verbose(verbose > 0)
        .with_shutdown_flag(handler.get_flag());
    if !quiet {
        config = config.with_progress_callback(Arc::new(Progress::new(false)));
    }

    let summary = Hydrator::new(config).run(&server, &provider, store.as_ref(), &section.key)?;

    println!("{}", summary.render(args.dry_run));

    Ok(summary_exit_code(&summary))
}

fn list_libraries(args: LibrariesArgs) -> Result<ExitCode> {
    let settings = Settings::load().context("Failed to load configuration")?;
    let (server, name) = connect(args.connection, &settings)?;

    let sections = server
        .sections()
        .context("Failed to list library sections")?;

    println!("Libraries on {name}:");
    if sections.is_empty() {
        println!("  (none)");
        return Ok(ExitCode::NoItems);
    }
    for section in &sections {
        println!("  {}  {} ({})", section.key, section.title.bold(), section.kind);
    }
    Ok(ExitCode::Success)
}

/// Builds a connected Plex client from CLI and settings values.
///
/// Returns the client together with the server's advertised name.
fn connect(connection: ConnectionArgs, settings: &Settings) -> Result<(PlexClient, String)> {
    let server_url = require(
        connection.server_url.or_else(|| settings.plex_url.clone()),
        "Plex server URL",
        "--server-url, PLEX_URL, or plex_url in the config file",
    )?;
    let token = require(
        connection.token.or_else(|| settings.plex_token.clone()),
        "Plex token",
        "--token, PLEX_TOKEN, or plex_token in the config file",
    )?;

    let client = PlexClient::new(server_url, token);
    let name = client
        .server_name()
        .context("Failed to connect to the Plex server")?;
    log::info!("Connected to media server: {name}");
    Ok((client, name))
}

fn require(value: Option<String>, what: &str, hint: &str) -> Result<String> {
    value.with_context(|| format!("No {what} configured. Set {hint}"))
}

/// Cache location used when neither the CLI nor the settings name one:
/// next to the executable.
fn default_cache_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(CACHE_FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(CACHE_FILE_NAME))
}

fn summary_exit_code(summary: &RunSummary) -> ExitCode {
    if summary.interrupted {
        ExitCode::Interrupted
    } else if summary.total_items == 0 {
        ExitCode::NoItems
    } else if summary.failed > 0 {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    }
}
