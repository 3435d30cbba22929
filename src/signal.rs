//! Signal handling for graceful shutdown.
//!
//! Centralized Ctrl+C handling for plextube. An `AtomicBool` flag is shared
//! with the hydration pipeline, which checks it between items and stops
//! cleanly, flushing the metadata cache before returning.
//!
//! # Usage
//!
//! ```rust,no_run
//! use plextube::hydrate::HydratorConfig;
//! use plextube::signal::install_handler;
//!
//! let handler = install_handler().expect("Failed to install signal handler");
//! let config = HydratorConfig::default().with_shutdown_flag(handler.get_flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::OnceLock;

/// Shared flag signalling that the user asked the run to stop.
///
/// `ShutdownHandler` is `Send` and `Sync`; the underlying flag uses atomic
/// operations, so clones and worker threads all observe the same state.
#[derive(Debug, Clone)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a new handler with the flag initially unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Manually request a shutdown, as the signal hook would.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Get a clone of the flag for handing to
    /// [`HydratorConfig::with_shutdown_flag`](crate::hydrate::HydratorConfig::with_shutdown_flag).
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Reset the flag to `false` so a handler can be reused.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Default for ShutdownHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install a Ctrl+C handler that sets the shutdown flag on interrupt.
///
/// Call once, early in startup. Repeated calls (and calls racing from
/// parallel tests) reuse the already-installed handler, or fall back to an
/// unhooked one when another piece of the process owns the signal; either
/// way the returned handler works for manual `request_shutdown()` calls.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();

    match ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);

        let _ = writeln!(
            std::io::stderr(),
            "\nInterrupted. Finishing the current item and saving the cache..."
        );
        let _ = std::io::stderr().flush();

        log::info!("Shutdown signal received");
    }) {
        Ok(()) => {
            let _ = GLOBAL_HANDLER.set(handler.clone());
            Ok(handler)
        }
        Err(_) => {
            if let Some(handler) = GLOBAL_HANDLER.get() {
                handler.reset();
                Ok(handler.clone())
            } else {
                log::debug!("Ctrl+C handler already registered, using unhooked handler");
                let fallback = ShutdownHandler::new();
                let _ = GLOBAL_HANDLER.set(fallback.clone());
                Ok(fallback)
            }
        }
    }
}

/// Create a handler without installing any signal hooks.
///
/// Useful in tests, or when the flag is managed manually.
///
/// # Example
///
/// ```
/// use plextube::signal::create_handler;
/// let handler = create_handler();
/// ```
#[must_use]
pub fn create_handler() -> ShutdownHandler {
    ShutdownHandler::new()
}
