//! Structured error handling and exit codes.

use serde::Serialize;

/// Exit codes for the plextube application.
///
/// - 0: Success (run completed, all items accounted for)
/// - 1: General error (unexpected failure)
/// - 2: No items (the library section was empty)
/// - 3: Partial success (run completed but some items failed)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: The run completed and every item succeeded.
    Success = 0,
    /// General error: An unexpected error occurred.
    GeneralError = 1,
    /// No items: The library section had nothing to hydrate.
    NoItems = 2,
    /// Partial success: The run completed but some items failed.
    PartialSuccess = 3,
    /// Interrupted: The run was interrupted by the user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "PT000",
            Self::GeneralError => "PT001",
            Self::NoItems => "PT002",
            Self::PartialSuccess => "PT003",
            Self::Interrupted => "PT130",
        }
    }
}

/// Structured error information for JSON output.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "PT001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Whether the operation was interrupted
    pub interrupted: bool,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            interrupted: exit_code == ExitCode::Interrupted,
        }
    }
}
