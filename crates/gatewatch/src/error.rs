//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use gatewatch_core::CoreError;

/// Exit codes.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_READY: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to the stream at {url}")]
    #[diagnostic(
        code(gatewatch::connection_failed),
        help(
            "Check that the broker bridge is running and accessible.\n\
             URL: {url}\n\
             Try: gatewatch watch -u ws://localhost:9001/stream"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Timed out after {seconds}s waiting for {waiting_for}")]
    #[diagnostic(
        code(gatewatch::timeout),
        help("Increase the wait with --timeout, or check the stream endpoint.")
    )]
    Timeout { seconds: u64, waiting_for: String },

    // ── Orchestrator ─────────────────────────────────────────────────

    #[error("Device '{device_id}' did not become ready")]
    #[diagnostic(
        code(gatewatch::not_ready),
        help("Run: gatewatch devices to inspect the orchestrator's view.")
    )]
    NotReady { device_id: String },

    #[error("Orchestrator request failed: {reason}")]
    #[diagnostic(
        code(gatewatch::orchestrator),
        help("Check the orchestrator URL (--orchestrator or GATEWATCH_ORCHESTRATOR_URL).")
    )]
    Orchestrator { reason: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(gatewatch::validation))]
    Validation { field: String, reason: String },

    // ── Command ──────────────────────────────────────────────────────

    #[error("Command rejected: {message}")]
    #[diagnostic(code(gatewatch::rejected))]
    Rejected { message: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(code(gatewatch::config))]
    Config(Box<figment::Error>),

    // ── IO ───────────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotReady { .. } => exit_code::NOT_READY,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::StreamDisconnected => CliError::ConnectionFailed {
                url: "(disconnected)".into(),
                reason: "the stream connection was lost".into(),
            },

            CoreError::Timeout {
                timeout_secs,
                waiting_for,
            } => CliError::Timeout {
                seconds: timeout_secs,
                waiting_for,
            },

            CoreError::ValidationFailed { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Rejected { message } => CliError::Rejected { message },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::Rejected { message },
        }
    }
}
