// ── Core error types ──
//
// User-facing errors from gatewatch-core. These are NOT transport-specific --
// consumers never see socket or HTTP failures directly. The
// `From<gatewatch_api::Error>` impl translates transport-layer errors into
// domain-appropriate variants.
//
// Note that the ingest path itself never returns these: decode and parse
// failures degrade to defaults and surface only through the session's
// observable error channel. `CoreError` exists for the command/boundary
// surface, where a caller genuinely needs a failure result.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to stream at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Stream disconnected")]
    StreamDisconnected,

    #[error("Timed out after {timeout_secs}s waiting for {waiting_for}")]
    Timeout {
        timeout_secs: u64,
        waiting_for: String,
    },

    // ── Command errors ───────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Command rejected: {message}")]
    Rejected { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<gatewatch_api::Error> for CoreError {
    fn from(err: gatewatch_api::Error) -> Self {
        match err {
            gatewatch_api::Error::StreamDisconnected => CoreError::StreamDisconnected,
            gatewatch_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            gatewatch_api::Error::WebSocketClosed { code, reason } => {
                CoreError::ConnectionFailed {
                    url: String::new(),
                    reason: format!("WebSocket closed (code {code}): {reason}"),
                }
            }
            gatewatch_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout {
                        timeout_secs: 0,
                        waiting_for: "orchestrator response".into(),
                    }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map(|u| u.to_string())
                            .unwrap_or_else(|| "<unknown>".into()),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Internal(e.to_string())
                }
            }
            gatewatch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            gatewatch_api::Error::Timeout { timeout_secs } => CoreError::Timeout {
                timeout_secs,
                waiting_for: "transport".into(),
            },
            gatewatch_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
