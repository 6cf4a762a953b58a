//! Inbound frames and the payload decoder.
//!
//! A [`Frame`] is one message delivered by the stream: the channel it
//! arrived on plus its raw payload. [`decode`] turns any payload into text
//! for the normalizer, collapsing every failure path to a degraded default
//! so nothing downstream ever has to handle a decode panic.

use thiserror::Error;

/// Channel tag used for frames the bridge delivers without a topic label.
pub const DEFAULT_CHANNEL: &str = "websocket";

/// Raw payload of one inbound frame, as handed over by the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum FramePayload {
    /// No payload at all (empty frame).
    Empty,
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame, encoding unknown.
    Binary(Vec<u8>),
    /// Structured payload already parsed at the transport layer
    /// (an enveloped frame whose `payload` field was a JSON object).
    Json(serde_json::Value),
}

/// One inbound message: the channel it was published on and its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub channel: String,
    pub payload: FramePayload,
}

impl Frame {
    pub fn new(channel: impl Into<String>, payload: FramePayload) -> Self {
        Self {
            channel: channel.into(),
            payload,
        }
    }
}

/// Decode failure. [`decode`] substitutes a degraded value for each of
/// these; [`try_decode`] surfaces them so the session can record a
/// connection-level error string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Binary payload is not valid UTF-8.
    #[error("unsupported binary payload")]
    UnsupportedBinary,
    /// Structured payload could not be serialized back to text.
    #[error("unserializable payload")]
    Unserializable,
}

/// Strict decode: text for well-formed payloads, an error otherwise.
pub fn try_decode(payload: &FramePayload) -> Result<String, DecodeError> {
    match payload {
        FramePayload::Empty => Ok(String::new()),
        FramePayload::Text(text) => Ok(text.clone()),
        FramePayload::Binary(bytes) => String::from_utf8(bytes.clone())
            .map_err(|_| DecodeError::UnsupportedBinary),
        FramePayload::Json(value) => match value {
            serde_json::Value::Null => Ok(String::new()),
            // The transport already holds the raw text -- pass it through.
            serde_json::Value::String(text) => Ok(text.clone()),
            other => {
                serde_json::to_string(other).map_err(|_| DecodeError::Unserializable)
            }
        },
    }
}

/// Total decode: never fails, never panics.
///
/// Malformed binary degrades to replacement characters; anything else that
/// cannot be rendered becomes the empty string, which downstream treats as
/// "no event content".
pub fn decode(payload: &FramePayload) -> String {
    try_decode(payload).unwrap_or_else(|err| match err {
        DecodeError::UnsupportedBinary => match payload {
            FramePayload::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            _ => String::new(),
        },
        DecodeError::Unserializable => String::new(),
    })
}

// ── Tests ────────────────────────────────────────────────────────────
