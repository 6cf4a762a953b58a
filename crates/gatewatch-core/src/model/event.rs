// ── Event domain types ──

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome classification of a normalized event, derived from the
/// payload's nested `data.success` flag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventStatus {
    Success,
    Failure,
    Info,
}

/// Canonical record stored in the event log.
///
/// Built once per inbound frame by the [`Normalizer`](crate::Normalizer)
/// and immutable afterwards. Every field except the three optional ids and
/// `payload` is always populated; `raw` keeps the decoded frame text for
/// audit and debugging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessEvent {
    /// Process-unique identifier, collision-free within a session.
    pub id: Uuid,

    /// Epoch milliseconds, from the payload `ts`/`timestamp` if parseable,
    /// else ingestion time.
    pub timestamp_millis: i64,

    /// RFC 3339 rendering of `timestamp_millis`.
    pub iso_timestamp: String,

    pub badge_id: Option<String>,
    pub door_id: Option<String>,
    pub device_id: Option<String>,

    pub status: EventStatus,

    /// Source tag: the payload's `type` field, or the channel the frame
    /// arrived on when the payload declares none.
    pub topic: String,

    /// Human-readable one-line summary.
    pub message: String,

    /// The decoded frame text, verbatim.
    pub raw: String,

    /// The structurally valid payload object, or `None` when the frame did
    /// not parse to a JSON object.
    pub payload: Option<serde_json::Value>,
}

/// Last badge seen at a badge-reader device (workspace projection).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeObservation {
    pub device_id: String,
    /// Badge identifier; empty when the payload carried none.
    pub badge_id: String,
    pub door_id: Option<String>,
    /// Timestamp string as published, or ingestion time when absent.
    pub timestamp: String,
}
