//! Event normalization: raw frame text → [`AccessEvent`].
//!
//! Payloads drift between camelCase and snake_case spellings and between
//! nested and flattened shapes, so every logical attribute is resolved
//! through an ordered candidate-key table with a single
//! first-present-non-empty-string-wins helper. Normalization is total: a
//! frame that fails to parse still yields exactly one event with a null
//! payload and default-derived fields.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::model::{AccessEvent, EventStatus};

// ── Alternate-key tables ─────────────────────────────────────────────
//
// Logical field → ordered candidate spellings. Resolution is data-driven
// so a new spelling is one table entry, not another call-site probe.

pub(crate) const DEVICE_ID_KEYS: &[&str] = &["deviceId", "device_id"];
pub(crate) const BADGE_ID_KEYS: &[&str] = &["badgeID", "badge_id"];
pub(crate) const DOOR_ID_KEYS: &[&str] = &["doorID", "door_id"];
pub(crate) const TIMESTAMP_KEYS: &[&str] = &["ts", "timestamp"];
const FIRST_NAME_KEYS: &[&str] = &["firstName", "first_name"];
const LAST_NAME_KEYS: &[&str] = &["lastName", "last_name"];

/// Resolve a logical field: first candidate key holding a non-empty
/// string wins.
pub(crate) fn pick_string(source: Option<&Value>, keys: &[&str]) -> Option<String> {
    let object = source?.as_object()?;
    for key in keys {
        if let Some(Value::String(text)) = object.get(*key) {
            if !text.is_empty() {
                return Some(text.clone());
            }
        }
    }
    None
}

// ── Message templates ────────────────────────────────────────────────

/// Topics with dedicated phrasing.
const TOPIC_MANUAL_OVERRIDE: &str = "manual_override";
const TOPIC_BADGE_EVENT: &str = "badge_event";

/// Per-topic message templates.
///
/// The two front-end variants of the original system phrase the same
/// topics differently; keeping the phrases in one table makes that a
/// configuration choice. Placeholders: `{door}`, `{name}`, `{badge}`.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    pub manual_override_with_name: String,
    pub manual_override: String,
    /// Door label when the payload resolves none.
    pub door_fallback: String,

    pub badge_granted: String,
    pub badge_denied: String,
    pub badge_info: String,
    /// Badge label when the payload resolves none.
    pub badge_fallback: String,

    pub generic_granted: String,
    pub generic_denied: String,
    pub generic_info: String,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            manual_override_with_name: "{door} opened manually for {name}".into(),
            manual_override: "{door} opened manually".into(),
            door_fallback: "door".into(),
            badge_granted: "Access granted for {badge}".into(),
            badge_denied: "Access denied for {badge}".into(),
            badge_info: "Badge event detected for {badge}".into(),
            badge_fallback: "unknown badge".into(),
            generic_granted: "Access granted".into(),
            generic_denied: "Access denied".into(),
            generic_info: "Event detected".into(),
        }
    }
}

// ── Normalizer ───────────────────────────────────────────────────────

/// Turns decoded frame text into canonical [`AccessEvent`] records.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    catalog: MessageCatalog,
}

impl Normalizer {
    pub fn new(catalog: MessageCatalog) -> Self {
        Self { catalog }
    }

    /// Normalize one decoded frame.
    ///
    /// `channel` is the stream channel the frame arrived on; it becomes
    /// the event topic when the payload declares no `type`. This call
    /// never fails -- worst case every optional field is `None` and the
    /// status is [`EventStatus::Info`].
    pub fn normalize(&self, raw: &str, channel: &str) -> AccessEvent {
        let payload = parse_object(raw);
        let data = payload.as_ref().and_then(|p| p.get("data"));

        let timestamp_millis = pick_string(payload.as_ref(), TIMESTAMP_KEYS)
            .and_then(|ts| parse_timestamp_millis(&ts))
            .unwrap_or_else(|| Utc::now().timestamp_millis());
        let iso_timestamp = iso_from_millis(timestamp_millis);

        let device_id = pick_string(payload.as_ref(), DEVICE_ID_KEYS);
        let badge_id = pick_string(data, BADGE_ID_KEYS);
        let door_id = pick_string(data, DOOR_ID_KEYS);

        let status = resolve_status(data);

        let topic = payload
            .as_ref()
            .and_then(|p| p.get("type"))
            .and_then(Value::as_str)
            .map_or_else(|| channel.to_string(), ToString::to_string);

        let message = self.build_message(&topic, status, data);

        AccessEvent {
            id: Uuid::new_v4(),
            timestamp_millis,
            iso_timestamp,
            badge_id,
            door_id,
            device_id,
            status,
            topic,
            message,
            raw: raw.to_string(),
            payload,
        }
    }

    /// Render the per-topic summary line from the catalog.
    fn build_message(&self, topic: &str, status: EventStatus, data: Option<&Value>) -> String {
        let catalog = &self.catalog;

        if topic == TOPIC_MANUAL_OVERRIDE {
            let door = pick_string(data, DOOR_ID_KEYS)
                .unwrap_or_else(|| catalog.door_fallback.clone());
            return match extract_name(data) {
                Some(name) => catalog
                    .manual_override_with_name
                    .replace("{door}", &door)
                    .replace("{name}", &name),
                None => catalog.manual_override.replace("{door}", &door),
            };
        }

        if topic == TOPIC_BADGE_EVENT {
            let badge = pick_string(data, BADGE_ID_KEYS)
                .unwrap_or_else(|| catalog.badge_fallback.clone());
            let template = match status {
                EventStatus::Success => &catalog.badge_granted,
                EventStatus::Failure => &catalog.badge_denied,
                EventStatus::Info => &catalog.badge_info,
            };
            return template.replace("{badge}", &badge);
        }

        match status {
            EventStatus::Success => catalog.generic_granted.clone(),
            EventStatus::Failure => catalog.generic_denied.clone(),
            EventStatus::Info => catalog.generic_info.clone(),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Tolerant parse: only object-typed values count as a payload.
/// Primitives, arrays, and parse failures all become `None`.
fn parse_object(raw: &str) -> Option<Value> {
    if raw.is_empty() {
        return None;
    }
    let value: Value = serde_json::from_str(raw).ok()?;
    value.is_object().then_some(value)
}

/// `data.success`: `true` → success, `false` → failure, anything else
/// (absent, non-boolean) → info.
fn resolve_status(data: Option<&Value>) -> EventStatus {
    match data.and_then(|d| d.get("success")).and_then(Value::as_bool) {
        Some(true) => EventStatus::Success,
        Some(false) => EventStatus::Failure,
        None => EventStatus::Info,
    }
}

/// Join first/last name from the payload's `data` object, if any.
fn extract_name(data: Option<&Value>) -> Option<String> {
    let first = pick_string(data, FIRST_NAME_KEYS);
    let last = pick_string(data, LAST_NAME_KEYS);
    let joined = [first, last]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    let joined = joined.trim().to_string();
    (!joined.is_empty()).then_some(joined)
}

fn parse_timestamp_millis(ts: &str) -> Option<i64> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

fn iso_from_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ── Tests ────────────────────────────────────────────────────────────
