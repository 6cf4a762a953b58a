// ── Outbound commands ──
//
// The command dispatcher is a thin boundary: it renders typed commands
// into wire payloads and publishes them through the same stream handle
// the ingest side owns. No delivery guarantee beyond the bridge's QoS.

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::error::CoreError;

/// Door actuation request, as understood by the door firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DoorAction {
    Open,
    Close,
    Toggle,
}

/// A command publishable on the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Simulate a badge swipe at a badge-reader device.
    SimulateBadge {
        device_id: String,
        badge_id: String,
        door_id: Option<String>,
    },
    /// Drive a door directly.
    Door {
        door_id: String,
        action: DoorAction,
    },
}

impl Command {
    /// Reject commands that cannot address a device.
    pub fn validate(&self) -> Result<(), CoreError> {
        let target = match self {
            Self::SimulateBadge { device_id, .. } => device_id,
            Self::Door { door_id, .. } => door_id,
        };
        if target.trim().is_empty() {
            return Err(CoreError::ValidationFailed {
                message: "target device id is empty".into(),
            });
        }
        Ok(())
    }

    /// The channel this command publishes on.
    pub fn topic(&self) -> String {
        match self {
            Self::SimulateBadge { device_id, .. } => {
                format!("iot/badgeuse/{}/commands", device_id.trim())
            }
            Self::Door { door_id, .. } => format!("iot/porte/{}/commands", door_id.trim()),
        }
    }

    /// Render the wire payload. Timestamps are stamped at render time.
    pub fn payload(&self) -> Value {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        match self {
            Self::SimulateBadge {
                badge_id, door_id, ..
            } => {
                let mut payload = json!({
                    "action": "simulate_badge",
                    "timestamp": timestamp,
                    "badgeID": badge_id,
                });
                if let (Some(door), Some(object)) = (door_id, payload.as_object_mut()) {
                    object.insert("doorID".into(), Value::String(door.clone()));
                }
                payload
            }
            Self::Door { door_id, action } => json!({
                "action": action.to_string(),
                "doorID": door_id,
                "timestamp": timestamp,
            }),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
