// ── Runtime session configuration ──
//
// Describes *how* a monitoring session behaves: log capacity, channel
// routing, reconnect tuning, message phrasing. The CLI constructs a
// `SessionConfig` and hands it in -- core never reads config files.

use gatewatch_api::stream::ReconnectConfig;

use crate::normalize::MessageCatalog;
use crate::store;

/// Default door-state channel filter.
pub const DOOR_STATE_FILTER: &str = "iot/porte/+/state";

/// Default badge-events channel filter.
pub const BADGE_EVENTS_FILTER: &str = "iot/badgeuse/+/events";

/// Configuration for a single monitoring session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum retained events in the log.
    pub log_capacity: usize,

    /// Channel filters subscribed on connect.
    pub subscriptions: Vec<String>,

    /// Filter routing frames into the door-state reducer.
    pub door_state_filter: String,

    /// Filter routing frames into the badge-activity reducer.
    pub badge_events_filter: String,

    /// Stream reconnect tuning.
    pub reconnect: ReconnectConfig,

    /// Per-topic message phrasing.
    pub messages: MessageCatalog,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_capacity: store::DEFAULT_CAPACITY,
            subscriptions: vec![DOOR_STATE_FILTER.into(), BADGE_EVENTS_FILTER.into()],
            door_state_filter: DOOR_STATE_FILTER.into(),
            badge_events_filter: BADGE_EVENTS_FILTER.into(),
            reconnect: ReconnectConfig::default(),
            messages: MessageCatalog::default(),
        }
    }
}
