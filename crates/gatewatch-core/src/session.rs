// ── Monitoring session ──
//
// Full lifecycle management for one stream connection: the connection
// state machine, the per-frame fold into the event log and the device
// projections, and outbound command publishing.
//
// One ingest task per connection consumes the transport's ordered signal
// channel; each signal is applied to completion before the next, so the
// stores need no cross-frame locking. Replacing the connection cancels
// the previous transport task and aborts its ingest task -- a teardown
// never leaks state changes.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use gatewatch_api::frame::Frame;
use gatewatch_api::stream::{StreamConfig, StreamHandle, StreamSignal};
use gatewatch_api::topic::{TopicFilter, device_segment};
use gatewatch_api::{decode, try_decode};

use crate::command::Command;
use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::model::{AccessEvent, BadgeObservation};
use crate::normalize::{
    BADGE_ID_KEYS, DEVICE_ID_KEYS, DOOR_ID_KEYS, Normalizer, TIMESTAMP_KEYS, pick_string,
};
use crate::store::{BadgeActivityMap, DoorStateMap, EventLog};
use crate::stream::SnapshotStream;

const SIGNAL_CHANNEL_CAPACITY: usize = 256;

// ── ConnectionState ──────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Error,
}

// ── Session ──────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<SessionInner>`. Owns the event log, the
/// device projections, and the singular transport handle. All failure
/// paths mutate the observable error/state channels instead of
/// propagating -- only [`execute`](Self::execute) returns a `Result`.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SessionConfig,
    normalizer: Normalizer,
    door_filter: TopicFilter,
    badge_filter: TopicFilter,

    log: EventLog,
    doors: DoorStateMap,
    badges: BadgeActivityMap,

    connection_state: watch::Sender<ConnectionState>,
    last_error: watch::Sender<Option<String>>,
    current_url: watch::Sender<Option<Url>>,

    stream: Mutex<Option<ActiveStream>>,
}

/// The live transport handle plus its ingest task.
struct ActiveStream {
    handle: StreamHandle,
    ingest: JoinHandle<()>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let (connection_state, _) = watch::channel(ConnectionState::Idle);
        let (last_error, _) = watch::channel(None);
        let (current_url, _) = watch::channel(None);

        let normalizer = Normalizer::new(config.messages.clone());
        let door_filter = TopicFilter::new(&config.door_state_filter);
        let badge_filter = TopicFilter::new(&config.badge_events_filter);
        let log = EventLog::new(config.log_capacity);

        Self {
            inner: Arc::new(SessionInner {
                config,
                normalizer,
                door_filter,
                badge_filter,
                log,
                doors: DoorStateMap::new(),
                badges: BadgeActivityMap::new(),
                connection_state,
                last_error,
                current_url,
                stream: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Connect to the stream at `url`.
    ///
    /// Any prior connection is force-closed first without emitting state
    /// changes for the teardown. The state passes through `Connecting`
    /// and lands on `Connected` or `Error` as the transport reports;
    /// failures are recorded in the error observable, never returned.
    pub async fn connect(&self, url: &str) {
        if url.is_empty() {
            return;
        }

        // Force-close any previous connection without flashing Idle.
        self.disconnect_inner(false).await;

        // Hold the slot so no signal can interleave before the swap
        // completes; nothing below awaits after the tasks are spawned.
        let mut guard = self.inner.stream.lock().await;

        self.inner
            .connection_state
            .send_replace(ConnectionState::Connecting);
        self.inner.last_error.send_replace(None);

        let target: Url = match url.parse() {
            Ok(target) => target,
            Err(e) => {
                warn!(url, error = %e, "stream url rejected");
                self.inner.last_error.send_replace(Some(e.to_string()));
                self.inner.connection_state.send_replace(ConnectionState::Error);
                self.inner.current_url.send_replace(None);
                return;
            }
        };
        self.inner.current_url.send_replace(Some(target.clone()));

        let stream_config = StreamConfig {
            reconnect: self.inner.config.reconnect.clone(),
            subscriptions: self.inner.config.subscriptions.clone(),
        };

        let (signal_tx, mut signal_rx) = mpsc::channel(SIGNAL_CHANNEL_CAPACITY);
        let handle = StreamHandle::open(target.clone(), stream_config, signal_tx);

        let shared = Arc::clone(&self.inner);
        let ingest = tokio::spawn(async move {
            while let Some(signal) = signal_rx.recv().await {
                shared.apply(&target, signal);
            }
            debug!("ingest task exiting");
        });

        *guard = Some(ActiveStream { handle, ingest });
        info!(url, "stream connection started");
    }

    /// Disconnect and return to `Idle`.
    pub async fn disconnect(&self) {
        self.disconnect_inner(true).await;
    }

    async fn disconnect_inner(&self, reset_state: bool) {
        let mut guard = self.inner.stream.lock().await;
        if let Some(active) = guard.take() {
            // Best-effort close; the transport swallows teardown errors.
            active.handle.shutdown();
            active.ingest.abort();
        }
        drop(guard);

        if reset_state {
            self.inner.connection_state.send_replace(ConnectionState::Idle);
            self.inner.current_url.send_replace(None);
            debug!("disconnected");
        }
    }

    /// Drop all retained log events. Connection state is untouched.
    pub fn clear_log(&self) {
        self.inner.log.clear();
    }

    // ── Command execution ────────────────────────────────────────────

    /// Publish a command through the live stream.
    ///
    /// Requires the session to be `Connected`; the stream's QoS is the
    /// only delivery guarantee.
    pub async fn execute(&self, command: Command) -> Result<(), CoreError> {
        command.validate()?;

        if *self.inner.connection_state.borrow() != ConnectionState::Connected {
            return Err(CoreError::StreamDisconnected);
        }

        let guard = self.inner.stream.lock().await;
        let active = guard.as_ref().ok_or(CoreError::StreamDisconnected)?;

        let topic = command.topic();
        active.handle.publish(&topic, command.payload()).await?;
        info!(topic = %topic, "command published");
        Ok(())
    }

    // ── State observation ────────────────────────────────────────────

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection_state.subscribe()
    }

    pub fn last_error(&self) -> watch::Receiver<Option<String>> {
        self.inner.last_error.subscribe()
    }

    pub fn current_url(&self) -> watch::Receiver<Option<Url>> {
        self.inner.current_url.subscribe()
    }

    pub fn log(&self) -> &EventLog {
        &self.inner.log
    }

    pub fn door_states(&self) -> &DoorStateMap {
        &self.inner.doors
    }

    pub fn badge_activity(&self) -> &BadgeActivityMap {
        &self.inner.badges
    }

    /// Subscribe to log snapshots as an awaitable stream.
    pub fn events(&self) -> SnapshotStream<Arc<Vec<Arc<AccessEvent>>>> {
        SnapshotStream::new(self.inner.log.subscribe())
    }

    /// Subscribe to connection-state changes as an awaitable stream.
    pub fn connection(&self) -> SnapshotStream<ConnectionState> {
        SnapshotStream::new(self.inner.connection_state.subscribe())
    }
}

// ── Signal application ───────────────────────────────────────────────

impl SessionInner {
    /// Apply one transport signal. Runs to completion on the single
    /// ingest task; the log append and the device-state fold of a frame
    /// are therefore atomic with respect to external readers.
    fn apply(&self, target: &Url, signal: StreamSignal) {
        match signal {
            StreamSignal::Connecting { attempt } => {
                debug!(attempt, "stream connecting");
                self.connection_state.send_replace(ConnectionState::Connecting);
                self.current_url.send_replace(Some(target.clone()));
            }
            StreamSignal::Opened => {
                info!("stream connected");
                self.connection_state.send_replace(ConnectionState::Connected);
            }
            StreamSignal::Closed => {
                // Not an explicit disconnect (that path never reaches the
                // ingest task), so a close is a stream failure.
                if *self.connection_state.borrow() != ConnectionState::Idle {
                    self.connection_state.send_replace(ConnectionState::Error);
                }
                self.current_url.send_replace(None);
            }
            StreamSignal::Errored { message } => {
                warn!(error = %message, "stream unavailable");
                self.last_error.send_replace(Some(message));
                self.connection_state.send_replace(ConnectionState::Error);
                self.current_url.send_replace(None);
            }
            StreamSignal::Frame(frame) => self.handle_frame(&frame),
        }
    }

    /// Fold one inbound frame: always a log row, plus the reducer for
    /// whichever state channel the frame matches.
    fn handle_frame(&self, frame: &Frame) {
        let text = match try_decode(&frame.payload) {
            Ok(text) => text,
            Err(e) => {
                // Surface the decode failure on the connection-level
                // error channel, then degrade instead of dropping: the
                // log still gets exactly one row for the frame.
                self.last_error.send_replace(Some(e.to_string()));
                decode(&frame.payload)
            }
        };

        let event = self.normalizer.normalize(&text, &frame.channel);
        self.log.append(event);

        if self.door_filter.matches(&frame.channel) {
            if let Some((device_id, is_open)) = parse_door_state(&text) {
                self.doors.set(&device_id, is_open);
            }
        }

        if self.badge_filter.matches(&frame.channel) {
            if let Some(device_id) = device_segment(&frame.channel) {
                if let Some(observation) = parse_badge_observation(&text, device_id) {
                    self.badges.set(observation);
                }
            }
        }
    }
}

// ── Minimal state-channel parsers ────────────────────────────────────
//
// Tolerant by contract: any failure is swallowed and the projection is
// left untouched. The log row for the frame has already been appended.

/// `{device_id, data: {is_open: bool}}` → fold input for the door map.
fn parse_door_state(text: &str) -> Option<(String, bool)> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let device_id = pick_string(Some(&value), DEVICE_ID_KEYS)?;
    let is_open = value.get("data")?.get("is_open")?.as_bool()?;
    Some((device_id, is_open))
}

/// Accepts both badge-event payload shapes: the flattened
/// `{badgeID, doorID?, timestamp}` and the nested
/// `{type: "badge_event", ts, data: {badge_id|tag_id, door_id?}}`.
fn parse_badge_observation(text: &str, device_id: &str) -> Option<BadgeObservation> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let object = value.as_object()?;

    if object.contains_key("badgeID") || object.contains_key("doorID") {
        return Some(BadgeObservation {
            device_id: device_id.to_string(),
            badge_id: coerce_string(object.get("badgeID")).unwrap_or_default(),
            door_id: coerce_string(object.get("doorID")),
            timestamp: coerce_string(object.get("timestamp"))
                .unwrap_or_else(now_timestamp),
        });
    }

    if object.get("type").and_then(serde_json::Value::as_str) == Some("badge_event") {
        let data = object.get("data");
        let badge_id = pick_string(data, BADGE_ID_KEYS)
            .or_else(|| pick_string(data, &["tag_id"]))
            .unwrap_or_default();
        return Some(BadgeObservation {
            device_id: device_id.to_string(),
            badge_id,
            door_id: pick_string(data, DOOR_ID_KEYS),
            timestamp: pick_string(Some(&value), TIMESTAMP_KEYS)
                .unwrap_or_else(now_timestamp),
        });
    }

    None
}

/// Stringify scalar JSON values the way the original payloads coerce
/// them; objects, arrays, and null yield `None`.
fn coerce_string(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::EventStatus;
    use gatewatch_api::frame::FramePayload;

    fn session() -> Session {
        Session::new(SessionConfig::default())
    }

    fn target() -> Url {
        "ws://localhost:9001/stream".parse().unwrap()
    }

    fn text_frame(channel: &str, text: &str) -> StreamSignal {
        StreamSignal::Frame(Frame::new(channel, FramePayload::Text(text.into())))
    }

    // ── Connection state machine ─────────────────────────────────────

    #[tokio::test]
    async fn fresh_session_is_idle_and_empty() {
        let session = session();
        assert_eq!(*session.connection_state().borrow(), ConnectionState::Idle);
        assert!(session.last_error().borrow().is_none());
        assert!(session.current_url().borrow().is_none());
        assert!(session.log().is_empty());
    }

    #[tokio::test]
    async fn opened_signal_reaches_connected_via_connecting() {
        let session = session();
        let url = target();

        session.inner.apply(&url, StreamSignal::Connecting { attempt: 0 });
        assert_eq!(
            *session.connection_state().borrow(),
            ConnectionState::Connecting
        );
        assert_eq!(session.current_url().borrow().clone(), Some(url.clone()));

        session.inner.apply(&url, StreamSignal::Opened);
        assert_eq!(
            *session.connection_state().borrow(),
            ConnectionState::Connected
        );
    }

    #[tokio::test]
    async fn close_while_connected_becomes_error() {
        let session = session();
        let url = target();

        session.inner.apply(&url, StreamSignal::Connecting { attempt: 0 });
        session.inner.apply(&url, StreamSignal::Opened);
        session.inner.apply(&url, StreamSignal::Closed);

        assert_eq!(*session.connection_state().borrow(), ConnectionState::Error);
        assert!(session.current_url().borrow().is_none());
    }

    #[tokio::test]
    async fn close_while_idle_stays_idle() {
        let session = session();
        session.inner.apply(&target(), StreamSignal::Closed);
        assert_eq!(*session.connection_state().borrow(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn errored_signal_records_message() {
        let session = session();
        session.inner.apply(
            &target(),
            StreamSignal::Errored {
                message: "connection refused".into(),
            },
        );

        assert_eq!(*session.connection_state().borrow(), ConnectionState::Error);
        assert_eq!(
            session.last_error().borrow().as_deref(),
            Some("connection refused")
        );
        assert!(session.current_url().borrow().is_none());
    }

    #[tokio::test]
    async fn connect_sets_connecting_synchronously() {
        let session = session();
        // Unreachable port: the async attempt will fail, but connect()
        // itself must already have passed through Connecting.
        session.connect("ws://127.0.0.1:1/stream").await;

        assert_eq!(
            *session.connection_state().borrow(),
            ConnectionState::Connecting
        );
        assert!(session.current_url().borrow().is_some());

        let mut rx = session.connection_state();
        let state = rx
            .wait_for(|s| *s == ConnectionState::Error)
            .await
            .unwrap();
        assert_eq!(*state, ConnectionState::Error);
        assert!(session.last_error().borrow().is_some());
        // Release the watch read guard before disconnect(): disconnect
        // calls send_replace on the same watch, which needs the write
        // lock and would otherwise deadlock against this held Ref.
        drop(state);

        session.disconnect().await;
    }

    #[tokio::test]
    async fn invalid_url_lands_on_error_with_message() {
        let session = session();
        session.connect("not a url").await;

        assert_eq!(*session.connection_state().borrow(), ConnectionState::Error);
        assert!(session.last_error().borrow().is_some());
        assert!(session.current_url().borrow().is_none());
    }

    #[tokio::test]
    async fn disconnect_always_ends_idle_with_no_url() {
        let session = session();
        session.connect("ws://127.0.0.1:1/stream").await;
        session.disconnect().await;

        assert_eq!(*session.connection_state().borrow(), ConnectionState::Idle);
        assert!(session.current_url().borrow().is_none());
    }

    #[tokio::test]
    async fn disconnect_preserves_log_history() {
        let session = session();
        session
            .inner
            .apply(&target(), text_frame("websocket", r#"{"type":"badge_event"}"#));
        assert_eq!(session.log().len(), 1);

        session.disconnect().await;
        assert_eq!(session.log().len(), 1);
    }

    // ── Frame fold ───────────────────────────────────────────────────

    #[tokio::test]
    async fn badge_event_frame_is_normalized_into_the_log() {
        let session = session();
        let raw = r#"{"type":"badge_event","ts":"2024-01-01T00:00:00Z","data":{"badge_id":"B1","success":true}}"#;
        session
            .inner
            .apply(&target(), text_frame("iot/badgeuse/dev1/events", raw));

        let snap = session.log().snapshot();
        assert_eq!(snap.len(), 1);
        let event = &snap[0];
        assert_eq!(event.badge_id.as_deref(), Some("B1"));
        assert_eq!(event.status, EventStatus::Success);
        assert_eq!(event.message, "Access granted for B1");
        assert_eq!(event.topic, "badge_event");
    }

    #[tokio::test]
    async fn door_state_frame_updates_map_and_logs_generically() {
        let session = session();
        let raw = r#"{"device_id":"doorA","type":"door_state","data":{"is_open":true}}"#;
        session
            .inner
            .apply(&target(), text_frame("iot/porte/doorA/state", raw));

        // Both effects of the same frame, applied in one step.
        assert_eq!(session.door_states().get("doorA"), Some(true));
        let snap = session.log().snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].message, "Event detected");
        assert_eq!(snap[0].topic, "door_state");
    }

    #[tokio::test]
    async fn door_state_fold_is_last_write_wins() {
        let session = session();
        let url = target();
        session.inner.apply(
            &url,
            text_frame(
                "iot/porte/doorA/state",
                r#"{"device_id":"doorA","data":{"is_open":true}}"#,
            ),
        );
        session.inner.apply(
            &url,
            text_frame(
                "iot/porte/doorA/state",
                r#"{"device_id":"doorA","data":{"is_open":false}}"#,
            ),
        );

        assert_eq!(session.door_states().get("doorA"), Some(false));
        assert_eq!(session.door_states().get("doorB"), None);
        assert_eq!(session.log().len(), 2);
    }

    #[tokio::test]
    async fn badge_channel_updates_activity_map() {
        let session = session();
        let raw = r#"{"type":"badge_event","ts":"2024-01-01T00:00:00Z","data":{"tag_id":"T9","door_id":"porte-001"}}"#;
        session
            .inner
            .apply(&target(), text_frame("iot/badgeuse/dev1/events", raw));

        let observation = session.badge_activity().get("dev1").unwrap();
        assert_eq!(observation.badge_id, "T9");
        assert_eq!(observation.door_id.as_deref(), Some("porte-001"));
        assert_eq!(observation.timestamp, "2024-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn flattened_badge_shape_is_accepted() {
        let session = session();
        let raw = r#"{"badgeID":"B7","doorID":"porte-002","timestamp":"2024-02-02T00:00:00Z"}"#;
        session
            .inner
            .apply(&target(), text_frame("iot/badgeuse/dev2/events", raw));

        let observation = session.badge_activity().get("dev2").unwrap();
        assert_eq!(observation.badge_id, "B7");
        assert_eq!(observation.door_id.as_deref(), Some("porte-002"));
    }

    #[tokio::test]
    async fn unparseable_frame_still_logs_exactly_one_event() {
        let session = session();
        session
            .inner
            .apply(&target(), text_frame("iot/porte/doorA/state", "{not json"));

        let snap = session.log().snapshot();
        assert_eq!(snap.len(), 1);
        assert!(snap[0].payload.is_none());
        assert_eq!(snap[0].status, EventStatus::Info);
        assert_eq!(snap[0].message, "Event detected");
        // Reducer failure is silent; the map is untouched.
        assert!(session.door_states().is_empty());
    }

    #[tokio::test]
    async fn malformed_binary_records_error_and_degraded_event() {
        let session = session();
        let frame = Frame::new("websocket", FramePayload::Binary(vec![0xff, 0xfe]));
        session.inner.apply(&target(), StreamSignal::Frame(frame));

        assert_eq!(
            session.last_error().borrow().as_deref(),
            Some("unsupported binary payload")
        );
        let snap = session.log().snapshot();
        assert_eq!(snap.len(), 1);
        assert!(snap[0].payload.is_none());
        assert_eq!(snap[0].status, EventStatus::Info);
    }

    #[tokio::test]
    async fn door_state_without_boolean_is_ignored_by_reducer() {
        let session = session();
        session.inner.apply(
            &target(),
            text_frame(
                "iot/porte/doorA/state",
                r#"{"device_id":"doorA","data":{}}"#,
            ),
        );

        assert!(session.door_states().is_empty());
        assert_eq!(session.log().len(), 1);
    }

    #[tokio::test]
    async fn clear_log_leaves_connection_state_alone() {
        let session = session();
        let url = target();
        session.inner.apply(&url, StreamSignal::Connecting { attempt: 0 });
        session.inner.apply(&url, StreamSignal::Opened);
        session
            .inner
            .apply(&url, text_frame("websocket", r#"{"type":"badge_event"}"#));

        session.clear_log();

        assert!(session.log().is_empty());
        assert_eq!(
            *session.connection_state().borrow(),
            ConnectionState::Connected
        );
    }

    // ── Commands ─────────────────────────────────────────────────────

    #[tokio::test]
    async fn execute_requires_a_connected_stream() {
        let session = session();
        let command = Command::SimulateBadge {
            device_id: "badgeuse-001".into(),
            badge_id: "B1".into(),
            door_id: None,
        };

        let result = session.execute(command).await;
        assert!(matches!(result, Err(CoreError::StreamDisconnected)));
    }
}
