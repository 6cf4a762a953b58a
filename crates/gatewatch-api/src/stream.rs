//! WebSocket event stream with auto-reconnect.
//!
//! Connects to the broker bridge's WebSocket endpoint and forwards every
//! lifecycle transition and inbound frame as a [`StreamSignal`] on an
//! ordered channel. Handles reconnection with exponential backoff + jitter
//! automatically; each attempt re-announces `Connecting` so the consumer's
//! state machine always passes through it.
//!
//! Wire protocol: inbound text frames are either a labelled envelope
//! `{"topic": "...", "payload": <string|object>}` or a bare payload
//! (delivered on the fallback channel). After the socket opens, one
//! `{"action":"subscribe","topic":"..."}` request is sent per configured
//! filter. Outbound publishes use the same labelled envelope.
//!
//! # Example
//!
//! ```rust,ignore
//! use gatewatch_api::stream::{StreamConfig, StreamHandle, StreamSignal};
//! use tokio::sync::mpsc;
//! use url::Url;
//!
//! let (tx, mut rx) = mpsc::channel(256);
//! let url = Url::parse("ws://localhost:9001/stream")?;
//! let handle = StreamHandle::open(url, StreamConfig::default(), tx);
//!
//! while let Some(signal) = rx.recv().await {
//!     if let StreamSignal::Frame(frame) = signal {
//!         println!("{}: {:?}", frame.channel, frame.payload);
//!     }
//! }
//!
//! handle.shutdown();
//! ```

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::frame::{DEFAULT_CHANNEL, Frame, FramePayload};

// ── Channel capacities ───────────────────────────────────────────────

const OUTBOUND_CHANNEL_CAPACITY: usize = 64;

// ── StreamSignal ─────────────────────────────────────────────────────

/// One lifecycle or data event from the stream task, in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamSignal {
    /// A connection attempt is starting (first connect and every retry).
    Connecting { attempt: u32 },
    /// The socket is open and subscriptions have been requested.
    Opened,
    /// The server closed the connection (close frame or stream end).
    Closed,
    /// The connection attempt or the live socket failed.
    Errored { message: String },
    /// An inbound message.
    Frame(Frame),
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for stream reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_retries: None,
        }
    }
}

// ── StreamConfig ─────────────────────────────────────────────────────

/// Transport-level configuration for one stream connection.
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    pub reconnect: ReconnectConfig,

    /// Channel filters to subscribe to once the socket opens.
    pub subscriptions: Vec<String>,
}

// ── Wire envelopes ───────────────────────────────────────────────────

/// Labelled inbound/outbound frame as the bridge sends it.
#[derive(Debug, Serialize, Deserialize)]
struct WireEnvelope {
    topic: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Subscription request sent after the socket opens.
#[derive(Debug, Serialize)]
struct SubscribeRequest<'a> {
    action: &'static str,
    topic: &'a str,
}

/// Map an inbound text frame to a [`Frame`].
///
/// Labelled envelopes carry their own channel; anything else is a bare
/// payload on the fallback channel.
fn frame_from_text(text: &str) -> Frame {
    match serde_json::from_str::<WireEnvelope>(text) {
        Ok(envelope) => {
            let payload = match envelope.payload {
                serde_json::Value::Null => FramePayload::Empty,
                serde_json::Value::String(raw) => FramePayload::Text(raw),
                other => FramePayload::Json(other),
            };
            Frame::new(envelope.topic, payload)
        }
        Err(_) => Frame::new(DEFAULT_CHANNEL, FramePayload::Text(text.to_string())),
    }
}

// ── StreamHandle ─────────────────────────────────────────────────────

/// Handle to a running stream connection.
///
/// Owns the background task through its [`CancellationToken`]; dropping
/// the handle does not tear the task down -- call
/// [`shutdown`](Self::shutdown) for that.
pub struct StreamHandle {
    outbound_tx: mpsc::Sender<WireEnvelope>,
    cancel: CancellationToken,
}

impl StreamHandle {
    /// Spawn the connection loop against `url`.
    ///
    /// Returns immediately; the first `Connecting` signal arrives on
    /// `signals` once the background task starts its attempt.
    pub fn open(url: Url, config: StreamConfig, signals: mpsc::Sender<StreamSignal>) -> Self {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            stream_loop(url, config, signals, outbound_rx, task_cancel).await;
        });

        Self { outbound_tx, cancel }
    }

    /// Publish a payload on a channel through the live socket.
    ///
    /// Fails with [`Error::StreamDisconnected`] once the background task
    /// has exited; delivery is otherwise best-effort (QoS of the bridge).
    pub async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), Error> {
        self.outbound_tx
            .send(WireEnvelope {
                topic: topic.to_string(),
                payload,
            })
            .await
            .map_err(|_| Error::StreamDisconnected)
    }

    /// Signal the background task to shut down.
    ///
    /// The task closes the socket best-effort and exits without emitting
    /// further signals, so a teardown never masquerades as a stream error.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → drive → on error, backoff → reconnect.
async fn stream_loop(
    url: Url,
    config: StreamConfig,
    signals: mpsc::Sender<StreamSignal>,
    mut outbound_rx: mpsc::Receiver<WireEnvelope>,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        if !emit(&signals, &cancel, StreamSignal::Connecting { attempt }).await {
            break;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = connect_and_drive(&url, &config, &signals, &mut outbound_rx, &cancel) => {
                match result {
                    // Clean disconnect (server close frame or stream ended).
                    // Reset the attempt counter and reconnect immediately.
                    Ok(()) => {
                        tracing::info!("stream disconnected cleanly, reconnecting");
                        if !emit(&signals, &cancel, StreamSignal::Closed).await {
                            break;
                        }
                        attempt = 0;
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, attempt, "stream error");
                        let message = e.to_string();
                        if !emit(&signals, &cancel, StreamSignal::Errored { message }).await {
                            break;
                        }

                        if let Some(max) = config.reconnect.max_retries {
                            if attempt >= max {
                                tracing::error!(
                                    max_retries = max,
                                    "stream reconnection limit reached, giving up"
                                );
                                break;
                            }
                        }

                        let delay = calculate_backoff(attempt, &config.reconnect);
                        tracing::info!(
                            delay_ms = delay.as_millis() as u64,
                            attempt,
                            "waiting before reconnect"
                        );

                        tokio::select! {
                            biased;
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(delay) => {}
                        }

                        attempt += 1;
                    }
                }
            }
        }
    }

    tracing::debug!("stream loop exiting");
}

/// Forward a signal unless the consumer is gone or teardown started.
///
/// Returns `false` when the loop should stop. A cancelled token means an
/// explicit disconnect is in flight -- no state change may leak from it.
async fn emit(
    signals: &mpsc::Sender<StreamSignal>,
    cancel: &CancellationToken,
    signal: StreamSignal,
) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    signals.send(signal).await.is_ok()
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one socket, subscribe, then pump frames and outbound
/// publishes until the connection drops.
async fn connect_and_drive(
    url: &Url,
    config: &StreamConfig,
    signals: &mpsc::Sender<StreamSignal>,
    outbound_rx: &mut mpsc::Receiver<WireEnvelope>,
    cancel: &CancellationToken,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting to stream");

    let (ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!("stream connected");

    let (mut write, mut read) = ws_stream.split();

    for topic in &config.subscriptions {
        let request = SubscribeRequest {
            action: "subscribe",
            topic,
        };
        if let Ok(text) = serde_json::to_string(&request) {
            write
                .send(tungstenite::Message::text(text))
                .await
                .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
            tracing::debug!(topic = %topic, "subscribed");
        }
    }

    if !emit(signals, cancel, StreamSignal::Opened).await {
        return Ok(());
    }

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // Best-effort close; errors are irrelevant during teardown.
                let _ = write.send(tungstenite::Message::Close(None)).await;
                return Ok(());
            }
            outbound = outbound_rx.recv() => {
                let Some(envelope) = outbound else { return Ok(()) };
                let Ok(text) = serde_json::to_string(&envelope) else { continue };
                write
                    .send(tungstenite::Message::text(text))
                    .await
                    .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
                tracing::debug!(topic = %envelope.topic, "published");
            }
            inbound = read.next() => {
                match inbound {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        let frame = frame_from_text(&text);
                        if !emit(signals, cancel, StreamSignal::Frame(frame)).await {
                            return Ok(());
                        }
                    }
                    Some(Ok(tungstenite::Message::Binary(bytes))) => {
                        let frame =
                            Frame::new(DEFAULT_CHANNEL, FramePayload::Binary(bytes.to_vec()));
                        if !emit(signals, cancel, StreamSignal::Frame(frame)).await {
                            return Ok(());
                        }
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite answers pongs automatically
                        tracing::trace!("stream ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(
                                code = %cf.code,
                                reason = %cf.reason,
                                "close frame received"
                            );
                        } else {
                            tracing::info!("close frame received (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        // Stream ended without a close frame
                        tracing::info!("stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Pong, raw frames -- ignore
                    }
                }
            }
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from multiple clients.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let base = config
        .initial_delay
        .as_secs_f64()
        * 2.0_f64.powi(attempt as i32);
    let capped = base.min(config.max_delay.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    // Not cryptographically random, but good enough for backoff spread.
    let jitter_factor = 1.0 + 0.25 * ((attempt as f64 * 7.3).sin());
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── Tests ────────────────────────────────────────────────────────────
