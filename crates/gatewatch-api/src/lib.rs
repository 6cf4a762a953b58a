// gatewatch-api: transport layer for the gatewatch access-control monitor.
//
// Carries frames between the broker bridge and gatewatch-core without
// interpreting their business content: WebSocket stream with reconnect,
// payload decoding, topic filters, and the orchestrator HTTP client.

pub mod error;
pub mod frame;
pub mod orchestrator;
pub mod stream;
pub mod topic;

pub use error::Error;
pub use frame::{DecodeError, Frame, FramePayload, decode, try_decode};
pub use stream::{ReconnectConfig, StreamConfig, StreamHandle, StreamSignal};
pub use topic::TopicFilter;
