// gatewatch-core: event normalization and reconciliation between the
// stream transport (gatewatch-api) and consumers (CLI).

pub mod command;
pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, DoorAction};
pub use config::SessionConfig;
pub use error::CoreError;
pub use normalize::{MessageCatalog, Normalizer};
pub use session::{ConnectionState, Session};
pub use store::{BadgeActivityMap, DoorStateMap, EventLog};
pub use stream::SnapshotStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{AccessEvent, BadgeObservation, EventStatus};
