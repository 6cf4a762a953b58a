// ── Reactive session stores ──
//
// Bounded event log and per-device projections with push-based change
// notification. Mutated only from the single ingest task; consumers see
// immutable snapshots through `watch` channels.

mod device_state;
mod event_log;

pub use device_state::{BadgeActivityMap, DoorStateMap};
pub use event_log::{DEFAULT_CAPACITY, EventLog};
