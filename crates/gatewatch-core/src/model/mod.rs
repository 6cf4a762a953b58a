// ── Domain model ──

mod event;

pub use event::{AccessEvent, BadgeObservation, EventStatus};
