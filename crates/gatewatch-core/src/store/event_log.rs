// ── Bounded event log ──
//
// Append-only, newest-first, capacity-bounded. Ordering is insertion
// order, never the events' embedded timestamps: a late frame with an
// earlier `ts` still lands at the head.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use tokio::sync::watch;

use crate::model::AccessEvent;

/// Default retained-event capacity.
pub const DEFAULT_CAPACITY: usize = 200;

/// Newest-first bounded log of normalized events.
///
/// Writes go through the single ingest task; reads are wait-free `Arc`
/// snapshot clones. Every mutation rebuilds the snapshot that `watch`
/// subscribers receive and bumps a version counter.
pub struct EventLog {
    capacity: usize,
    entries: Mutex<VecDeque<Arc<AccessEvent>>>,
    version: watch::Sender<u64>,
    snapshot: watch::Sender<Arc<Vec<Arc<AccessEvent>>>>,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
            version,
            snapshot,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Prepend an event, dropping the oldest entry once over capacity.
    pub fn append(&self, event: AccessEvent) {
        {
            let Ok(mut entries) = self.entries.lock() else {
                return;
            };
            entries.push_front(Arc::new(event));
            entries.truncate(self.capacity);
        }
        self.rebuild_snapshot();
        self.bump_version();
    }

    /// Drop every retained event. Connection state is untouched.
    pub fn clear(&self) {
        {
            let Ok(mut entries) = self.entries.lock() else {
                return;
            };
            entries.clear();
        }
        self.rebuild_snapshot();
        self.bump_version();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the current snapshot (cheap `Arc` clone), newest first.
    pub fn snapshot(&self) -> Arc<Vec<Arc<AccessEvent>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<AccessEvent>>>> {
        self.snapshot.subscribe()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Collect entries into a snapshot vec and broadcast to subscribers.
    fn rebuild_snapshot(&self) {
        let values: Vec<Arc<AccessEvent>> = self
            .entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;

    fn event(tag: &str) -> AccessEvent {
        // Embed the tag in the raw text so order is observable.
        Normalizer::default().normalize(&format!("{{\"type\":\"{tag}\"}}"), "test")
    }

    #[test]
    fn append_prepends_newest_first() {
        let log = EventLog::new(10);
        log.append(event("e1"));
        log.append(event("e2"));

        let snap = log.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].topic, "e2");
        assert_eq!(snap[1].topic, "e1");
    }

    #[test]
    fn insertion_order_ignores_embedded_timestamps() {
        let normalizer = Normalizer::default();
        let log = EventLog::new(10);

        // Later-arriving event carries an *earlier* embedded timestamp.
        log.append(normalizer.normalize(r#"{"type":"a","ts":"2024-06-01T00:00:00Z"}"#, "t"));
        log.append(normalizer.normalize(r#"{"type":"b","ts":"2024-01-01T00:00:00Z"}"#, "t"));

        let snap = log.snapshot();
        assert_eq!(snap[0].topic, "b");
        assert_eq!(snap[1].topic, "a");
    }

    #[test]
    fn capacity_bound_drops_oldest() {
        let log = EventLog::new(200);
        for i in 0..201 {
            log.append(event(&format!("evt-{i}")));
        }

        assert_eq!(log.len(), 200);
        let snap = log.snapshot();
        assert_eq!(snap.len(), 200);
        // First-appended event is gone; 2nd..=201st remain, newest first.
        assert_eq!(snap[0].topic, "evt-200");
        assert_eq!(snap[199].topic, "evt-1");
        assert!(snap.iter().all(|e| e.topic != "evt-0"));
    }

    #[test]
    fn small_capacity_is_respected_on_every_append() {
        let log = EventLog::new(3);
        for i in 0..10 {
            log.append(event(&format!("evt-{i}")));
            assert!(log.len() <= 3);
        }
        let snap = log.snapshot();
        assert_eq!(snap[0].topic, "evt-9");
        assert_eq!(snap[2].topic, "evt-7");
    }

    #[test]
    fn clear_empties_the_log() {
        let log = EventLog::new(10);
        log.append(event("e1"));
        log.append(event("e2"));

        log.clear();
        assert!(log.is_empty());
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn subscribers_observe_appends() {
        let log = EventLog::new(10);
        let mut rx = log.subscribe();

        log.append(event("e1"));
        assert!(rx.has_changed().unwrap());
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.len(), 1);
    }

    #[test]
    fn snapshots_are_immutable_references() {
        let log = EventLog::new(10);
        log.append(event("e1"));

        let before = log.snapshot();
        log.append(event("e2"));

        // The earlier snapshot is untouched by later mutation.
        assert_eq!(before.len(), 1);
        assert_eq!(log.snapshot().len(), 2);
    }
}
