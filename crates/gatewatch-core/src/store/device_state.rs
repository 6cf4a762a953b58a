// ── Per-device projections ──
//
// Folded from the same inbound stream that feeds the event log. Entries
// are last-write-wins and never evicted; cardinality is bounded by the
// number of distinct devices, which is operationally small.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use crate::model::BadgeObservation;

/// Live door state: device id → is the door open.
pub struct DoorStateMap {
    states: DashMap<String, bool>,
    version: watch::Sender<u64>,
    snapshot: watch::Sender<Arc<HashMap<String, bool>>>,
}

impl DoorStateMap {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(HashMap::new()));
        Self {
            states: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Record the most recent open/closed state for a device.
    pub fn set(&self, device_id: &str, is_open: bool) {
        self.states.insert(device_id.to_string(), is_open);
        self.rebuild_snapshot();
        self.version.send_modify(|v| *v += 1);
    }

    pub fn get(&self, device_id: &str) -> Option<bool> {
        self.states.get(device_id).map(|entry| *entry.value())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn snapshot(&self) -> Arc<HashMap<String, bool>> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<HashMap<String, bool>>> {
        self.snapshot.subscribe()
    }

    fn rebuild_snapshot(&self) {
        let map: HashMap<String, bool> = self
            .states
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        self.snapshot.send_modify(|snap| *snap = Arc::new(map));
    }
}

impl Default for DoorStateMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Last badge observation per badge-reader device.
pub struct BadgeActivityMap {
    observations: DashMap<String, Arc<BadgeObservation>>,
    version: watch::Sender<u64>,
    snapshot: watch::Sender<Arc<HashMap<String, Arc<BadgeObservation>>>>,
}

impl BadgeActivityMap {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(HashMap::new()));
        Self {
            observations: DashMap::new(),
            version,
            snapshot,
        }
    }

    pub fn set(&self, observation: BadgeObservation) {
        self.observations
            .insert(observation.device_id.clone(), Arc::new(observation));
        self.rebuild_snapshot();
        self.version.send_modify(|v| *v += 1);
    }

    pub fn get(&self, device_id: &str) -> Option<Arc<BadgeObservation>> {
        self.observations
            .get(device_id)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn snapshot(&self) -> Arc<HashMap<String, Arc<BadgeObservation>>> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(
        &self,
    ) -> watch::Receiver<Arc<HashMap<String, Arc<BadgeObservation>>>> {
        self.snapshot.subscribe()
    }

    fn rebuild_snapshot(&self) {
        let map: HashMap<String, Arc<BadgeObservation>> = self
            .observations
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        self.snapshot.send_modify(|snap| *snap = Arc::new(map));
    }
}

impl Default for BadgeActivityMap {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────────
