//! Shared in-memory store of device state
//!
//! The store is cheap to clone; clones share the same devices, watch set and
//! change channel. Writers go through [`StateStore::update`], which compares
//! each [`Property`] before and after the change and emits a
//! [`ChangeEvent`] for every watched property that actually changed.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use hdhomerun_api::{LineupChannel, LineupStatus, TunerStatus};
use hdhomerun_discovery::DiscoveredDevice;
use hdhomerun_protocol::DeviceId;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::iter::ChangeIterator;
use crate::model::DeviceState;
use crate::{Result, StateError};

/// Parts of a [`DeviceState`] that can be watched for changes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Available,
    /// Discovery details: names, URLs, firmware
    Details,
    TunerStatus,
    Channels,
    LineupStatus,
    ScanProgress,
}

impl Property {
    pub const ALL: [Property; 6] = [
        Property::Available,
        Property::Details,
        Property::TunerStatus,
        Property::Channels,
        Property::LineupStatus,
        Property::ScanProgress,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Property::Available => "available",
            Property::Details => "details",
            Property::TunerStatus => "tuner_status",
            Property::Channels => "channels",
            Property::LineupStatus => "lineup_status",
            Property::ScanProgress => "scan_progress",
        }
    }

    fn differs(&self, before: &DeviceState, after: &DeviceState) -> bool {
        match self {
            Property::Available => before.available != after.available,
            Property::Details => before.device != after.device,
            Property::TunerStatus => before.tuner_status != after.tuner_status,
            Property::Channels => before.channels != after.channels,
            Property::LineupStatus => before.lineup_status != after.lineup_status,
            Property::ScanProgress => before.scan_progress != after.scan_progress,
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A change event emitted when a watched property changes
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub device_id: DeviceId,
    pub property: Property,
    pub timestamp: Instant,
}

impl ChangeEvent {
    pub fn new(device_id: DeviceId, property: Property) -> Self {
        Self {
            device_id,
            property,
            timestamp: Instant::now(),
        }
    }
}

/// Device states keyed by device id
#[derive(Clone)]
pub struct StateStore {
    devices: Arc<RwLock<HashMap<DeviceId, DeviceState>>>,
    watched: Arc<RwLock<HashSet<(DeviceId, Property)>>>,
    event_tx: mpsc::Sender<ChangeEvent>,
    event_rx: Arc<Mutex<mpsc::Receiver<ChangeEvent>>>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        Self {
            devices: Arc::new(RwLock::new(HashMap::new())),
            watched: Arc::new(RwLock::new(HashSet::new())),
            event_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        }
    }

    /// Track a discovered device, replacing any earlier state for the same id
    pub fn add_device(&self, device: DiscoveredDevice) -> Result<DeviceId> {
        let id = device
            .device_id
            .ok_or_else(|| StateError::MissingDeviceId(device.ip.clone()))?;

        tracing::debug!("Tracking device {} at {}", id, device.ip);
        self.devices.write().insert(id, DeviceState::new(device));
        Ok(id)
    }

    pub fn remove_device(&self, id: &DeviceId) -> Option<DeviceState> {
        self.watched.write().retain(|(device, _)| device != id);
        self.devices.write().remove(id)
    }

    /// Snapshot of one device
    pub fn device(&self, id: &DeviceId) -> Option<DeviceState> {
        self.devices.read().get(id).cloned()
    }

    /// Snapshot of every device, ordered by id
    pub fn devices(&self) -> Vec<DeviceState> {
        let mut devices: Vec<_> = self.devices.read().values().cloned().collect();
        devices.sort_by_key(|state| state.id());
        devices
    }

    pub fn device_ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<_> = self.devices.read().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, id: &DeviceId) -> bool {
        self.devices.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.devices.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().is_empty()
    }

    /// Apply `change` to a device and emit events for watched properties
    /// that changed. Returns every property that changed.
    pub fn update<F>(&self, id: &DeviceId, change: F) -> Result<Vec<Property>>
    where
        F: FnOnce(&mut DeviceState),
    {
        let changed: Vec<Property> = {
            let mut devices = self.devices.write();
            let state = devices.get_mut(id).ok_or(StateError::DeviceNotFound(*id))?;
            let before = state.clone();
            change(state);
            Property::ALL
                .into_iter()
                .filter(|property| property.differs(&before, state))
                .collect()
        };

        for property in &changed {
            self.maybe_emit_change(id, *property);
        }
        Ok(changed)
    }

    pub fn set_available(&self, id: &DeviceId, available: bool) -> Result<Vec<Property>> {
        self.update(id, |state| state.available = available)
    }

    /// Store the result of a successful details refresh
    pub fn set_details(
        &self,
        id: &DeviceId,
        device: DiscoveredDevice,
        channels: Vec<LineupChannel>,
        lineup_status: Option<LineupStatus>,
    ) -> Result<Vec<Property>> {
        self.update(id, |state| {
            state.device = device;
            state.channels = channels;
            state.lineup_status = lineup_status;
            state.available = true;
            state.last_details_refresh = Some(Utc::now());
        })
    }

    /// Store the result of a successful tuner refresh
    pub fn set_tuner_status(&self, id: &DeviceId, tuners: Vec<TunerStatus>) -> Result<Vec<Property>> {
        self.update(id, |state| {
            state.tuner_status = tuners;
            state.available = true;
            state.last_tuner_refresh = Some(Utc::now());
        })
    }

    pub fn set_scan_progress(&self, id: &DeviceId, progress: Option<u8>) -> Result<Vec<Property>> {
        self.update(id, |state| state.scan_progress = progress)
    }

    /// Emit change events for `property` on this device
    pub fn watch(&self, id: &DeviceId, property: Property) {
        self.watched.write().insert((*id, property));
    }

    /// Emit change events for every property of this device
    pub fn watch_all(&self, id: &DeviceId) {
        let mut watched = self.watched.write();
        for property in Property::ALL {
            watched.insert((*id, property));
        }
    }

    pub fn unwatch(&self, id: &DeviceId, property: Property) {
        self.watched.write().remove(&(*id, property));
    }

    pub fn is_watched(&self, id: &DeviceId, property: Property) -> bool {
        self.watched.read().contains(&(*id, property))
    }

    /// Iterator over change events of watched properties
    ///
    /// All iterators share one queue: each event is delivered once.
    pub fn iter(&self) -> ChangeIterator {
        ChangeIterator::new(Arc::clone(&self.event_rx))
    }

    fn maybe_emit_change(&self, id: &DeviceId, property: Property) {
        if self.is_watched(id, property) {
            tracing::trace!("{} changed on {}", property, id);
            let _ = self.event_tx.send(ChangeEvent::new(*id, property));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const FLEX: DeviceId = DeviceId::new(0x1040_ABCD);

    fn device(id: DeviceId) -> DiscoveredDevice {
        DiscoveredDevice {
            device_id: Some(id),
            tuner_count: Some(4),
            ..DiscoveredDevice::new("192.168.1.50")
        }
    }

    fn store() -> StateStore {
        let store = StateStore::new();
        store.add_device(device(FLEX)).unwrap();
        store
    }

    #[test]
    fn test_store_creation() {
        let store = StateStore::new();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_add_device_requires_id() {
        let store = StateStore::new();
        let result = store.add_device(DiscoveredDevice::new("192.168.1.60"));
        assert!(matches!(result, Err(StateError::MissingDeviceId(ip)) if ip == "192.168.1.60"));
    }

    #[test]
    fn test_update_unknown_device() {
        let store = StateStore::new();
        let result = store.set_available(&FLEX, false);
        assert!(matches!(result, Err(StateError::DeviceNotFound(_))));
    }

    #[test]
    fn test_update_reports_changed_properties() {
        let store = store();

        let changed = store
            .set_tuner_status(&FLEX, vec![TunerStatus::new("tuner0")])
            .unwrap();
        assert_eq!(changed, vec![Property::TunerStatus]);

        let changed = store
            .set_tuner_status(&FLEX, vec![TunerStatus::new("tuner0")])
            .unwrap();
        assert!(changed.is_empty());

        assert!(store.device(&FLEX).unwrap().last_tuner_refresh.is_some());
    }

    #[test]
    fn test_watch_registration() {
        let store = store();
        assert!(!store.is_watched(&FLEX, Property::Available));

        store.watch(&FLEX, Property::Available);
        assert!(store.is_watched(&FLEX, Property::Available));

        store.unwatch(&FLEX, Property::Available);
        assert!(!store.is_watched(&FLEX, Property::Available));
    }

    #[test]
    fn test_only_watched_changes_emit_events() {
        let store = store();
        store.watch(&FLEX, Property::Available);

        store.set_scan_progress(&FLEX, Some(10)).unwrap();
        store.set_available(&FLEX, true).unwrap();
        store.set_available(&FLEX, false).unwrap();

        let iter = store.iter();
        let event = iter.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(event.device_id, FLEX);
        assert_eq!(event.property, Property::Available);
        assert!(iter.try_recv().is_none());
    }

    #[test]
    fn test_set_details_restores_availability() {
        let store = store();
        store.watch_all(&FLEX);
        store.set_available(&FLEX, false).unwrap();

        let mut refreshed = device(FLEX);
        refreshed.friendly_name = Some("HDHomeRun FLEX 4K".to_string());
        let changed = store
            .set_details(&FLEX, refreshed, Vec::new(), Some(LineupStatus::default()))
            .unwrap();

        assert!(changed.contains(&Property::Available));
        assert!(changed.contains(&Property::Details));
        assert!(changed.contains(&Property::LineupStatus));
        assert!(!changed.contains(&Property::Channels));

        let events: Vec<_> = store.iter().try_iter().map(|e| e.property).collect();
        assert_eq!(events.len(), 4);
    }

    #[test]
    fn test_clones_share_state() {
        let store = store();
        let clone = store.clone();

        clone.set_available(&FLEX, false).unwrap();
        assert!(!store.device(&FLEX).unwrap().available);
    }

    #[test]
    fn test_remove_device_drops_watches() {
        let store = store();
        store.watch_all(&FLEX);

        assert!(store.remove_device(&FLEX).is_some());
        assert!(!store.is_watched(&FLEX, Property::Details));
        assert!(!store.contains(&FLEX));
    }
}
