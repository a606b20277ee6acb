//! HdHomeRunSystem - Main entry point for the SDK
//!
//! Discovers devices (or connects to known hosts), tracks them in a
//! [`StateStore`] and keeps them refreshed with a [`Poller`].

use std::collections::HashMap;
use std::sync::Arc;

use control_client::ControlClient;
use hdhomerun_api::HdHomeRunClient;
use hdhomerun_discovery::{DiscoveredDevice, Discoverer, DiscoveryOptions};
use hdhomerun_state::{ChangeIterator, DeviceId, StateError, StateStore};
use parking_lot::RwLock;
use tokio::runtime::Handle;

use crate::config::PollerConfig;
use crate::device::HdHomeRunDevice;
use crate::poller::{poll_once, Poller, PollingTaskStats, Schedule};
use crate::{Result, SdkError};

/// Main system entry point
///
/// Everything except [`start_polling`](Self::start_polling) is synchronous
/// and blocks on network I/O; call it from `spawn_blocking` in async code.
///
/// # Example
///
/// ```rust,ignore
/// use hdhomerun_sdk::HdHomeRunSystem;
///
/// let system = HdHomeRunSystem::new()?;
/// system.refresh_all();
///
/// for device in system.devices() {
///     for (tuner, state) in device.tuner_states()? {
///         println!("{} {}: {}", device.id, tuner, state);
///     }
/// }
/// ```
pub struct HdHomeRunSystem {
    store: StateStore,
    config: PollerConfig,
    discovery: DiscoveryOptions,
    client: HdHomeRunClient,
    devices: RwLock<HashMap<DeviceId, HdHomeRunDevice>>,
    poller: Poller,
}

impl HdHomeRunSystem {
    /// Discover devices with default options
    pub fn new() -> Result<Self> {
        Self::discover(DiscoveryOptions::default(), PollerConfig::default())
    }

    /// Discover devices and track every one that reports an id
    pub fn discover(discovery: DiscoveryOptions, config: PollerConfig) -> Result<Self> {
        config.validate()?;
        let devices = Discoverer::new(discovery.clone())?.discover()?;
        Self::from_discovered_devices(devices, discovery, config)
    }

    /// Track the devices at the given hosts, skipping discovery
    ///
    /// Each host is asked for its `discover.json`, then sent a targeted UDP
    /// discover. Fails on the first host that answers neither.
    pub fn connect<S: AsRef<str>>(
        hosts: &[S],
        discovery: DiscoveryOptions,
        config: PollerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let discoverer = Discoverer::new(discovery.clone())?;

        let mut devices = Vec::with_capacity(hosts.len());
        for host in hosts {
            let host = host.as_ref();
            let device = discoverer.rediscover(&DiscoveredDevice::new(host));
            if !device.online {
                return Err(SdkError::DeviceNotFound(host.to_string()));
            }
            devices.push(device);
        }

        Self::from_discovered_devices(devices, discovery, config)
    }

    /// Track pre-discovered devices
    ///
    /// Devices without an id cannot be tracked and are skipped.
    pub fn from_discovered_devices(
        devices: Vec<DiscoveredDevice>,
        discovery: DiscoveryOptions,
        config: PollerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let store = StateStore::new();
        let client = HdHomeRunClient::with_control_client(
            ControlClient::new()
                .with_port(config.control_port)
                .with_timeout(config.control_timeout),
        );

        let system = Self {
            poller: Poller::new(store.clone(), config.clone()),
            store,
            config,
            discovery,
            client,
            devices: RwLock::new(HashMap::new()),
        };

        for device in devices {
            match system.add_device(device) {
                Ok(_) => {}
                Err(SdkError::StateError(StateError::MissingDeviceId(ip))) => {
                    tracing::warn!("Skipping device at {} without a device id", ip);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(system)
    }

    /// Track one more device and return its handle
    pub fn add_device(&self, device: DiscoveredDevice) -> Result<HdHomeRunDevice> {
        let id = self.store.add_device(device)?;
        let handle = HdHomeRunDevice::new(
            id,
            self.store.clone(),
            self.client.clone(),
            self.discovery.clone(),
            &self.config,
        );
        self.devices.write().insert(id, handle.clone());
        Ok(handle)
    }

    /// Stop tracking a device
    pub fn remove_device(&self, id: &DeviceId) -> Option<HdHomeRunDevice> {
        self.poller.stop_device(id);
        self.store.remove_device(id);
        self.devices.write().remove(id)
    }

    pub fn device(&self, id: &DeviceId) -> Option<HdHomeRunDevice> {
        self.devices.read().get(id).cloned()
    }

    /// Find a device by id, IP address or friendly name
    pub fn find(&self, key: &str) -> Option<HdHomeRunDevice> {
        let key = key.trim();
        if let Ok(id) = key.parse::<DeviceId>() {
            if let Some(device) = self.device(&id) {
                return Some(device);
            }
        }

        let id = self.store.devices().into_iter().find_map(|state| {
            let matches = state.ip() == key
                || state
                    .device
                    .friendly_name
                    .as_deref()
                    .is_some_and(|name| name.eq_ignore_ascii_case(key));
            if matches {
                state.id()
            } else {
                None
            }
        })?;
        self.device(&id)
    }

    /// Every tracked device, ordered by id
    pub fn devices(&self) -> Vec<HdHomeRunDevice> {
        let mut devices: Vec<_> = self.devices.read().values().cloned().collect();
        devices.sort_by_key(|device| device.id);
        devices
    }

    pub fn device_ids(&self) -> Vec<DeviceId> {
        self.store.device_ids()
    }

    /// Refresh details and tuner status of every device once
    ///
    /// Failures mark the device unavailable and are returned per device.
    pub fn refresh_all(&self) -> Vec<(DeviceId, SdkError)> {
        let mut failures = Vec::new();
        for device in self.devices() {
            for schedule in [Schedule::Details, Schedule::TunerStatus] {
                if let Err(e) = poll_once(&device, &self.store, schedule) {
                    failures.push((device.id, e));
                    break;
                }
            }
        }
        failures
    }

    /// Start polling every device on the current tokio runtime
    pub fn start_polling(&self) -> Result<()> {
        let runtime = Handle::try_current().map_err(|e| SdkError::Task(e.to_string()))?;
        if self.poller.is_running() {
            return Err(SdkError::AlreadyRunning);
        }

        let devices = self.devices();
        tracing::info!("Polling {} device(s)", devices.len());
        for device in devices {
            self.poller.start_device(&runtime, Arc::new(device));
        }
        Ok(())
    }

    pub fn stop_polling(&self) {
        self.poller.stop_all();
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running()
    }

    pub fn polling_stats(&self) -> Vec<PollingTaskStats> {
        self.poller.stats()
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Get the state store for advanced usage
    pub fn state_store(&self) -> &StateStore {
        &self.store
    }

    /// Blocking iterator over change events of watched properties
    pub fn iter(&self) -> ChangeIterator {
        self.store.iter()
    }
}
