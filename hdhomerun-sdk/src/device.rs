//! Device handle with refresh and action methods
//!
//! A handle holds no device data of its own. Every refresh reads the
//! current record from the [`StateStore`], talks to the device and writes
//! the result back, so handles are cheap to clone and share with the
//! poller.

use std::net::IpAddr;
use std::time::Duration;

use hdhomerun_api::operations::{
    GetHwModelOperation, GetModelOperation, GetVersionOperation, RestartOperation, SystemRequest,
};
use hdhomerun_api::{ApiError, DeviceHttpClient, HdHomeRunClient, LineupChannel, LineupStatus};
use hdhomerun_discovery::{DiscoverMode, DiscoveredDevice, Discoverer, DiscoveryMethod, DiscoveryOptions};
use hdhomerun_state::{
    ChannelFormat, DeviceId, DeviceState, Property, StateError, StateStore, TunerState,
};
use serde_json::Value;

use crate::config::PollerConfig;
use crate::{Result, SdkError};

/// Handle to one tracked device
///
/// # Example
///
/// ```rust,ignore
/// let device = system.device(&id).ok_or(SdkError::DeviceNotFound(id.to_string()))?;
///
/// device.gather_details()?;
/// device.refresh_tuner_status()?;
///
/// for (tuner, state) in device.tuner_states()? {
///     println!("{}: {}", tuner, state);
/// }
/// ```
#[derive(Clone)]
pub struct HdHomeRunDevice {
    pub id: DeviceId,
    store: StateStore,
    client: HdHomeRunClient,
    discovery: DiscoveryOptions,
    http_timeout: Duration,
    channel_format: ChannelFormat,
}

impl HdHomeRunDevice {
    pub fn new(
        id: DeviceId,
        store: StateStore,
        client: HdHomeRunClient,
        discovery: DiscoveryOptions,
        config: &PollerConfig,
    ) -> Self {
        Self {
            id,
            store,
            client,
            discovery,
            http_timeout: config.http_timeout,
            channel_format: config.channel_format,
        }
    }

    /// Snapshot of the device's state
    pub fn state(&self) -> Result<DeviceState> {
        self.store
            .device(&self.id)
            .ok_or(SdkError::StateError(StateError::DeviceNotFound(self.id)))
    }

    pub fn ip(&self) -> Result<String> {
        Ok(self.state()?.device.ip)
    }

    pub fn name(&self) -> Result<String> {
        Ok(self.state()?.name())
    }

    /// Refresh names, firmware, lineup and lineup status
    ///
    /// HTTP-discovered devices are asked for `discover.json`, the lineup and
    /// the lineup status. An error status from one of these leaves the
    /// previous value in place; an unreachable device fails the refresh.
    /// Everything else gets a targeted UDP discover and the `/sys/version`,
    /// `/sys/model` and `/sys/hwmodel` variables.
    pub fn gather_details(&self) -> Result<Vec<Property>> {
        let state = self.state()?;

        let (device, channels, lineup_status) = match state.device.method {
            Some(DiscoveryMethod::Http) => {
                tracing::debug!("Gathering details of {} using HTTP", self.id);
                self.gather_details_http(state.device, state.channels, state.lineup_status)?
            }
            _ => {
                tracing::debug!("Gathering details of {} using UDP", self.id);
                let device = self.gather_details_udp(state.device)?;
                (device, state.channels, state.lineup_status)
            }
        };

        let scan_progress = lineup_status
            .as_ref()
            .filter(|status| status.is_scanning())
            .and_then(|status| status.progress);

        let mut changed = self
            .store
            .set_details(&self.id, device, channels, lineup_status)?;
        changed.extend(self.store.set_scan_progress(&self.id, scan_progress)?);
        Ok(changed)
    }

    fn gather_details_http(
        &self,
        mut device: DiscoveredDevice,
        channels: Vec<LineupChannel>,
        lineup_status: Option<LineupStatus>,
    ) -> Result<(DiscoveredDevice, Vec<LineupChannel>, Option<LineupStatus>)> {
        let http = self.http_client(&device)?;

        match http.discover() {
            Ok(json) => device.apply_discover_json(&json),
            Err(e) => tracing::debug!("Local discover of {} failed: {}", device.ip, e),
        }

        let channels = unless_http_status(http.lineup(), "lineup", &device.ip)?.unwrap_or(channels);
        let lineup_status =
            unless_http_status(http.lineup_status(), "lineup status", &device.ip)?.or(lineup_status);
        Ok((device, channels, lineup_status))
    }

    fn gather_details_udp(&self, mut device: DiscoveredDevice) -> Result<DiscoveredDevice> {
        match device.ip.parse::<IpAddr>() {
            Ok(ip) => match self.search_udp(ip) {
                Ok(Some(reply)) => device.overlay_udp(&reply),
                Ok(None) => tracing::debug!("No UDP reply from {}", ip),
                Err(e) => tracing::debug!("Targeted UDP discover of {} failed: {}", ip, e),
            },
            Err(e) => tracing::debug!("Skipping UDP discover of {}: {}", device.ip, e),
        }

        let request = SystemRequest;
        device.firmware_version = Some(self.client.execute::<GetVersionOperation>(&device.ip, &request)?);
        device.firmware_name = Some(self.client.execute::<GetModelOperation>(&device.ip, &request)?);
        device.model_number = Some(self.client.execute::<GetHwModelOperation>(&device.ip, &request)?);
        Ok(device)
    }

    fn search_udp(&self, ip: IpAddr) -> Result<Option<DiscoveredDevice>> {
        let options = self
            .discovery
            .clone()
            .with_mode(DiscoverMode::Udp)
            .with_broadcast_address(ip);
        let discoverer = Discoverer::new(options)?;
        let address = ip.to_string();
        let found = discoverer.search(ip)?.find(|reply| reply.ip == address);
        Ok(found)
    }

    /// Refresh the status of every tuner
    ///
    /// Uses `status.json` for HTTP-discovered devices that are not legacy,
    /// and the control protocol otherwise.
    pub fn refresh_tuner_status(&self) -> Result<Vec<Property>> {
        let device = self.state()?.device;

        let tuners = if device.method == Some(DiscoveryMethod::Http) && !device.legacy {
            tracing::debug!("Refreshing tuner status of {} using HTTP", self.id);
            self.http_client(&device)?.tuner_status()?
        } else {
            tracing::debug!("Refreshing tuner status of {} using the control protocol", self.id);
            let tuner_count = device
                .tuner_count
                .ok_or_else(|| SdkError::UnknownTunerCount(device.ip.clone()))?;
            self.client.tuner_status_via_control(&device.ip, tuner_count)?
        };

        Ok(self.store.set_tuner_status(&self.id, tuners)?)
    }

    /// Whether a channel scan is known to be running
    pub fn scan_running(&self) -> Result<bool> {
        let state = self.state()?;
        Ok(state.scan_progress.is_some() || state.channel_scanning() == Some(true))
    }

    /// Follow a running channel scan
    ///
    /// Does nothing unless a scan is known to be running. When the device
    /// reports the scan finished, the lineup is fetched again.
    pub fn refresh_scan_progress(&self) -> Result<Vec<Property>> {
        if !self.scan_running()? {
            return Ok(Vec::new());
        }
        let state = self.state()?;

        let http = self.http_client(&state.device)?;
        let status = http.lineup_status()?;
        let scanning = status.is_scanning();
        let progress = if scanning { status.progress } else { None };

        let mut changed = self.store.update(&self.id, |state| {
            state.lineup_status = Some(status);
            state.scan_progress = progress;
        })?;

        if !scanning {
            tracing::info!("Channel scan finished on {}", self.id);
            let channels = http.lineup()?;
            changed.extend(self.store.update(&self.id, |state| state.channels = channels)?);
        }
        Ok(changed)
    }

    /// Restart the device
    pub fn restart(&self) -> Result<()> {
        let ip = self.ip()?;
        tracing::info!("Restarting {} at {}", self.id, ip);
        self.client.execute::<RestartOperation>(&ip, &SystemRequest)?;
        Ok(())
    }

    /// Start a channel scan from `source`, one of the device's channel sources
    pub fn start_channel_scan(&self, source: &str) -> Result<()> {
        let device = self.state()?.device;
        self.http_client(&device)?.start_channel_scan(source)?;
        self.store.set_scan_progress(&self.id, Some(0))?;
        Ok(())
    }

    /// Scan progress as reported by the device right now
    ///
    /// `None` when no scan is running or the device could not be asked.
    pub fn channel_scan_progress(&self) -> Result<Option<u8>> {
        let device = self.state()?.device;
        Ok(self.http_client(&device)?.channel_scan_progress())
    }

    /// Read a control protocol variable
    pub fn get_variable(&self, name: &str) -> Result<String> {
        let ip = self.ip()?;
        Ok(self.client.get_variable(&ip, name)?)
    }

    /// Write a control protocol variable, returning the value the device reports
    pub fn set_variable(&self, name: &str, value: &str) -> Result<String> {
        let ip = self.ip()?;
        Ok(self.client.set_variable(&ip, name, value)?)
    }

    /// Tuner states rendered with the configured channel format
    pub fn tuner_states(&self) -> Result<Vec<(String, TunerState)>> {
        Ok(self.state()?.tuner_states(self.channel_format))
    }

    /// Redacted diagnostics snapshot
    pub fn diagnostics(&self) -> Result<Value> {
        Ok(hdhomerun_state::device_diagnostics(&self.state()?)?)
    }

    fn http_client(&self, device: &DiscoveredDevice) -> Result<DeviceHttpClient> {
        if device.base_url.is_none() && device.method != Some(DiscoveryMethod::Http) {
            return Err(SdkError::HttpNotAvailable(device.ip.clone()));
        }
        Ok(DeviceHttpClient::with_timeout(device.http_base(), self.http_timeout))
    }
}

/// `None` for an HTTP error status, logged and left for the caller to
/// fall back on the previous value
fn unless_http_status<T>(result: hdhomerun_api::Result<T>, what: &str, ip: &str) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ApiError::HttpStatus(code)) => {
            tracing::warn!("Fetching the {} of {} returned HTTP {}", what, ip, code);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

impl std::fmt::Debug for HdHomeRunDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HdHomeRunDevice")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
