//! Core discovery logic.
//!
//! This module implements the discovery algorithm that:
//! 1. Asks the HTTP discover service for known devices
//! 2. Broadcasts a UDP discover request and collects replies
//! 3. Merges both lists, UDP values winning where present
//! 4. Rediscovers each device over HTTP for its friendly details

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use hdhomerun_protocol::DISCOVER_UDP_PORT;
use serde::{Deserialize, Serialize};

use crate::device::{DiscoveredDevice, DiscoveryMethod};
use crate::error::{DiscoveryError, Result};
use crate::http::HttpDiscoverer;
use crate::udp::{self, UdpReplies};

/// Cloud service listing devices registered from the caller's network.
pub const CLOUD_DISCOVER_URL: &str = "https://ipv4-api.hdhomerun.com/discover";

/// Which discovery mechanisms to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoverMode {
    /// HTTP first, then UDP
    #[default]
    Auto,
    Http,
    Udp,
}

/// Configuration for a discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub mode: DiscoverMode,
    /// Broadcast address, or a single device address for a targeted search
    pub broadcast_address: IpAddr,
    /// Network interface to send the broadcast from
    pub interface: Option<String>,
    /// How long to collect UDP replies
    pub udp_timeout: Duration,
    /// Timeout for each HTTP request
    pub http_timeout: Duration,
    pub cloud_url: String,
    pub port: u16,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            mode: DiscoverMode::Auto,
            broadcast_address: IpAddr::V4(Ipv4Addr::BROADCAST),
            interface: None,
            udp_timeout: Duration::from_secs(1),
            http_timeout: Duration::from_millis(2500),
            cloud_url: CLOUD_DISCOVER_URL.to_string(),
            port: DISCOVER_UDP_PORT,
        }
    }
}

impl DiscoveryOptions {
    /// Only ask the HTTP discover service.
    pub fn http_only() -> Self {
        Self {
            mode: DiscoverMode::Http,
            ..Self::default()
        }
    }

    /// Only broadcast on the local network.
    pub fn udp_only() -> Self {
        Self {
            mode: DiscoverMode::Udp,
            ..Self::default()
        }
    }

    /// Search for a single device by address.
    pub fn targeted(ip: IpAddr) -> Self {
        Self {
            mode: DiscoverMode::Udp,
            broadcast_address: ip,
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: DiscoverMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_broadcast_address(mut self, address: IpAddr) -> Self {
        self.broadcast_address = address;
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    pub fn with_udp_timeout(mut self, timeout: Duration) -> Self {
        self.udp_timeout = timeout;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_cloud_url(mut self, url: impl Into<String>) -> Self {
        self.cloud_url = url.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Runs discovery according to a set of [`DiscoveryOptions`].
pub struct Discoverer {
    options: DiscoveryOptions,
    http: HttpDiscoverer,
}

impl Discoverer {
    pub fn new(options: DiscoveryOptions) -> Result<Self> {
        let http = HttpDiscoverer::new(options.http_timeout)?;
        Ok(Self { options, http })
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Find devices using the configured mode.
    pub fn discover(&self) -> Result<Vec<DiscoveredDevice>> {
        let mode = self.options.mode;
        tracing::debug!("Discovering devices, mode: {:?}", mode);

        let mut http_devices = Vec::new();
        let mut http_error = None;
        if matches!(mode, DiscoverMode::Auto | DiscoverMode::Http) {
            match self.http.discover(&self.options.cloud_url) {
                Ok(devices) => http_devices = devices,
                Err(e) if mode == DiscoverMode::Http => return Err(e),
                Err(e) => {
                    tracing::debug!("{}", e);
                    http_error = Some(e);
                }
            }
        }

        let mut udp_devices = Vec::new();
        if matches!(mode, DiscoverMode::Auto | DiscoverMode::Udp) {
            match self.search(self.options.broadcast_address) {
                Ok(replies) => udp_devices = replies.collect(),
                Err(e) if mode == DiscoverMode::Udp || http_error.is_some() => return Err(e),
                Err(e) => tracing::warn!("UDP discovery failed: {}", e),
            }
        }

        let mut devices = merge(http_devices, udp_devices);

        if !devices.is_empty() {
            tracing::debug!("Attempting targeted rediscover via HTTP");
        }
        for device in &mut devices {
            self.rediscover_http(device);
        }

        tracing::debug!("{} device(s) found", devices.len());
        Ok(devices)
    }

    /// Broadcast (or send to a single address) and iterate the replies.
    pub fn search(&self, target: IpAddr) -> Result<UdpReplies> {
        udp::search(
            SocketAddr::new(target, self.options.port),
            self.options.interface.as_deref(),
            self.options.udp_timeout,
        )
    }

    /// Refresh a single device.
    ///
    /// Tries the device's `discover.json`, then a UDP search aimed at its
    /// address. The returned copy is marked offline when neither answers.
    pub fn rediscover(&self, device: &DiscoveredDevice) -> DiscoveredDevice {
        let mut refreshed = device.clone();

        if self.rediscover_http(&mut refreshed) {
            refreshed.online = true;
            return refreshed;
        }

        let found = device
            .ip
            .parse::<IpAddr>()
            .map_err(|e| DiscoveryError::NetworkError(format!("{}: {}", device.ip, e)))
            .and_then(|ip| self.search(ip))
            .map(|mut replies| replies.find(|reply| reply.ip == device.ip));

        match found {
            Ok(Some(reply)) => {
                refreshed.overlay_udp(&reply);
                refreshed.online = true;
            }
            Ok(None) => refreshed.online = false,
            Err(e) => {
                tracing::debug!("Targeted UDP rediscover of {} failed: {}", device.ip, e);
                refreshed.online = false;
            }
        }

        tracing::debug!("{} online: {}", device.ip, refreshed.online);
        refreshed
    }

    /// Overlay the device's own `discover.json`. Returns whether it answered.
    fn rediscover_http(&self, device: &mut DiscoveredDevice) -> bool {
        let url = device.local_discover_url();
        let listed = match self.http.discover(&url) {
            Ok(listed) => listed,
            Err(e) => {
                tracing::debug!("Rediscover of {} via {} failed: {}", device.ip, url, e);
                return false;
            }
        };

        let Some(update) = listed.into_iter().next() else {
            return false;
        };

        device.overlay_http(&update);
        device.discover_url = Some(url);
        device.method = Some(DiscoveryMethod::Http);
        true
    }
}

/// Merge HTTP and UDP results.
///
/// Devices only seen over UDP are appended; for devices seen by both, UDP
/// values overlay the HTTP ones where present.
pub(crate) fn merge(
    http: Vec<DiscoveredDevice>,
    udp: Vec<DiscoveredDevice>,
) -> Vec<DiscoveredDevice> {
    let mut devices = http;
    for found in udp {
        match devices.iter_mut().find(|known| known.key() == found.key()) {
            Some(known) => known.overlay_udp(&found),
            None => devices.push(found),
        }
    }
    devices
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdhomerun_protocol::DeviceId;

    fn http_device(id: u32, ip: &str) -> DiscoveredDevice {
        DiscoveredDevice {
            device_id: Some(DeviceId::new(id)),
            friendly_name: Some("HDHomeRun FLEX 4K".to_string()),
            tuner_count: Some(4),
            method: Some(DiscoveryMethod::Http),
            ..DiscoveredDevice::new(ip)
        }
    }

    fn udp_device(id: u32, ip: &str) -> DiscoveredDevice {
        DiscoveredDevice {
            device_id: Some(DeviceId::new(id)),
            tuner_count: Some(2),
            method: Some(DiscoveryMethod::Udp),
            ..DiscoveredDevice::new(ip)
        }
    }

    #[test]
    fn test_merge_adds_udp_only_devices() {
        let merged = merge(
            vec![http_device(0x1040_ABCD, "192.168.1.50")],
            vec![udp_device(0x1010_0001, "192.168.1.60")],
        );

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[1].method, Some(DiscoveryMethod::Udp));
    }

    #[test]
    fn test_merge_overlays_udp_values() {
        let merged = merge(
            vec![http_device(0x1040_ABCD, "192.168.1.50")],
            vec![udp_device(0x1040_ABCD, "192.168.1.50")],
        );

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].tuner_count, Some(2));
        assert_eq!(merged[0].friendly_name.as_deref(), Some("HDHomeRun FLEX 4K"));
        assert_eq!(merged[0].method, Some(DiscoveryMethod::Http));
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge(Vec::new(), Vec::new()).is_empty());
    }

    #[test]
    fn test_default_options() {
        let options = DiscoveryOptions::default();
        assert_eq!(options.mode, DiscoverMode::Auto);
        assert_eq!(options.broadcast_address, IpAddr::V4(Ipv4Addr::BROADCAST));
        assert_eq!(options.udp_timeout, Duration::from_secs(1));
        assert_eq!(options.http_timeout, Duration::from_millis(2500));
        assert_eq!(options.port, 65001);
    }

    #[test]
    fn test_targeted_options() {
        let ip: IpAddr = "192.168.1.50".parse().unwrap();
        let options = DiscoveryOptions::targeted(ip);
        assert_eq!(options.mode, DiscoverMode::Udp);
        assert_eq!(options.broadcast_address, ip);
    }
}
