use chrono::{DateTime, Utc};
use hdhomerun_api::{LineupChannel, LineupStatus, TunerStatus};
use hdhomerun_discovery::DiscoveredDevice;
use hdhomerun_protocol::DeviceId;
use serde::Serialize;

use super::tuner::{ChannelFormat, TunerState};

/// Everything known about one device, replaced piecewise on each poll
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    pub device: DiscoveredDevice,
    pub tuner_status: Vec<TunerStatus>,
    pub channels: Vec<LineupChannel>,
    pub lineup_status: Option<LineupStatus>,
    /// Percent complete of a running channel scan
    pub scan_progress: Option<u8>,
    /// False after a failed refresh, until the next successful one
    pub available: bool,
    pub last_details_refresh: Option<DateTime<Utc>>,
    pub last_tuner_refresh: Option<DateTime<Utc>>,
}

/// Channel totals from the lineup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelCounts {
    pub total: usize,
    pub favorite: usize,
    pub disabled: usize,
}

impl DeviceState {
    pub fn new(device: DiscoveredDevice) -> Self {
        Self {
            device,
            tuner_status: Vec::new(),
            channels: Vec::new(),
            lineup_status: None,
            scan_progress: None,
            available: true,
            last_details_refresh: None,
            last_tuner_refresh: None,
        }
    }

    pub fn id(&self) -> Option<DeviceId> {
        self.device.device_id
    }

    pub fn ip(&self) -> &str {
        &self.device.ip
    }

    /// Friendly name, else model, else the device key
    pub fn name(&self) -> String {
        self.device
            .friendly_name
            .clone()
            .or_else(|| self.device.model_number.clone())
            .unwrap_or_else(|| self.device.key())
    }

    pub fn installed_version(&self) -> Option<&str> {
        self.device.firmware_version.as_deref()
    }

    /// The firmware the device offers, or the installed one when it offers
    /// nothing newer
    pub fn latest_version(&self) -> Option<&str> {
        self.device
            .upgrade_available
            .as_deref()
            .or_else(|| self.installed_version())
    }

    pub fn update_available(&self) -> bool {
        match (self.installed_version(), self.latest_version()) {
            (Some(installed), Some(latest)) => installed != latest,
            (None, Some(_)) => true,
            _ => false,
        }
    }

    pub fn channel_counts(&self) -> ChannelCounts {
        ChannelCounts {
            total: self.channels.len(),
            favorite: self.channels.iter().filter(|c| c.is_favorite()).count(),
            disabled: self.channels.iter().filter(|c| c.is_disabled()).count(),
        }
    }

    pub fn favorite_channels(&self) -> Vec<&str> {
        self.channels
            .iter()
            .filter(|c| c.is_favorite())
            .filter_map(|c| c.guide_name.as_deref())
            .collect()
    }

    pub fn disabled_channels(&self) -> Vec<&str> {
        self.channels
            .iter()
            .filter(|c| c.is_disabled())
            .filter_map(|c| c.guide_name.as_deref())
            .collect()
    }

    /// `None` when the device never reported a lineup status
    pub fn channel_scanning(&self) -> Option<bool> {
        self.lineup_status
            .as_ref()
            .and_then(|status| status.scan_in_progress)
    }

    pub fn channel_sources(&self) -> &[String] {
        self.lineup_status
            .as_ref()
            .and_then(|status| status.source_list.as_deref())
            .unwrap_or_default()
    }

    /// Look up a tuner by resource name, ignoring case
    pub fn tuner(&self, resource: &str) -> Option<&TunerStatus> {
        self.tuner_status
            .iter()
            .find(|tuner| tuner.resource.eq_ignore_ascii_case(resource))
    }

    pub fn tuner_states(&self, format: ChannelFormat) -> Vec<(String, TunerState)> {
        self.tuner_status
            .iter()
            .map(|tuner| (tuner.resource.clone(), TunerState::from_status(tuner, format)))
            .collect()
    }
}
