//! Client for the JSON endpoints served from a device's base URL.

use std::time::Duration;

use hdhomerun_discovery::DiscoverJson;
use serde::de::DeserializeOwned;

use crate::models::{LineupChannel, LineupStatus, TunerStatus};
use crate::{ApiError, Result};

/// Default timeout for device HTTP requests
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_millis(2500);

/// Device endpoint paths, relative to the base URL
pub mod paths {
    pub const DISCOVER: &str = "discover.json";
    pub const LINEUP: &str = "lineup.json?show=found";
    pub const LINEUP_STATUS: &str = "lineup_status.json";
    pub const LINEUP_ACTION: &str = "lineup.post";
    pub const TUNER_STATUS: &str = "status.json";
}

/// HTTP client bound to one device
#[derive(Debug, Clone)]
pub struct DeviceHttpClient {
    agent: ureq::Agent,
    base_url: String,
}

impl DeviceHttpClient {
    /// Create a client for the device at `base_url`, e.g.
    /// `http://192.168.1.50`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_HTTP_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        tracing::debug!("GET {}", url);

        let body = self
            .agent
            .get(&url)
            .call()?
            .into_string()
            .map_err(|e| ApiError::NetworkError(format!("{}: {}", url, e)))?;

        serde_json::from_str(&body).map_err(|e| ApiError::ParseError(format!("{}: {}", url, e)))
    }

    /// `discover.json`
    pub fn discover(&self) -> Result<DiscoverJson> {
        self.get_json(paths::DISCOVER)
    }

    /// Channels the device has found, from `lineup.json?show=found`
    pub fn lineup(&self) -> Result<Vec<LineupChannel>> {
        self.get_json(paths::LINEUP)
    }

    /// `lineup_status.json`
    pub fn lineup_status(&self) -> Result<LineupStatus> {
        self.get_json(paths::LINEUP_STATUS)
    }

    /// Per-tuner status from `status.json`
    pub fn tuner_status(&self) -> Result<Vec<TunerStatus>> {
        self.get_json(paths::TUNER_STATUS)
    }

    /// Start a channel scan for `source` (e.g. `Antenna` or `Cable`)
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidParameter`] for an empty source, without contacting
    /// the device.
    pub fn start_channel_scan(&self, source: &str) -> Result<()> {
        if source.trim().is_empty() {
            return Err(ApiError::InvalidParameter(
                "Invalid channel source specified".to_string(),
            ));
        }

        let url = self.url(paths::LINEUP_ACTION);
        tracing::info!("Starting channel scan on {} for source {}", self.base_url, source);

        self.agent
            .post(&url)
            .query("scan", "start")
            .query("source", source)
            .call()
            .map_err(|e| {
                tracing::error!("Channel scan start on {} failed: {}", self.base_url, e);
                ApiError::from(e)
            })?;
        Ok(())
    }

    /// Current scan progress in percent.
    ///
    /// `None` when no scan is running or the device could not be asked.
    pub fn channel_scan_progress(&self) -> Option<u8> {
        match self.lineup_status() {
            Ok(status) => status.progress,
            Err(e) => {
                tracing::error!("Reading scan progress from {} failed: {}", self.base_url, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = DeviceHttpClient::new("http://192.168.1.50/");
        assert_eq!(client.base_url(), "http://192.168.1.50");
        assert_eq!(client.url(paths::LINEUP), "http://192.168.1.50/lineup.json?show=found");
    }

    #[test]
    fn test_empty_scan_source_rejected() {
        let client = DeviceHttpClient::new("http://127.0.0.1:9");
        assert!(matches!(
            client.start_channel_scan(""),
            Err(ApiError::InvalidParameter(_))
        ));
        assert!(matches!(
            client.start_channel_scan("  "),
            Err(ApiError::InvalidParameter(_))
        ));
    }
}
