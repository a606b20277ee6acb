//! Configuration types for the hdhomerun-sdk crate
//!
//! [`PollerConfig`] controls how often each device is refreshed and the
//! timeouts used for the requests made on every tick.

use std::time::Duration;

use hdhomerun_protocol::CONTROL_TCP_PORT;
use hdhomerun_state::ChannelFormat;

use crate::SdkError;

/// Configuration for polling and device I/O
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Interval between details refreshes (discover, lineup, firmware)
    /// Default: 300 seconds
    pub details_interval: Duration,

    /// Interval between tuner status refreshes
    /// Default: 10 seconds
    pub tuner_interval: Duration,

    /// Interval between scan progress checks while a channel scan runs
    /// Default: 10 seconds
    pub scan_progress_interval: Duration,

    /// Timeout for each device HTTP request
    /// Default: 2.5 seconds
    pub http_timeout: Duration,

    /// Timeout for each control protocol request
    /// Default: 2.5 seconds
    pub control_timeout: Duration,

    /// TCP port of the control protocol
    /// Default: 65001
    pub control_port: u16,

    /// How tuned channels are rendered by [`TunerState`](hdhomerun_state::TunerState)
    /// Default: channel name
    pub channel_format: ChannelFormat,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            details_interval: Duration::from_secs(300),
            tuner_interval: Duration::from_secs(10),
            scan_progress_interval: Duration::from_secs(10),
            http_timeout: Duration::from_millis(2500),
            control_timeout: Duration::from_millis(2500),
            control_port: CONTROL_TCP_PORT,
            channel_format: ChannelFormat::default(),
        }
    }
}

impl PollerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short intervals for dashboards watching tuners closely
    pub fn fast_polling() -> Self {
        Self {
            details_interval: Duration::from_secs(60),
            tuner_interval: Duration::from_secs(2),
            scan_progress_interval: Duration::from_secs(2),
            ..Default::default()
        }
    }

    /// Long intervals for unattended use
    pub fn resource_efficient() -> Self {
        Self {
            details_interval: Duration::from_secs(900),
            tuner_interval: Duration::from_secs(30),
            scan_progress_interval: Duration::from_secs(15),
            ..Default::default()
        }
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<(), SdkError> {
        let intervals = [
            ("details", self.details_interval),
            ("tuner", self.tuner_interval),
            ("scan progress", self.scan_progress_interval),
        ];
        for (name, interval) in intervals {
            if interval.is_zero() {
                return Err(SdkError::Configuration(format!(
                    "{} interval must be greater than 0",
                    name
                )));
            }
        }

        if self.http_timeout.is_zero() || self.control_timeout.is_zero() {
            return Err(SdkError::Configuration(
                "Request timeouts must be greater than 0".to_string(),
            ));
        }

        if self.control_port == 0 {
            return Err(SdkError::Configuration(
                "Control port must not be 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_details_interval(mut self, interval: Duration) -> Self {
        self.details_interval = interval;
        self
    }

    pub fn with_tuner_interval(mut self, interval: Duration) -> Self {
        self.tuner_interval = interval;
        self
    }

    pub fn with_scan_progress_interval(mut self, interval: Duration) -> Self {
        self.scan_progress_interval = interval;
        self
    }

    pub fn with_timeouts(mut self, http: Duration, control: Duration) -> Self {
        self.http_timeout = http;
        self.control_timeout = control;
        self
    }

    pub fn with_control_port(mut self, port: u16) -> Self {
        self.control_port = port;
        self
    }

    pub fn with_channel_format(mut self, format: ChannelFormat) -> Self {
        self.channel_format = format;
        self
    }
}
