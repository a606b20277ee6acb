//! Error types for hdhomerun-state

use hdhomerun_protocol::DeviceId;
use thiserror::Error;

/// Result type for hdhomerun-state operations
pub type Result<T> = std::result::Result<T, StateError>;

/// Errors that can occur during state management
#[derive(Debug, Error)]
pub enum StateError {
    /// No state is held for this device
    #[error("Device not found: {0}")]
    DeviceNotFound(DeviceId),

    /// State is keyed by device id; the device at this address has none
    #[error("Device at {0} has no device id")]
    MissingDeviceId(String),

    /// Building a diagnostics snapshot failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
