use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("State management error: {0}")]
    StateError(#[from] hdhomerun_state::StateError),

    #[error("API error: {0}")]
    ApiError(#[from] hdhomerun_api::ApiError),

    #[error("Discovery error: {0}")]
    DiscoveryError(#[from] hdhomerun_discovery::DiscoveryError),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// The device offers no HTTP API for the requested action
    #[error("HTTP API not available on {0}")]
    HttpNotAvailable(String),

    #[error("Tuner count unknown for {0}")]
    UnknownTunerCount(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Poller is already running")]
    AlreadyRunning,

    #[error("Background task failed: {0}")]
    Task(String),
}

impl SdkError {
    /// Whether the failure means the device could not be reached
    pub fn is_unreachable(&self) -> bool {
        matches!(self, SdkError::ApiError(e) if e.is_unreachable())
    }
}

pub type Result<T> = std::result::Result<T, SdkError>;
