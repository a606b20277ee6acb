//! Error types for the control client

use hdhomerun_protocol::ProtocolError;
use thiserror::Error;

/// Errors that can occur during a control-protocol exchange
#[derive(Debug, Error)]
pub enum ControlError {
    /// Connection refused, reset or otherwise failed
    #[error("Network error: {0}")]
    Network(String),

    /// The device did not answer within the configured timeout
    #[error("Timed out talking to {0}")]
    Timeout(String),

    /// The reply could not be decoded or did not match the request
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The device answered with an error message
    #[error("Device error: {0}")]
    Device(String),
}

impl From<ProtocolError> for ControlError {
    fn from(error: ProtocolError) -> Self {
        ControlError::Protocol(error.to_string())
    }
}

impl ControlError {
    /// Build from an I/O error, separating timeouts from other failures
    pub(crate) fn from_io(error: std::io::Error, peer: &str) -> Self {
        match error.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => {
                ControlError::Timeout(peer.to_string())
            }
            _ => ControlError::Network(format!("{}: {}", peer, error)),
        }
    }
}
