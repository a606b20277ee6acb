//! Error types for the discovery system.

use thiserror::Error;

/// Error type for discovery operations.
///
/// Represents the failure modes of UDP and HTTP discovery: socket and
/// request failures, malformed replies and an unreachable discover service.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Network-related errors (socket creation, HTTP requests, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),
    /// Malformed JSON or datagram
    #[error("Parse error: {0}")]
    ParseError(String),
    /// The HTTP discover service could not be reached
    #[error("HTTP discovery not available: {0}")]
    HttpNotAvailable(String),
}

/// Convenience Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;
