use control_client::ControlError;
use thiserror::Error;

/// High-level API errors for HDHomeRun operations
///
/// This enum abstracts the control protocol and the device's HTTP endpoints
/// behind one set of failure categories.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network communication error
    ///
    /// Connection refused or reset, DNS failures, or the device being
    /// unreachable.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The device did not answer in time
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Response parsing error
    ///
    /// The device answered but the reply could not be decoded into the
    /// expected shape (bad JSON, malformed packet, unexpected variable).
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The device's HTTP API answered with a non-success status
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The device reported an error for a control variable
    #[error("Device error: {0}")]
    DeviceError(String),
}

/// Type alias for results that can return an ApiError
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Whether the failure means the device could not be reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, ApiError::NetworkError(_) | ApiError::Timeout(_))
    }
}

impl From<ControlError> for ApiError {
    fn from(error: ControlError) -> Self {
        match error {
            ControlError::Network(msg) => ApiError::NetworkError(msg),
            ControlError::Timeout(msg) => ApiError::Timeout(msg),
            ControlError::Protocol(msg) => ApiError::ParseError(msg),
            ControlError::Device(msg) => ApiError::DeviceError(msg),
        }
    }
}

impl From<ureq::Error> for ApiError {
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::Status(code, _) => ApiError::HttpStatus(code),
            ureq::Error::Transport(transport) => ApiError::NetworkError(transport.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_error_conversion() {
        let api_error: ApiError = ControlError::Network("refused".to_string()).into();
        assert!(matches!(api_error, ApiError::NetworkError(_)));

        let api_error: ApiError = ControlError::Timeout("192.168.1.50:65001".to_string()).into();
        assert!(matches!(api_error, ApiError::Timeout(_)));

        let api_error: ApiError = ControlError::Protocol("bad crc".to_string()).into();
        assert!(matches!(api_error, ApiError::ParseError(_)));

        let api_error: ApiError = ControlError::Device("ERROR: unknown getset variable".to_string()).into();
        assert!(matches!(api_error, ApiError::DeviceError(_)));
    }

    #[test]
    fn test_unreachable() {
        assert!(ApiError::NetworkError("reset".to_string()).is_unreachable());
        assert!(ApiError::Timeout("x".to_string()).is_unreachable());
        assert!(!ApiError::HttpStatus(404).is_unreachable());
        assert!(!ApiError::DeviceError("x".to_string()).is_unreachable());
    }

    #[test]
    fn test_error_display() {
        let network_err = ApiError::NetworkError("connection failed".to_string());
        assert_eq!(format!("{}", network_err), "Network error: connection failed");

        let status = ApiError::HttpStatus(503);
        assert_eq!(format!("{}", status), "HTTP status 503");

        let param = ApiError::InvalidParameter("empty channel source".to_string());
        assert_eq!(format!("{}", param), "Invalid parameter: empty channel source");
    }
}
