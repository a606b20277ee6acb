//! `/sys` operations

use crate::{ApiError, ControlOperation};

/// Request for `/sys` operations, which take no parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemRequest;

/// Value sent to `/sys/restart` to reboot the device
pub const RESTART_SELF: &str = "self";

fn text(value: &str) -> String {
    value.trim().to_string()
}

/// Firmware version, e.g. `20230713`
pub struct GetVersionOperation;

impl ControlOperation for GetVersionOperation {
    type Request = SystemRequest;
    type Response = String;

    const NAME: &'static str = "GetVersion";

    fn variable(_request: &Self::Request) -> String {
        "/sys/version".to_string()
    }

    fn parse_response(value: &str) -> Result<Self::Response, ApiError> {
        Ok(text(value))
    }
}

/// Firmware name, e.g. `hdhomerun4_atsc`
pub struct GetModelOperation;

impl ControlOperation for GetModelOperation {
    type Request = SystemRequest;
    type Response = String;

    const NAME: &'static str = "GetModel";

    fn variable(_request: &Self::Request) -> String {
        "/sys/model".to_string()
    }

    fn parse_response(value: &str) -> Result<Self::Response, ApiError> {
        Ok(text(value))
    }
}

/// Hardware model, e.g. `HDHR4-2US`
pub struct GetHwModelOperation;

impl ControlOperation for GetHwModelOperation {
    type Request = SystemRequest;
    type Response = String;

    const NAME: &'static str = "GetHwModel";

    fn variable(_request: &Self::Request) -> String {
        "/sys/hwmodel".to_string()
    }

    fn parse_response(value: &str) -> Result<Self::Response, ApiError> {
        Ok(text(value))
    }
}

/// Reboot the device
pub struct RestartOperation;

impl ControlOperation for RestartOperation {
    type Request = SystemRequest;
    type Response = ();

    const NAME: &'static str = "Restart";

    fn variable(_request: &Self::Request) -> String {
        "/sys/restart".to_string()
    }

    fn value(_request: &Self::Request) -> Option<String> {
        Some(RESTART_SELF.to_string())
    }

    fn parse_response(_value: &str) -> Result<Self::Response, ApiError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_variables() {
        assert_eq!(GetVersionOperation::variable(&SystemRequest), "/sys/version");
        assert_eq!(GetModelOperation::variable(&SystemRequest), "/sys/model");
        assert_eq!(GetHwModelOperation::variable(&SystemRequest), "/sys/hwmodel");
        assert_eq!(RestartOperation::variable(&SystemRequest), "/sys/restart");
    }

    #[test]
    fn test_only_restart_writes() {
        assert_eq!(GetVersionOperation::value(&SystemRequest), None);
        assert_eq!(GetHwModelOperation::value(&SystemRequest), None);
        assert_eq!(RestartOperation::value(&SystemRequest).as_deref(), Some("self"));
    }

    #[test]
    fn test_version_response_is_trimmed() {
        assert_eq!(GetVersionOperation::parse_response("20230713\n").unwrap(), "20230713");
    }
}
