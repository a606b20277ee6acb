use crate::error::ApiError;

/// Base trait for all control-protocol operations
///
/// Every operation reads (and optionally writes) a single device variable
/// such as `/sys/model` or `/tuner0/status`. Associated types keep the
/// request and the parsed reply strongly typed.
pub trait ControlOperation {
    /// The request type for this operation
    type Request;

    /// The parsed reply
    type Response;

    /// Human-readable operation name used in logs
    const NAME: &'static str;

    /// The variable this request addresses, e.g. `/tuner1/status`
    fn variable(request: &Self::Request) -> String;

    /// Value to set, or `None` for a read
    fn value(_request: &Self::Request) -> Option<String> {
        None
    }

    /// Parse the value string the device returned
    fn parse_response(value: &str) -> Result<Self::Response, ApiError>;
}

/// Request for operations addressed at a single tuner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TunerRequest {
    pub tuner: u8,
}

impl TunerRequest {
    pub fn new(tuner: u8) -> Self {
        Self { tuner }
    }

    /// `/tunerN/<leaf>`
    pub fn variable(&self, leaf: &str) -> String {
        format!("/tuner{}/{}", self.tuner, leaf)
    }

    /// `tunerN`, as reported in `status.json`
    pub fn resource(&self) -> String {
        format!("tuner{}", self.tuner)
    }
}

/// Parse a tuner index from a variable or resource such as `/tuner2/status`.
pub fn tuner_index(name: &str) -> Option<u8> {
    name.trim_start_matches('/')
        .split('/')
        .next()?
        .strip_prefix("tuner")?
        .parse()
        .ok()
}
