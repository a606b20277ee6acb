//! `/tunerN` operations

use hdhomerun_protocol::values::{self, StreamProgram, TunerStatusLine};

use crate::operation::TunerRequest;
use crate::{ApiError, ControlOperation};

/// Signal and channel state of one tuner
pub struct GetTunerStatusOperation;

impl ControlOperation for GetTunerStatusOperation {
    type Request = TunerRequest;
    type Response = TunerStatusLine;

    const NAME: &'static str = "GetTunerStatus";

    fn variable(request: &Self::Request) -> String {
        request.variable("status")
    }

    fn parse_response(value: &str) -> Result<Self::Response, ApiError> {
        Ok(TunerStatusLine::parse(value))
    }
}

/// Program number currently selected, `None` when nothing is selected
pub struct GetTunerProgramOperation;

impl ControlOperation for GetTunerProgramOperation {
    type Request = TunerRequest;
    type Response = Option<String>;

    const NAME: &'static str = "GetTunerProgram";

    fn variable(request: &Self::Request) -> String {
        request.variable("program")
    }

    fn parse_response(value: &str) -> Result<Self::Response, ApiError> {
        Ok(match value.trim() {
            "" | "0" | "none" => None,
            program => Some(program.to_string()),
        })
    }
}

/// Programs carried on the tuned channel
pub struct GetTunerStreamInfoOperation;

impl ControlOperation for GetTunerStreamInfoOperation {
    type Request = TunerRequest;
    type Response = Vec<StreamProgram>;

    const NAME: &'static str = "GetTunerStreamInfo";

    fn variable(request: &Self::Request) -> String {
        request.variable("streaminfo")
    }

    fn parse_response(value: &str) -> Result<Self::Response, ApiError> {
        Ok(values::parse_stream_info(value))
    }
}

/// Host the tuner is streaming to, `None` when the target is `none`
pub struct GetTunerTargetOperation;

impl ControlOperation for GetTunerTargetOperation {
    type Request = TunerRequest;
    type Response = Option<String>;

    const NAME: &'static str = "GetTunerTarget";

    fn variable(request: &Self::Request) -> String {
        request.variable("target")
    }

    fn parse_response(value: &str) -> Result<Self::Response, ApiError> {
        Ok(values::target_host(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "/tuner0/status", "/tuner0/program", "/tuner0/streaminfo", "/tuner0/target")]
    #[case(3, "/tuner3/status", "/tuner3/program", "/tuner3/streaminfo", "/tuner3/target")]
    fn test_tuner_variables(
        #[case] tuner: u8,
        #[case] status: &str,
        #[case] program: &str,
        #[case] streaminfo: &str,
        #[case] target: &str,
    ) {
        let request = TunerRequest::new(tuner);
        assert_eq!(GetTunerStatusOperation::variable(&request), status);
        assert_eq!(GetTunerProgramOperation::variable(&request), program);
        assert_eq!(GetTunerStreamInfoOperation::variable(&request), streaminfo);
        assert_eq!(GetTunerTargetOperation::variable(&request), target);
    }

    #[test]
    fn test_status_response() {
        let status = GetTunerStatusOperation::parse_response(
            "ch=8vsb:183000000 lock=8vsb ss=83 snq=90 seq=100 bps=19394080 pps=0",
        )
        .unwrap();
        assert_eq!(status.signal_strength, Some(83));
        assert_eq!(status.symbol_quality, Some(100));
        assert_eq!(status.packets_per_second, None);
    }

    #[rstest]
    #[case("3", Some("3"))]
    #[case("0", None)]
    #[case("none", None)]
    #[case("", None)]
    fn test_program_response(#[case] value: &str, #[case] expected: Option<&str>) {
        let program = GetTunerProgramOperation::parse_response(value).unwrap();
        assert_eq!(program.as_deref(), expected);
    }

    #[test]
    fn test_target_response() {
        assert_eq!(
            GetTunerTargetOperation::parse_response("rtp://192.168.1.5:5000").unwrap(),
            Some("192.168.1.5".to_string())
        );
        assert_eq!(GetTunerTargetOperation::parse_response("none").unwrap(), None);
    }
}
