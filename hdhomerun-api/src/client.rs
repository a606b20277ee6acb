use std::time::Duration;

use control_client::{ControlClient, ControlSession};
use hdhomerun_protocol::values::{find_program, StreamProgram};

use crate::models::TunerStatus;
use crate::operation::TunerRequest;
use crate::operations::{
    GetTunerProgramOperation, GetTunerStatusOperation, GetTunerStreamInfoOperation,
    GetTunerTargetOperation,
};
use crate::{ApiError, ControlOperation, Result};

/// A client for executing control operations against devices
///
/// Bridges the stateless operation definitions and the TCP control
/// protocol spoken by the `control-client` crate.
#[derive(Debug, Clone, Default)]
pub struct HdHomeRunClient {
    control: ControlClient,
}

impl HdHomeRunClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client with a custom control client (for timeouts or a
    /// non-standard port)
    pub fn with_control_client(control: ControlClient) -> Self {
        Self { control }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_control_client(ControlClient::new().with_timeout(timeout))
    }

    pub fn control(&self) -> &ControlClient {
        &self.control
    }

    /// Execute a control operation against a device
    ///
    /// # Example
    /// ```rust,no_run
    /// use hdhomerun_api::HdHomeRunClient;
    /// use hdhomerun_api::operations::{GetModelOperation, SystemRequest};
    ///
    /// let client = HdHomeRunClient::new();
    /// let model = client.execute::<GetModelOperation>("192.168.1.50", &SystemRequest)?;
    /// # Ok::<(), hdhomerun_api::ApiError>(())
    /// ```
    pub fn execute<Op: ControlOperation>(&self, ip: &str, request: &Op::Request) -> Result<Op::Response> {
        let mut session = self.control.session(ip)?;
        execute_in::<Op>(&mut session, request)
    }

    /// Read a raw control variable
    pub fn get_variable(&self, ip: &str, name: &str) -> Result<String> {
        Ok(self.control.get(ip, name)?)
    }

    /// Write a raw control variable, returning the value the device echoes
    pub fn set_variable(&self, ip: &str, name: &str, value: &str) -> Result<String> {
        Ok(self.control.set(ip, name, value)?)
    }

    /// Build the per-tuner status records over the control protocol.
    ///
    /// Tuners that report a symbol quality are tuned, so their program,
    /// stream info and target are read too. A tuner the device refuses to
    /// describe is skipped; failing to reach the device is an error.
    pub fn tuner_status_via_control(&self, ip: &str, tuner_count: u8) -> Result<Vec<TunerStatus>> {
        let mut session = self.control.session(ip)?;
        let mut tuners = Vec::with_capacity(tuner_count as usize);

        for index in 0..tuner_count {
            let request = TunerRequest::new(index);
            let line = match execute_in::<GetTunerStatusOperation>(&mut session, &request) {
                Ok(line) => line,
                Err(e) if e.is_unreachable() => return Err(e),
                Err(e) => {
                    tracing::debug!("Skipping {} on {}: {}", request.resource(), ip, e);
                    continue;
                }
            };

            let mut status = TunerStatus {
                resource: request.resource(),
                frequency: line.frequency(),
                signal_strength_percent: line.signal_strength,
                signal_quality_percent: line.signal_quality,
                symbol_quality_percent: line.symbol_quality,
                network_rate: line.bits_per_second,
                ..TunerStatus::default()
            };

            if line.is_locked() {
                match channel_details(&mut session, &request, &mut status) {
                    Ok(()) => {}
                    Err(e) if e.is_unreachable() => return Err(e),
                    Err(e) => tracing::debug!("No channel details for {} on {}: {}", status.resource, ip, e),
                }
            }

            tuners.push(status);
        }

        Ok(tuners)
    }
}

fn execute_in<Op: ControlOperation>(
    session: &mut ControlSession,
    request: &Op::Request,
) -> Result<Op::Response> {
    let variable = Op::variable(request);
    tracing::trace!("{} {}", Op::NAME, variable);

    let value = match Op::value(request) {
        Some(value) => session.set(&variable, &value)?,
        None => session.get(&variable)?,
    };
    Op::parse_response(&value)
}

/// Fill the virtual channel and target of a tuned tuner.
fn channel_details(
    session: &mut ControlSession,
    request: &TunerRequest,
    status: &mut TunerStatus,
) -> Result<()> {
    let program = execute_in::<GetTunerProgramOperation>(session, request)?;
    let programs = execute_in::<GetTunerStreamInfoOperation>(session, request)?;

    if let Some(StreamProgram {
        vct_number,
        vct_name,
        ..
    }) = program.and_then(|program| find_program(programs, &program))
    {
        status.vct_number = Some(vct_number);
        status.vct_name = vct_name;
    }

    status.target_ip = execute_in::<GetTunerTargetOperation>(session, request)?;
    Ok(())
}
