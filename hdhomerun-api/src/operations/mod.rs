//! HDHomeRun control operations grouped by the variable tree they address
//!
//! `/sys/*` variables describe the device itself; `/tunerN/*` variables
//! describe one tuner.

pub mod system;
pub mod tuner;

pub use system::{
    GetHwModelOperation, GetModelOperation, GetVersionOperation, RestartOperation,
    SystemRequest,
};
pub use tuner::{
    GetTunerProgramOperation, GetTunerStatusOperation, GetTunerStreamInfoOperation,
    GetTunerTargetOperation,
};
