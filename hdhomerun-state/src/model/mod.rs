//! Device state model

mod device_state;
pub mod tuner;

pub use device_state::{ChannelCounts, DeviceState};
pub use tuner::{tuner_attributes, ChannelFormat, TunerState};
