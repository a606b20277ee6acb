//! HDHomeRun State Management
//!
//! In-memory state for HDHomeRun devices, refreshed by a poller and read by
//! consumers.
//!
//! # Architecture
//!
//! ```text
//! Poller → StateStore → ChangeIterator
//!          (queries)    (watched properties)
//! ```
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use hdhomerun_state::{Property, StateStore};
//!
//! let store = StateStore::new();
//! for device in hdhomerun_discovery::get() {
//!     let id = store.add_device(device)?;
//!     store.watch(&id, Property::TunerStatus);
//! }
//!
//! for event in store.iter() {
//!     let state = store.device(&event.device_id);
//!     println!("{} changed: {:?}", event.property, state);
//! }
//! ```

pub mod diagnostics;
pub mod error;
pub mod iter;
pub mod logging;
pub mod model;
pub mod store;

pub use diagnostics::device_diagnostics;
pub use error::{Result, StateError};
pub use iter::ChangeIterator;
pub use model::{tuner_attributes, ChannelCounts, ChannelFormat, DeviceState, TunerState};
pub use store::{ChangeEvent, Property, StateStore};

// Re-exported so consumers can name ids without depending on the protocol crate
pub use hdhomerun_protocol::DeviceId;
