//! # HDHomeRun SDK
//!
//! Finds HDHomeRun tuners, keeps their state fresh and exposes their
//! actions:
//!
//! ```rust,no_run
//! use hdhomerun_sdk::{HdHomeRunSystem, Property};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let system = tokio::task::spawn_blocking(HdHomeRunSystem::new).await??;
//!
//!     for id in system.device_ids() {
//!         system.state_store().watch(&id, Property::TunerStatus);
//!     }
//!     system.start_polling()?;
//!
//!     let events = system.iter();
//!     tokio::task::spawn_blocking(move || {
//!         for event in events {
//!             println!("{} changed on {}", event.property, event.device_id);
//!         }
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! hdhomerun-sdk (system, device handles, poller)
//!     ↓
//! hdhomerun-state (state store, change events, diagnostics)
//!     ↓
//! hdhomerun-api (control operations, device JSON endpoints)
//!     ↓
//! control-client / hdhomerun-discovery / hdhomerun-protocol
//! ```

pub use config::PollerConfig;
pub use device::HdHomeRunDevice;
pub use error::{Result, SdkError};
pub use poller::{poll_once, DevicePoller, Poller, PollingTask, PollingTaskStats, Schedule};
pub use system::HdHomeRunSystem;

// Re-export commonly used types from the lower layers
pub use hdhomerun_api::{LineupChannel, LineupStatus, TunerStatus};
pub use hdhomerun_discovery::{DiscoverMode, DiscoveredDevice, DiscoveryMethod, DiscoveryOptions};
pub use hdhomerun_state::{
    ChangeEvent, ChangeIterator, ChannelFormat, DeviceId, DeviceState, Property, StateStore,
    TunerState,
};

mod config;
mod device;
mod error;
mod poller;
mod system;
