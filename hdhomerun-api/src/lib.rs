//! High-level HDHomeRun API for device control
//!
//! This crate provides a type-safe, trait-based API over the two interfaces
//! a tuner exposes: the TCP control protocol (via the `control-client`
//! crate) and the JSON endpoints served from the device's base URL.
//!
//! ```rust,no_run
//! use hdhomerun_api::{DeviceHttpClient, HdHomeRunClient};
//!
//! let client = HdHomeRunClient::new();
//! for tuner in client.tuner_status_via_control("192.168.1.50", 2)? {
//!     println!("{}: {:?}", tuner.resource, tuner.vct_number);
//! }
//!
//! let http = DeviceHttpClient::new("http://192.168.1.50");
//! println!("{} channels", http.lineup()?.len());
//! # Ok::<(), hdhomerun_api::ApiError>(())
//! ```

pub mod client;
pub mod error;
pub mod http;
pub mod models;
pub mod operation;
pub mod operations;

pub use client::HdHomeRunClient;
pub use error::{ApiError, Result};
pub use http::{DeviceHttpClient, DEFAULT_HTTP_TIMEOUT};
pub use models::{LineupChannel, LineupStatus, TunerStatus};
pub use operation::{ControlOperation, TunerRequest};
