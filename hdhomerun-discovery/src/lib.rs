//! HDHomeRun device discovery library
//!
//! This crate finds HDHomeRun tuners using the two mechanisms devices
//! support: the SiliconDust HTTP discover service and a UDP broadcast of the
//! binary discover request on port 65001.
//!
//! # Quick Start
//!
//! ```no_run
//! use hdhomerun_discovery::get;
//!
//! // Discover all tuners on the network
//! let devices = get();
//! for device in devices {
//!     println!("Found {} at {}", device.key(), device.ip);
//! }
//! ```
//!
//! # Iterator-based Discovery
//!
//! For more control, use the iterator API, which only broadcasts over UDP
//! and yields each device as its reply arrives:
//!
//! ```no_run
//! use hdhomerun_discovery::{get_iter, DeviceEvent};
//!
//! for event in get_iter() {
//!     match event {
//!         DeviceEvent::Found(device) => {
//!             println!("Found: {}", device.ip);
//!             // Can break early if needed
//!         }
//!     }
//! }
//! ```

mod error;
mod http;
mod udp;
pub mod device;
mod discovery;

pub use device::{DiscoverJson, DiscoveredDevice, DiscoveryMethod};
pub use discovery::{DiscoverMode, Discoverer, DiscoveryOptions, CLOUD_DISCOVER_URL};
pub use error::{DiscoveryError, Result};
pub use udp::UdpReplies;

use std::time::Duration;

/// Events emitted during device discovery.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// A tuner answered the discover request
    Found(DiscoveredDevice),
}

/// Iterator returned by [`get_iter`].
pub struct DiscoveryIterator {
    replies: UdpReplies,
}

impl Iterator for DiscoveryIterator {
    type Item = DeviceEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.replies.next().map(DeviceEvent::Found)
    }
}

/// Discover all devices with the default options (HTTP and UDP).
///
/// Failures are logged and yield an empty list. Use [`try_get`] to see the
/// error instead.
///
/// # Examples
///
/// ```no_run
/// use hdhomerun_discovery::get;
///
/// let devices = get();
/// for device in devices {
///     println!("Found: {:?} at {}", device.friendly_name, device.ip);
/// }
/// ```
pub fn get() -> Vec<DiscoveredDevice> {
    get_with_options(DiscoveryOptions::default())
}

/// Discover all devices, collecting UDP replies for `timeout`.
///
/// # Examples
///
/// ```no_run
/// use hdhomerun_discovery::get_with_timeout;
/// use std::time::Duration;
///
/// let devices = get_with_timeout(Duration::from_secs(3));
/// println!("{} tuner(s)", devices.len());
/// ```
pub fn get_with_timeout(timeout: Duration) -> Vec<DiscoveredDevice> {
    get_with_options(DiscoveryOptions::default().with_udp_timeout(timeout))
}

/// Discover devices with explicit options, logging any failure.
pub fn get_with_options(options: DiscoveryOptions) -> Vec<DiscoveredDevice> {
    try_get(options).unwrap_or_else(|e| {
        tracing::warn!("Discovery failed: {}", e);
        Vec::new()
    })
}

/// Discover devices with explicit options.
///
/// # Errors
///
/// In `Http` mode, [`DiscoveryError::HttpNotAvailable`] when the discover
/// service cannot be reached. In `Udp` mode, or `Auto` mode when HTTP also
/// failed, socket errors from the broadcast.
pub fn try_get(options: DiscoveryOptions) -> Result<Vec<DiscoveredDevice>> {
    Discoverer::new(options)?.discover()
}

/// Refresh a previously discovered device, setting its `online` flag.
pub fn rediscover(device: &DiscoveredDevice) -> DiscoveredDevice {
    rediscover_with_options(device, DiscoveryOptions::default())
}

/// Refresh a previously discovered device with explicit options.
pub fn rediscover_with_options(
    device: &DiscoveredDevice,
    options: DiscoveryOptions,
) -> DiscoveredDevice {
    match Discoverer::new(options) {
        Ok(discoverer) => discoverer.rediscover(device),
        Err(e) => {
            tracing::warn!("Rediscover of {} failed: {}", device.ip, e);
            DiscoveredDevice {
                online: false,
                ..device.clone()
            }
        }
    }
}

/// Broadcast a discover request and iterate replies for one second.
pub fn get_iter() -> DiscoveryIterator {
    get_iter_with_options(DiscoveryOptions::udp_only())
}

/// Broadcast a discover request and iterate replies for `timeout`.
pub fn get_iter_with_timeout(timeout: Duration) -> DiscoveryIterator {
    get_iter_with_options(DiscoveryOptions::udp_only().with_udp_timeout(timeout))
}

/// Iterate UDP replies using the address, interface, port and timeout in
/// `options`.
pub fn get_iter_with_options(options: DiscoveryOptions) -> DiscoveryIterator {
    let replies = Discoverer::new(options)
        .and_then(|discoverer| discoverer.search(discoverer.options().broadcast_address))
        .unwrap_or_else(|e| {
            tracing::warn!("Could not start discovery: {}", e);
            UdpReplies::empty()
        });
    DiscoveryIterator { replies }
}
