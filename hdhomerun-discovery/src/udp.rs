//! UDP broadcast discovery
//!
//! Sends a single discover request for tuner devices and collects the
//! replies that arrive before the deadline. Replies that fail to decode are
//! dropped, as are repeats of a device already seen.

use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::{Duration, Instant};

use hdhomerun_protocol::{
    DeviceId, DeviceType, DiscoverReply, Packet, DEVICE_ID_WILDCARD, MAX_PACKET_SIZE,
};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::device::DiscoveredDevice;
use crate::error::{DiscoveryError, Result};

/// Open a broadcast-capable socket and send the discover request to `target`.
pub(crate) fn search(
    target: SocketAddr,
    interface: Option<&str>,
    timeout: Duration,
) -> Result<UdpReplies> {
    let socket = create_socket(interface)?;

    let request = Packet::discover_request(DeviceType::Tuner, DEVICE_ID_WILDCARD)
        .encode()
        .map_err(|e| DiscoveryError::ParseError(e.to_string()))?;

    tracing::debug!("Sending discover request to {}", target);
    socket
        .send_to(&request, target)
        .map_err(|e| DiscoveryError::NetworkError(format!("Failed to send discover request: {}", e)))?;

    Ok(UdpReplies {
        socket: Some(socket),
        buffer: [0; MAX_PACKET_SIZE],
        deadline: Instant::now() + timeout,
        seen: HashSet::new(),
    })
}

fn create_socket(interface: Option<&str>) -> Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| DiscoveryError::NetworkError(format!("Failed to create UDP socket: {}", e)))?;

    socket
        .set_broadcast(true)
        .map_err(|e| DiscoveryError::NetworkError(format!("Failed to set SO_BROADCAST: {}", e)))?;

    if let Some(interface) = interface {
        bind_to_interface(&socket, interface)?;
    }

    let bind_addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0);
    socket
        .bind(&SockAddr::from(bind_addr))
        .map_err(|e| DiscoveryError::NetworkError(format!("Failed to bind UDP socket: {}", e)))?;

    Ok(socket.into())
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "fuchsia"))]
fn bind_to_interface(socket: &Socket, interface: &str) -> Result<()> {
    socket.bind_device(Some(interface.as_bytes())).map_err(|e| {
        DiscoveryError::NetworkError(format!("Failed to bind to interface {}: {}", interface, e))
    })
}

#[cfg(not(any(target_os = "linux", target_os = "android", target_os = "fuchsia")))]
fn bind_to_interface(_socket: &Socket, interface: &str) -> Result<()> {
    tracing::warn!(
        "Binding to interface {} is not supported on this platform, using default route",
        interface
    );
    Ok(())
}

/// Iterator over devices answering a discover request.
///
/// Ends when the discovery window closes or the socket fails. Dropping it
/// early closes the socket.
pub struct UdpReplies {
    socket: Option<UdpSocket>,
    buffer: [u8; MAX_PACKET_SIZE],
    deadline: Instant,
    seen: HashSet<DeviceId>,
}

impl UdpReplies {
    /// An iterator that yields nothing.
    pub(crate) fn empty() -> Self {
        Self {
            socket: None,
            buffer: [0; MAX_PACKET_SIZE],
            deadline: Instant::now(),
            seen: HashSet::new(),
        }
    }

    fn finish(&mut self) -> Option<DiscoveredDevice> {
        self.socket = None;
        None
    }
}

impl Iterator for UdpReplies {
    type Item = DiscoveredDevice;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let socket = self.socket.as_ref()?;

            let remaining = self.deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return self.finish();
            }
            if let Err(e) = socket.set_read_timeout(Some(remaining)) {
                tracing::warn!("Failed to set read timeout: {}", e);
                return self.finish();
            }

            let (size, from) = match socket.recv_from(&mut self.buffer) {
                Ok(received) => received,
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    return self.finish();
                }
                Err(e) => {
                    tracing::warn!("Discovery socket error: {}", e);
                    return self.finish();
                }
            };

            let reply = match DiscoverReply::decode(&self.buffer[..size]) {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::trace!("Ignoring datagram from {}: {}", from, e);
                    continue;
                }
            };

            if !self.seen.insert(reply.device_id) {
                continue;
            }

            tracing::debug!("Discovered {} at {}", reply.device_id, from.ip());
            return Some(DiscoveredDevice::from_reply(from.ip().to_string(), &reply));
        }
    }
}
