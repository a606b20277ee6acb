//! Private control-protocol client for HDHomeRun devices
//!
//! This crate provides a minimal blocking client for the TCP get/set
//! protocol HDHomeRun tuners expose on port 65001. Each call either opens a
//! short-lived connection or reuses a [`ControlSession`] when several
//! variables are read from the same device.

mod error;

pub use error::ControlError;

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use hdhomerun_protocol::{GetSetReply, Packet, CONTROL_TCP_PORT, HEADER_SIZE, MAX_PACKET_SIZE};

/// Default connect, read and write timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2500);

/// A minimal control-protocol client
#[derive(Debug, Clone)]
pub struct ControlClient {
    timeout: Duration,
    port: u16,
}

impl ControlClient {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            port: CONTROL_TCP_PORT,
        }
    }

    /// Use a different timeout for connect, read and write
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Talk to a port other than 65001
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Open a session that can carry several requests
    pub fn session(&self, ip: &str) -> Result<ControlSession, ControlError> {
        ControlSession::connect(ip, self.port, self.timeout)
    }

    /// Read a control variable such as `/sys/model`
    pub fn get(&self, ip: &str, name: &str) -> Result<String, ControlError> {
        self.session(ip)?.get(name)
    }

    /// Write a control variable, returning the value the device echoes back
    pub fn set(&self, ip: &str, name: &str, value: &str) -> Result<String, ControlError> {
        self.session(ip)?.set(name, value)
    }

    /// Write a control variable on a tuner locked with `lockkey`
    pub fn set_with_lockkey(
        &self,
        ip: &str,
        name: &str,
        value: &str,
        lockkey: u32,
    ) -> Result<String, ControlError> {
        self.session(ip)?.set_with_lockkey(name, value, lockkey)
    }
}

impl Default for ControlClient {
    fn default() -> Self {
        Self::new()
    }
}

/// An open TCP connection to one device
#[derive(Debug)]
pub struct ControlSession {
    stream: TcpStream,
    peer: String,
}

impl ControlSession {
    fn connect(ip: &str, port: u16, timeout: Duration) -> Result<Self, ControlError> {
        let peer = format!("{}:{}", ip, port);
        let addr = (ip, port)
            .to_socket_addrs()
            .map_err(|e| ControlError::Network(format!("{}: {}", peer, e)))?
            .next()
            .ok_or_else(|| ControlError::Network(format!("{}: no address", peer)))?;

        tracing::trace!("Connecting to control port {}", peer);
        let stream =
            TcpStream::connect_timeout(&addr, timeout).map_err(|e| ControlError::from_io(e, &peer))?;
        stream
            .set_read_timeout(Some(timeout))
            .and_then(|_| stream.set_write_timeout(Some(timeout)))
            .and_then(|_| stream.set_nodelay(true))
            .map_err(|e| ControlError::from_io(e, &peer))?;

        Ok(Self { stream, peer })
    }

    pub fn get(&mut self, name: &str) -> Result<String, ControlError> {
        self.transact(name, Packet::getset_request(name, None, None))
    }

    pub fn set(&mut self, name: &str, value: &str) -> Result<String, ControlError> {
        self.transact(name, Packet::getset_request(name, Some(value), None))
    }

    pub fn set_with_lockkey(
        &mut self,
        name: &str,
        value: &str,
        lockkey: u32,
    ) -> Result<String, ControlError> {
        self.transact(name, Packet::getset_request(name, Some(value), Some(lockkey)))
    }

    fn transact(&mut self, name: &str, request: Packet) -> Result<String, ControlError> {
        let bytes = request.encode()?;
        self.stream
            .write_all(&bytes)
            .map_err(|e| ControlError::from_io(e, &self.peer))?;

        let frame = self.read_frame()?;
        let reply = GetSetReply::decode(&frame)?;
        tracing::trace!("{} {} -> {:?}", self.peer, name, reply.value);

        extract_value(reply, name)
    }

    fn read_frame(&mut self) -> Result<Vec<u8>, ControlError> {
        let mut header = [0u8; HEADER_SIZE];
        self.stream
            .read_exact(&mut header)
            .map_err(|e| ControlError::from_io(e, &self.peer))?;

        let frame_len = Packet::frame_len(&header);
        if frame_len > MAX_PACKET_SIZE {
            return Err(ControlError::Protocol(format!(
                "reply of {} bytes exceeds {} byte limit",
                frame_len, MAX_PACKET_SIZE
            )));
        }

        let mut frame = vec![0u8; frame_len];
        frame[..HEADER_SIZE].copy_from_slice(&header);
        self.stream
            .read_exact(&mut frame[HEADER_SIZE..])
            .map_err(|e| ControlError::from_io(e, &self.peer))?;
        Ok(frame)
    }
}

fn extract_value(reply: GetSetReply, name: &str) -> Result<String, ControlError> {
    let value = reply.value.map_err(ControlError::Device)?;
    if reply.name != name {
        return Err(ControlError::Protocol(format!(
            "asked for {} but device answered {}",
            name, reply.name
        )));
    }
    Ok(value)
}
