//! Test helpers: a fake tuner on the control protocol and system builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use hdhomerun_protocol::{Packet, PacketType, Tag, Tlv, HEADER_SIZE};
use hdhomerun_sdk::{DeviceId, DiscoveredDevice, DiscoveryOptions, HdHomeRunSystem, PollerConfig};

pub const FLEX: DeviceId = DeviceId::new(0x1040_ABCD);

/// Control port for tests that never reach the control protocol
pub const UNUSED_PORT: u16 = 9;

/// A fake tuner answering get/set requests from a variable table
pub struct FakeDevice {
    pub port: u16,
}

impl FakeDevice {
    pub fn start(variables: &[(&str, &str)]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let variables: HashMap<String, String> = variables
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        let variables = Arc::new(Mutex::new(variables));

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let variables = Arc::clone(&variables);
                thread::spawn(move || serve(stream, variables));
            }
        });

        Self { port }
    }
}

fn serve(mut stream: TcpStream, variables: Arc<Mutex<HashMap<String, String>>>) {
    loop {
        let mut header = [0u8; HEADER_SIZE];
        if stream.read_exact(&mut header).is_err() {
            return;
        }
        let mut frame = vec![0u8; Packet::frame_len(&header)];
        frame[..HEADER_SIZE].copy_from_slice(&header);
        if stream.read_exact(&mut frame[HEADER_SIZE..]).is_err() {
            return;
        }

        let request = Packet::decode(&frame).unwrap();
        let name = request.get_string(Tag::GetSetName).unwrap_or_default();

        let mut reply =
            Packet::new(PacketType::GetSetReply).with_tlv(Tlv::string(Tag::GetSetName, &name));
        let mut variables = variables.lock().unwrap();
        if let Some(value) = request.get_string(Tag::GetSetValue) {
            variables.insert(name.clone(), value);
        }
        reply = match variables.get(&name) {
            Some(value) => reply.with_tlv(Tlv::string(Tag::GetSetValue, value)),
            None => reply.with_tlv(Tlv::string(Tag::ErrorMessage, "ERROR: unknown getset variable")),
        };
        drop(variables);

        if stream.write_all(&reply.encode().unwrap()).is_err() {
            return;
        }
    }
}

/// A loopback UDP port nothing answers on
pub fn silent_udp_port() -> u16 {
    UdpSocket::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port()
}

pub fn fast_config(control_port: u16) -> PollerConfig {
    PollerConfig::new()
        .with_control_port(control_port)
        .with_timeouts(Duration::from_millis(500), Duration::from_millis(500))
        .with_details_interval(Duration::from_millis(200))
        .with_tuner_interval(Duration::from_millis(50))
        .with_scan_progress_interval(Duration::from_millis(50))
}

/// A system tracking one device, with UDP discovery aimed at a silent port
pub fn system_with(device: DiscoveredDevice, control_port: u16) -> HdHomeRunSystem {
    let discovery = DiscoveryOptions::default()
        .with_port(silent_udp_port())
        .with_udp_timeout(Duration::from_millis(50));
    HdHomeRunSystem::from_discovered_devices(vec![device], discovery, fast_config(control_port))
        .unwrap()
}
