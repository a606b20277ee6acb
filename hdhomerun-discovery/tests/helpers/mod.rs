//! Test helpers: JSON fixtures and a fake tuner answering UDP discovery.

#![allow(dead_code)]

use std::fs;
use std::net::UdpSocket;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use hdhomerun_protocol::{Packet, PacketType, Tag, Tlv};

/// Load a fixture, replacing `{server}` with `server_url`.
pub fn load_fixture(filename: &str, server_url: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/fixtures");
    path.push(filename);

    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", filename, e))
        .replace("{server}", server_url)
}

/// A UDP reply the fake tuner sends back.
#[derive(Debug, Clone)]
pub struct FakeReply {
    pub device_id: u32,
    pub tuner_count: u8,
    pub base_url: Option<String>,
}

impl FakeReply {
    pub fn new(device_id: u32, tuner_count: u8) -> Self {
        Self {
            device_id,
            tuner_count,
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut packet = Packet::new(PacketType::DiscoverReply)
            .with_tlv(Tlv::u32(Tag::DeviceType, 1))
            .with_tlv(Tlv::u32(Tag::DeviceId, self.device_id))
            .with_tlv(Tlv::new(Tag::TunerCount, vec![self.tuner_count]));
        if let Some(base_url) = &self.base_url {
            packet = packet
                .with_tlv(Tlv::string(Tag::BaseUrl, base_url))
                .with_tlv(Tlv::string(Tag::LineupUrl, &format!("{}/lineup.json", base_url)));
        }
        packet.encode().unwrap().to_vec()
    }
}

/// A fake tuner bound to a local port.
///
/// Answers the first discover request with `datagrams`, in order, and
/// returns the request it received.
pub struct FakeTuner {
    pub port: u16,
    handle: thread::JoinHandle<Option<Packet>>,
}

impl FakeTuner {
    pub fn start(datagrams: Vec<Vec<u8>>) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let port = socket.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let mut buffer = [0u8; 1460];
            let (size, from) = socket.recv_from(&mut buffer).ok()?;
            let request = Packet::decode(&buffer[..size]).ok()?;
            if request.packet_type == PacketType::DiscoverRequest {
                for datagram in &datagrams {
                    socket.send_to(datagram, from).unwrap();
                }
            }
            Some(request)
        });

        Self { port, handle }
    }

    /// The discover request the tuner received.
    pub fn request(self) -> Option<Packet> {
        self.handle.join().unwrap()
    }
}

/// A local port nothing is listening on.
pub fn unused_udp_port() -> u16 {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap().port()
}
