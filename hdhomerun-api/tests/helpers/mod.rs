//! Test helpers: JSON fixtures and a fake device speaking the control protocol.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;

use hdhomerun_protocol::{Packet, PacketType, Tag, Tlv, HEADER_SIZE};

pub fn load_fixture(filename: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/fixtures");
    path.push(filename);

    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", filename, e))
}

/// A fake tuner answering get/set requests from a variable table.
///
/// Unknown variables are answered with a device error message. Every
/// requested name is recorded.
pub struct FakeDevice {
    pub port: u16,
    requests: Arc<Mutex<Vec<String>>>,
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
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = Arc::clone(&requests);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let variables = Arc::clone(&variables);
                let seen = Arc::clone(&seen);
                thread::spawn(move || serve(stream, variables, seen));
            }
        });

        Self { port, requests }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn serve(
    mut stream: TcpStream,
    variables: Arc<Mutex<HashMap<String, String>>>,
    seen: Arc<Mutex<Vec<String>>>,
) {
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
        seen.lock().unwrap().push(name.clone());

        let mut reply =
            Packet::new(PacketType::GetSetReply).with_tlv(Tlv::string(Tag::GetSetName, &name));
        let mut variables = variables.lock().unwrap();
        if let Some(value) = request.get_string(Tag::GetSetValue) {
            variables.insert(name.clone(), value);
        }
        reply = match variables.get(&name) {
            Some(value) => reply.with_tlv(Tlv::string(Tag::GetSetValue, value)),
            None => reply.with_tlv(Tlv::string(
                Tag::ErrorMessage,
                "ERROR: unknown getset variable",
            )),
        };
        drop(variables);

        if stream.write_all(&reply.encode().unwrap()).is_err() {
            return;
        }
    }
}
