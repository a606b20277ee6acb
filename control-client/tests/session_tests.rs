//! Exchanges against a fake device listening on a local TCP port.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use control_client::{ControlClient, ControlError};
use hdhomerun_protocol::{Packet, PacketType, Tag, Tlv, HEADER_SIZE};
use rstest::rstest;

/// Accept one connection and answer each request with `respond`.
fn fake_device<F>(requests: usize, respond: F) -> (u16, thread::JoinHandle<Vec<Packet>>)
where
    F: Fn(&Packet) -> Packet + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut seen = Vec::new();
        for _ in 0..requests {
            let mut header = [0u8; HEADER_SIZE];
            if stream.read_exact(&mut header).is_err() {
                break;
            }
            let mut frame = vec![0u8; Packet::frame_len(&header)];
            frame[..HEADER_SIZE].copy_from_slice(&header);
            stream.read_exact(&mut frame[HEADER_SIZE..]).unwrap();

            let request = Packet::decode(&frame).unwrap();
            stream.write_all(&respond(&request).encode().unwrap()).unwrap();
            seen.push(request);
        }
        seen
    });

    (port, handle)
}

fn variables(request: &Packet) -> Packet {
    let name = request.get_string(Tag::GetSetName).unwrap_or_default();
    let reply = Packet::new(PacketType::GetSetReply).with_tlv(Tlv::string(Tag::GetSetName, &name));
    match name.as_str() {
        "/sys/model" => reply.with_tlv(Tlv::string(Tag::GetSetValue, "hdhomerun4_atsc")),
        "/sys/version" => reply.with_tlv(Tlv::string(Tag::GetSetValue, "20230713")),
        "/sys/restart" => {
            let value = request.get_string(Tag::GetSetValue).unwrap_or_default();
            reply.with_tlv(Tlv::string(Tag::GetSetValue, &value))
        }
        _ => reply.with_tlv(Tlv::string(Tag::ErrorMessage, "ERROR: unknown getset variable")),
    }
}

fn client(port: u16) -> ControlClient {
    ControlClient::new()
        .with_port(port)
        .with_timeout(Duration::from_millis(500))
}

#[rstest]
#[case("/sys/model", "hdhomerun4_atsc")]
#[case("/sys/version", "20230713")]
fn test_get_variable(#[case] name: &str, #[case] expected: &str) {
    let (port, device) = fake_device(1, variables);

    let value = client(port).get("127.0.0.1", name).unwrap();
    assert_eq!(value, expected);

    let seen = device.join().unwrap();
    assert_eq!(seen[0].packet_type, PacketType::GetSetRequest);
    assert!(seen[0].get(Tag::GetSetValue).is_none());
}

#[test]
fn test_set_sends_value() {
    let (port, device) = fake_device(1, variables);

    let echoed = client(port).set("127.0.0.1", "/sys/restart", "self").unwrap();
    assert_eq!(echoed, "self");

    let seen = device.join().unwrap();
    assert_eq!(seen[0].get_string(Tag::GetSetValue).as_deref(), Some("self"));
}

#[test]
fn test_set_with_lockkey() {
    let (port, device) = fake_device(1, variables);

    client(port)
        .set_with_lockkey("127.0.0.1", "/sys/restart", "self", 0xDEAD)
        .unwrap();

    let seen = device.join().unwrap();
    assert_eq!(seen[0].get_u32(Tag::GetSetLockkey), Some(0xDEAD));
}

#[test]
fn test_device_error_message() {
    let (port, device) = fake_device(1, variables);

    let result = client(port).get("127.0.0.1", "/sys/bogus");
    assert!(matches!(result, Err(ControlError::Device(_))));
    device.join().unwrap();
}

#[test]
fn test_session_reuses_connection() {
    let (port, device) = fake_device(2, variables);

    let mut session = client(port).session("127.0.0.1").unwrap();
    assert_eq!(session.get("/sys/model").unwrap(), "hdhomerun4_atsc");
    assert_eq!(session.get("/sys/version").unwrap(), "20230713");

    assert_eq!(device.join().unwrap().len(), 2);
}

#[test]
fn test_silent_device_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let device = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        thread::sleep(Duration::from_millis(1500));
        drop(stream);
    });

    let result = client(port).get("127.0.0.1", "/sys/model");
    assert!(matches!(result, Err(ControlError::Timeout(_))));
    device.join().unwrap();
}

#[test]
fn test_corrupt_reply_is_protocol_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let device = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 64];
        let _ = stream.read(&mut request).unwrap();

        let reply = Packet::new(PacketType::GetSetReply)
            .with_tlv(Tlv::string(Tag::GetSetName, "/sys/model"))
            .encode()
            .unwrap();
        let mut corrupted = reply.to_vec();
        let last = corrupted.len() - 1;
        corrupted[last] ^= 0xFF;
        stream.write_all(&corrupted).unwrap();
    });

    let result = client(port).get("127.0.0.1", "/sys/model");
    assert!(matches!(result, Err(ControlError::Protocol(_))));
    device.join().unwrap();
}

#[test]
fn test_connection_refused_is_network_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let result = client(port).get("127.0.0.1", "/sys/model");
    assert!(matches!(result, Err(ControlError::Network(_))));
}
