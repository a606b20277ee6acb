//! Control operations against a fake device on a local TCP port.

mod helpers;

use std::time::Duration;

use control_client::ControlClient;
use helpers::FakeDevice;
use hdhomerun_api::operations::{
    GetHwModelOperation, GetModelOperation, GetVersionOperation, RestartOperation, SystemRequest,
};
use hdhomerun_api::{ApiError, HdHomeRunClient};

const DEVICE: &str = "127.0.0.1";

fn client(device: &FakeDevice) -> HdHomeRunClient {
    HdHomeRunClient::with_control_client(
        ControlClient::new()
            .with_port(device.port)
            .with_timeout(Duration::from_millis(500)),
    )
}

fn tuned_device() -> FakeDevice {
    FakeDevice::start(&[
        ("/sys/version", "20230713"),
        ("/sys/model", "hdhomerun4_atsc"),
        ("/sys/hwmodel", "HDHR4-2US"),
        (
            "/tuner0/status",
            "ch=8vsb:177000000 lock=8vsb ss=100 snq=95 seq=100 bps=19394080 pps=1000",
        ),
        ("/tuner0/program", "3"),
        (
            "/tuner0/streaminfo",
            "3: 2.1 KTVU-HD\n4: 2.2 COZI\ntsid=0x0BE5\n",
        ),
        ("/tuner0/target", "rtp://192.168.1.20:5000 0"),
        (
            "/tuner1/status",
            "ch=none lock=none ss=0 snq=0 seq=0 bps=0 pps=0",
        ),
    ])
}

#[test]
fn test_system_operations() {
    let device = tuned_device();
    let client = client(&device);

    assert_eq!(client.execute::<GetVersionOperation>(DEVICE, &SystemRequest).unwrap(), "20230713");
    assert_eq!(client.execute::<GetModelOperation>(DEVICE, &SystemRequest).unwrap(), "hdhomerun4_atsc");
    assert_eq!(client.execute::<GetHwModelOperation>(DEVICE, &SystemRequest).unwrap(), "HDHR4-2US");
}

#[test]
fn test_restart_sets_self() {
    let device = tuned_device();
    client(&device)
        .execute::<RestartOperation>(DEVICE, &SystemRequest)
        .unwrap();

    assert_eq!(client(&device).get_variable(DEVICE, "/sys/restart").unwrap(), "self");
}

#[test]
fn test_raw_variables() {
    let device = tuned_device();
    let client = client(&device);

    assert_eq!(client.set_variable(DEVICE, "/tuner1/channel", "auto:177000000").unwrap(), "auto:177000000");
    assert!(matches!(
        client.get_variable(DEVICE, "/sys/nonexistent"),
        Err(ApiError::DeviceError(_))
    ));
}

#[test]
fn test_tuner_status_via_control() {
    let device = tuned_device();
    let tuners = client(&device).tuner_status_via_control(DEVICE, 2).unwrap();

    assert_eq!(tuners.len(), 2);

    let tuned = &tuners[0];
    assert_eq!(tuned.resource, "tuner0");
    assert_eq!(tuned.signal_strength_percent, Some(100));
    assert_eq!(tuned.signal_quality_percent, Some(95));
    assert_eq!(tuned.symbol_quality_percent, Some(100));
    assert_eq!(tuned.frequency, Some(177_000_000));
    assert_eq!(tuned.network_rate, Some(19_394_080));
    assert_eq!(tuned.vct_number.as_deref(), Some("2.1"));
    assert_eq!(tuned.vct_name.as_deref(), Some("KTVU-HD"));
    assert_eq!(tuned.target_ip.as_deref(), Some("192.168.1.20"));

    let idle = &tuners[1];
    assert_eq!(idle.resource, "tuner1");
    assert_eq!(idle.signal_strength_percent, None);
    assert_eq!(idle.vct_number, None);
    assert!(!idle.in_use());

    let requests = device.requests();
    assert!(!requests.contains(&"/tuner1/program".to_string()));
}

#[test]
fn test_tuner_status_skips_unknown_tuners() {
    let device = tuned_device();
    let tuners = client(&device).tuner_status_via_control(DEVICE, 4).unwrap();

    assert_eq!(tuners.len(), 2);
    assert_eq!(device.requests().iter().filter(|name| name.ends_with("/status")).count(), 4);
}

#[test]
fn test_tuned_without_stream_details() {
    let device = FakeDevice::start(&[("/tuner0/status", "ch=8vsb:177000000 lock=8vsb ss=80 snq=70 seq=100 bps=0 pps=0")]);
    let tuners = client(&device).tuner_status_via_control(DEVICE, 1).unwrap();

    assert_eq!(tuners.len(), 1);
    assert_eq!(tuners[0].symbol_quality_percent, Some(100));
    assert_eq!(tuners[0].vct_number, None);
    assert_eq!(tuners[0].target_ip, None);
}
