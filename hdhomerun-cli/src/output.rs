//! Text and JSON rendering of device state.

use std::fmt::Write;

use anyhow::Result;
use clap::ValueEnum;
use hdhomerun_sdk::{ChangeEvent, ChannelFormat, DeviceState, Property};
use hdhomerun_state::tuner_attributes;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

fn pretty(value: &Value) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn or_unknown(value: Option<&str>) -> &str {
    value.unwrap_or("unknown")
}

fn title(state: &DeviceState) -> String {
    match state.id() {
        Some(id) => format!("{} ({})", state.name(), id),
        None => state.name(),
    }
}

/// One line per device, for listings and "not found" errors
pub fn device_list(states: &[DeviceState]) -> String {
    let mut out = String::new();
    for state in states {
        let _ = writeln!(
            out,
            "  {:<10} {:<16} {}",
            state.id().map(|id| id.to_string()).unwrap_or_default(),
            state.ip(),
            state.name()
        );
    }
    out
}

pub fn devices(states: &[DeviceState], format: Format) -> Result<String> {
    match format {
        Format::Json => pretty(&Value::Array(states.iter().map(summary_json).collect())),
        Format::Text => {
            let mut out = format!("Found {} device(s):\n", states.len());
            for state in states {
                let _ = writeln!(
                    out,
                    "  {:<10} {:<16} {:<24} {} tuner(s){}",
                    state.id().map(|id| id.to_string()).unwrap_or_default(),
                    state.ip(),
                    state.name(),
                    state.device.tuner_count.unwrap_or(0),
                    if state.available { "" } else { " [unavailable]" }
                );
            }
            Ok(out)
        }
    }
}

fn summary_json(state: &DeviceState) -> Value {
    json!({
        "device_id": state.id().map(|id| id.to_string()),
        "ip": state.ip(),
        "name": state.name(),
        "model": state.device.model_number,
        "tuner_count": state.device.tuner_count,
        "discovery_method": state.device.method,
        "legacy": state.device.legacy,
        "available": state.available,
    })
}

pub fn info(state: &DeviceState, format: Format) -> Result<String> {
    let counts = state.channel_counts();
    match format {
        Format::Json => {
            let mut value = summary_json(state);
            if let Value::Object(map) = &mut value {
                map.insert("base_url".into(), json!(state.device.base_url));
                map.insert("firmware_name".into(), json!(state.device.firmware_name));
                map.insert("installed_version".into(), json!(state.installed_version()));
                map.insert("latest_version".into(), json!(state.latest_version()));
                map.insert("update_available".into(), json!(state.update_available()));
                map.insert("channel_counts".into(), serde_json::to_value(counts)?);
                map.insert("channel_scanning".into(), json!(state.channel_scanning()));
                map.insert("scan_progress".into(), json!(state.scan_progress));
                map.insert("channel_sources".into(), json!(state.channel_sources()));
                map.insert(
                    "last_details_refresh".into(),
                    json!(state.last_details_refresh.map(|at| at.to_rfc3339())),
                );
            }
            pretty(&value)
        }
        Format::Text => {
            let mut out = format!("{}\n", title(state));
            let _ = writeln!(out, "  Address:    {}", state.ip());
            let _ = writeln!(out, "  Model:      {}", or_unknown(state.device.model_number.as_deref()));
            let _ = writeln!(
                out,
                "  Firmware:   {} {}",
                or_unknown(state.device.firmware_name.as_deref()),
                or_unknown(state.installed_version())
            );
            let update = if state.update_available() {
                format!("{} available", or_unknown(state.latest_version()))
            } else {
                "up to date".to_string()
            };
            let _ = writeln!(out, "  Update:     {}", update);
            let _ = writeln!(out, "  Tuners:     {}", state.device.tuner_count.unwrap_or(0));
            let _ = writeln!(
                out,
                "  Channels:   {} ({} favorite, {} disabled)",
                counts.total, counts.favorite, counts.disabled
            );
            let scanning = match (state.channel_scanning(), state.scan_progress) {
                (_, Some(progress)) => format!("{}%", progress),
                (Some(true), None) => "yes".to_string(),
                (Some(false), None) => "no".to_string(),
                (None, None) => "unknown".to_string(),
            };
            let _ = writeln!(out, "  Scanning:   {}", scanning);
            if !state.channel_sources().is_empty() {
                let _ = writeln!(out, "  Sources:    {}", state.channel_sources().join(", "));
            }
            let _ = writeln!(out, "  Available:  {}", if state.available { "yes" } else { "no" });
            Ok(out)
        }
    }
}

pub fn status(state: &DeviceState, channel_format: ChannelFormat, format: Format) -> Result<String> {
    match format {
        Format::Json => {
            let tuners: Vec<Value> = state
                .tuner_status
                .iter()
                .zip(state.tuner_states(channel_format))
                .map(|(tuner, (resource, tuner_state))| {
                    json!({
                        "tuner": resource,
                        "state": tuner_state.to_string(),
                        "attributes": tuner_attributes(tuner),
                    })
                })
                .collect();
            pretty(&json!({
                "device_id": state.id().map(|id| id.to_string()),
                "tuners": tuners,
            }))
        }
        Format::Text => {
            let mut out = format!("{}\n", title(state));
            for (tuner, (resource, tuner_state)) in state
                .tuner_status
                .iter()
                .zip(state.tuner_states(channel_format))
            {
                let _ = writeln!(out, "  {}: {}", resource, tuner_state);
                for (key, value) in tuner_attributes(tuner) {
                    let value = match value {
                        Value::String(text) => text,
                        other => other.to_string(),
                    };
                    let _ = writeln!(out, "    {}: {}", key, value);
                }
            }
            Ok(out)
        }
    }
}

pub fn variable(name: &str, value: &str, format: Format) -> Result<String> {
    match format {
        Format::Json => pretty(&json!({ "name": name, "value": value })),
        Format::Text => Ok(format!("{}\n", value)),
    }
}

pub fn message(text: &str, format: Format) -> Result<String> {
    match format {
        Format::Json => pretty(&json!({ "message": text })),
        Format::Text => Ok(format!("{}\n", text)),
    }
}

/// One watched change, with the new value of the property
pub fn change(
    event: &ChangeEvent,
    state: &DeviceState,
    channel_format: ChannelFormat,
    format: Format,
) -> Result<String> {
    let value = match event.property {
        Property::Available => json!(state.available),
        Property::Details => json!({
            "name": state.name(),
            "installed_version": state.installed_version(),
            "latest_version": state.latest_version(),
        }),
        Property::TunerStatus => Value::Object(
            state
                .tuner_states(channel_format)
                .into_iter()
                .map(|(tuner, tuner_state)| (tuner, json!(tuner_state.to_string())))
                .collect(),
        ),
        Property::Channels => serde_json::to_value(state.channel_counts())?,
        Property::LineupStatus => json!(state.channel_scanning()),
        Property::ScanProgress => json!(state.scan_progress),
    };

    let time = chrono::Local::now();
    match format {
        Format::Json => Ok(format!(
            "{}\n",
            json!({
                "time": time.to_rfc3339(),
                "device_id": event.device_id.to_string(),
                "property": event.property,
                "value": value,
            })
        )),
        Format::Text => Ok(format!(
            "[{}] {} {}: {}\n",
            time.format("%H:%M:%S"),
            event.device_id,
            event.property,
            value
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdhomerun_sdk::{DeviceId, DiscoveredDevice, TunerStatus};

    const FLEX: DeviceId = DeviceId::new(0x1040_ABCD);

    fn state() -> DeviceState {
        let mut state = DeviceState::new(DiscoveredDevice {
            device_id: Some(FLEX),
            friendly_name: Some("HDHomeRun FLEX 4K".to_string()),
            model_number: Some("HDFX-4K".to_string()),
            firmware_name: Some("hdhomerun_dvr_atsc3".to_string()),
            firmware_version: Some("20230713".to_string()),
            upgrade_available: Some("20231020".to_string()),
            tuner_count: Some(4),
            ..DiscoveredDevice::new("192.168.1.50")
        });
        let tuned = TunerStatus {
            vct_number: Some("2.1".to_string()),
            vct_name: Some("KTVU-HD".to_string()),
            signal_strength_percent: Some(100),
            ..TunerStatus::new("tuner0")
        };
        state.tuner_status = vec![tuned, TunerStatus::new("tuner1")];
        state
    }

    #[test]
    fn test_device_list_lines() {
        let list = device_list(&[state()]);
        assert!(list.contains("1040ABCD"));
        assert!(list.contains("192.168.1.50"));
        assert!(list.contains("HDHomeRun FLEX 4K"));
    }

    #[test]
    fn test_info_text() {
        let text = info(&state(), Format::Text).unwrap();
        assert!(text.starts_with("HDHomeRun FLEX 4K (1040ABCD)"));
        assert!(text.contains("Update:     20231020 available"));
        assert!(text.contains("Tuners:     4"));
        assert!(text.contains("Scanning:   unknown"));
    }

    #[test]
    fn test_info_json() {
        let value: Value = serde_json::from_str(&info(&state(), Format::Json).unwrap()).unwrap();
        assert_eq!(value["device_id"], "1040ABCD");
        assert_eq!(value["update_available"], true);
        assert_eq!(value["channel_counts"]["total"], 0);
        assert!(value["last_details_refresh"].is_null());
    }

    #[test]
    fn test_status_text_formats_channels() {
        let text = status(&state(), ChannelFormat::NumberName, Format::Text).unwrap();
        assert!(text.contains("  tuner0: 2.1: KTVU-HD\n"));
        assert!(text.contains("    signal_strength_percent: 100\n"));
        assert!(text.contains("  tuner1: idle\n"));
    }

    #[test]
    fn test_status_json() {
        let value: Value =
            serde_json::from_str(&status(&state(), ChannelFormat::Name, Format::Json).unwrap()).unwrap();
        assert_eq!(value["tuners"][0]["state"], "KTVU-HD");
        assert_eq!(value["tuners"][0]["attributes"]["vct_number"], "2.1");
        assert_eq!(value["tuners"][1]["state"], "idle");
    }

    #[test]
    fn test_change_json_line() {
        let event = ChangeEvent::new(FLEX, Property::Available);
        let line = change(&event, &state(), ChannelFormat::Name, Format::Json).unwrap();
        let value: Value = serde_json::from_str(line.trim()).unwrap();

        assert_eq!(value["device_id"], "1040ABCD");
        assert_eq!(value["property"], "available");
        assert_eq!(value["value"], true);
    }

    #[test]
    fn test_variable_output() {
        assert_eq!(variable("/sys/version", "20230713", Format::Text).unwrap(), "20230713\n");
        let value: Value =
            serde_json::from_str(&variable("/sys/version", "20230713", Format::Json).unwrap()).unwrap();
        assert_eq!(value["name"], "/sys/version");
    }
}
