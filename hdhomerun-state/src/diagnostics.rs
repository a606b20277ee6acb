//! Diagnostics snapshots safe to share in bug reports

use serde_json::{json, Map, Value};

use crate::model::DeviceState;
use crate::Result;

/// Keys whose values are replaced, at any depth
pub const REDACTED_KEYS: [&str; 5] = [
    "device_id",
    "DeviceID",
    "device_auth",
    "device_auth_string",
    "DeviceAuth",
];

pub const REDACTED: &str = "**REDACTED**";

/// JSON snapshot of a device with identifying values redacted
pub fn device_diagnostics(state: &DeviceState) -> Result<Value> {
    let mut snapshot = json!({
        "device": serde_json::to_value(state)?,
        "channel_counts": serde_json::to_value(state.channel_counts())?,
        "update_available": state.update_available(),
    });
    redact(&mut snapshot, &REDACTED_KEYS);
    Ok(snapshot)
}

/// Replace the values of `keys` throughout `value`
pub fn redact(value: &mut Value, keys: &[&str]) {
    match value {
        Value::Object(map) => redact_map(map, keys),
        Value::Array(items) => {
            for item in items {
                redact(item, keys);
            }
        }
        _ => {}
    }
}

fn redact_map(map: &mut Map<String, Value>, keys: &[&str]) {
    for (key, value) in map.iter_mut() {
        if keys.contains(&key.as_str()) {
            if !value.is_null() {
                *value = Value::String(REDACTED.to_string());
            }
        } else {
            redact(value, keys);
        }
    }
}
