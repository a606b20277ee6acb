//! Derived per-tuner views

use std::collections::BTreeMap;
use std::fmt;

use hdhomerun_api::TunerStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a tuned channel is displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelFormat {
    /// `KTVU-HD`
    #[default]
    Name,
    /// `2.1`
    Number,
    /// `2.1: KTVU-HD`
    NumberName,
}

impl std::str::FromStr for ChannelFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" | "channel_name" => Ok(ChannelFormat::Name),
            "number" | "channel_number" => Ok(ChannelFormat::Number),
            "number_name" | "channel_number_name" => Ok(ChannelFormat::NumberName),
            other => Err(format!("unknown channel format: {}", other)),
        }
    }
}

/// What a tuner is doing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TunerState {
    Idle,
    /// Streaming to a target without a known virtual channel
    InUse,
    /// Tuned to a virtual channel, formatted per [`ChannelFormat`]
    Channel(String),
}

impl TunerState {
    pub fn from_status(status: &TunerStatus, format: ChannelFormat) -> Self {
        match (&status.vct_number, &status.vct_name) {
            (Some(number), Some(name)) => TunerState::Channel(match format {
                ChannelFormat::Name => name.clone(),
                ChannelFormat::Number => number.clone(),
                ChannelFormat::NumberName => format!("{}: {}", number, name),
            }),
            _ if status.target_ip.is_some() => TunerState::InUse,
            _ => TunerState::Idle,
        }
    }
}

impl fmt::Display for TunerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunerState::Idle => write!(f, "idle"),
            TunerState::InUse => write!(f, "in_use"),
            TunerState::Channel(channel) => write!(f, "{}", channel),
        }
    }
}

/// Every reported tuner value except the resource name, keyed in snake case
/// (`SignalStrengthPercent` becomes `signal_strength_percent`, `TargetIP`
/// becomes `target_ip`).
pub fn tuner_attributes(status: &TunerStatus) -> BTreeMap<String, Value> {
    let Ok(Value::Object(fields)) = serde_json::to_value(status) else {
        return BTreeMap::new();
    };

    fields
        .into_iter()
        .filter(|(key, _)| !key.eq_ignore_ascii_case("resource"))
        .map(|(key, value)| (snake_case(&key), value))
        .collect()
}

/// Underscore before every inner capital, then lower-case. Runs of capitals
/// such as `IP` collapse back into one word.
fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
    }
    out.replace("_i_p", "_ip")
}
