//! Records returned by the device's JSON endpoints.
//!
//! Field names follow the device's PascalCase JSON. Devices are loose about
//! number versus string encodings, so a few fields accept either.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of `status.json`, or the same record built from the control
/// protocol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TunerStatus {
    /// `tunerN`
    pub resource: String,
    #[serde(default, deserialize_with = "lenient::text", skip_serializing_if = "Option::is_none")]
    pub vct_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vct_name: Option<String>,
    /// Hz
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_strength_percent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_quality_percent: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol_quality_percent: Option<u32>,
    /// Bits per second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_rate: Option<u64>,
    #[serde(default, rename = "TargetIP", skip_serializing_if = "Option::is_none")]
    pub target_ip: Option<String>,
}

impl TunerStatus {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Self::default()
        }
    }

    /// A tuner is in use when it is tuned to a virtual channel or streaming
    /// to a target.
    pub fn in_use(&self) -> bool {
        self.vct_number.is_some() || self.target_ip.is_some()
    }
}

/// One channel of `lineup.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineupChannel {
    #[serde(default, deserialize_with = "lenient::text")]
    pub guide_number: Option<String>,
    #[serde(default)]
    pub guide_name: Option<String>,
    #[serde(default, rename = "URL")]
    pub url: Option<String>,
    #[serde(default)]
    pub video_codec: Option<String>,
    #[serde(default)]
    pub audio_codec: Option<String>,
    #[serde(default, rename = "HD", deserialize_with = "lenient::flag")]
    pub hd: Option<bool>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub favorite: Option<bool>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub enabled: Option<bool>,
    #[serde(default, rename = "DRM", deserialize_with = "lenient::flag")]
    pub drm: Option<bool>,
}

impl LineupChannel {
    pub fn is_favorite(&self) -> bool {
        self.favorite == Some(true)
    }

    /// Only channels explicitly reported with `Enabled: 0` count as disabled.
    pub fn is_disabled(&self) -> bool {
        self.enabled == Some(false)
    }
}

/// `lineup_status.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LineupStatus {
    #[serde(default, deserialize_with = "lenient::flag")]
    pub scan_in_progress: Option<bool>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub scan_possible: Option<bool>,
    /// Percent complete while a scan runs
    #[serde(default)]
    pub progress: Option<u8>,
    /// Channels found so far while a scan runs
    #[serde(default)]
    pub found: Option<u32>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_list: Option<Vec<String>>,
}

impl LineupStatus {
    pub fn is_scanning(&self) -> bool {
        self.scan_in_progress == Some(true)
    }
}

mod lenient {
    use super::*;

    pub(super) fn text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) if !s.is_empty() => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
    }

    pub(super) fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Bool(b)) => Some(b),
            Some(Value::Number(n)) => Some(n.as_i64().map_or(false, |v| v != 0)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuner_status_from_json() {
        let json = r#"{"Resource":"tuner0","VctNumber":"5.1","VctName":"WABC-HD",
            "Frequency":183000000,"SignalStrengthPercent":83,"SignalQualityPercent":90,
            "SymbolQualityPercent":100,"NetworkRate":19394080,"TargetIP":"192.168.1.5"}"#;
        let status: TunerStatus = serde_json::from_str(json).unwrap();

        assert_eq!(status.resource, "tuner0");
        assert_eq!(status.vct_number.as_deref(), Some("5.1"));
        assert_eq!(status.frequency, Some(183_000_000));
        assert_eq!(status.target_ip.as_deref(), Some("192.168.1.5"));
        assert!(status.in_use());
    }

    #[test]
    fn test_idle_tuner_status() {
        let status: TunerStatus = serde_json::from_str(r#"{"Resource":"tuner1"}"#).unwrap();
        assert_eq!(status, TunerStatus::new("tuner1"));
        assert!(!status.in_use());
    }

    #[test]
    fn test_serialized_tuner_status_skips_absent_fields() {
        let value = serde_json::to_value(TunerStatus::new("tuner1")).unwrap();
        assert_eq!(value, serde_json::json!({"Resource": "tuner1"}));
    }

    #[test]
    fn test_lineup_channel_flags() {
        let channel: LineupChannel = serde_json::from_str(
            r#"{"GuideNumber":"2.1","GuideName":"KTVU","HD":1,"Favorite":1,
                "URL":"http://192.168.1.50:5004/auto/v2.1"}"#,
        )
        .unwrap();

        assert_eq!(channel.hd, Some(true));
        assert!(channel.is_favorite());
        assert!(!channel.is_disabled());

        let disabled: LineupChannel =
            serde_json::from_str(r#"{"GuideNumber":7,"Enabled":0}"#).unwrap();
        assert_eq!(disabled.guide_number.as_deref(), Some("7"));
        assert!(disabled.is_disabled());
    }

    #[test]
    fn test_lineup_status() {
        let status: LineupStatus = serde_json::from_str(
            r#"{"ScanInProgress":1,"Progress":46,"Found":12}"#,
        )
        .unwrap();
        assert!(status.is_scanning());
        assert_eq!(status.progress, Some(46));

        let idle: LineupStatus = serde_json::from_str(
            r#"{"ScanInProgress":0,"ScanPossible":1,"Source":"Antenna",
                "SourceList":["Antenna","Cable"]}"#,
        )
        .unwrap();
        assert!(!idle.is_scanning());
        assert_eq!(idle.source_list.unwrap(), vec!["Antenna", "Cable"]);
    }
}
