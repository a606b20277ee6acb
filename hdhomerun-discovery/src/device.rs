//! Discovered device records and the `discover.json` document.
//!
//! A device may be seen over HTTP, over UDP or both. The merge rules here
//! decide which source wins for each field.

use hdhomerun_protocol::{DeviceId, DeviceType, DiscoverReply};
use serde::{Deserialize, Deserializer, Serialize};

/// How a device was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMethod {
    Http,
    Udp,
}

/// Information about a discovered HDHomeRun device.
///
/// Every field besides `ip` is optional: UDP replies from older firmware
/// carry little more than the id, and the cloud service omits fields for
/// devices it knows only partially.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    /// IP address of the device
    pub ip: String,
    pub device_id: Option<DeviceId>,
    pub device_type: Option<DeviceType>,
    pub tuner_count: Option<u8>,
    pub base_url: Option<String>,
    pub lineup_url: Option<String>,
    pub discover_url: Option<String>,
    pub device_auth: Option<String>,
    pub friendly_name: Option<String>,
    /// Hardware model, `/sys/hwmodel`
    pub model_number: Option<String>,
    /// Firmware name, `/sys/model`
    pub firmware_name: Option<String>,
    /// Installed firmware, `/sys/version`
    pub firmware_version: Option<String>,
    /// Newer firmware offered by the device, if any
    pub upgrade_available: Option<String>,
    /// Old hardware that only speaks the control protocol for tuner status
    pub legacy: bool,
    pub method: Option<DiscoveryMethod>,
    pub online: bool,
}

impl DiscoveredDevice {
    /// An online device known only by address.
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            online: true,
            ..Default::default()
        }
    }

    /// Build from a UDP discover reply received from `ip`.
    pub fn from_reply(ip: impl Into<String>, reply: &DiscoverReply) -> Self {
        Self {
            device_id: Some(reply.device_id),
            device_type: reply.device_type,
            tuner_count: reply.tuner_count,
            base_url: reply.base_url.clone(),
            lineup_url: reply.lineup_url.clone(),
            device_auth: reply.device_auth.clone(),
            method: Some(DiscoveryMethod::Udp),
            ..Self::new(ip)
        }
    }

    /// Build from a `discover.json` entry; `fallback_host` is used when the
    /// entry has no `LocalIP`.
    pub fn from_discover_json(json: &DiscoverJson, fallback_host: &str) -> Self {
        let ip = json
            .local_ip
            .clone()
            .unwrap_or_else(|| fallback_host.to_string());
        let mut device = Self::new(ip);
        device.method = Some(DiscoveryMethod::Http);
        device.apply_discover_json(json);
        device
    }

    /// Overlay every field present in a `discover.json` document.
    pub fn apply_discover_json(&mut self, json: &DiscoverJson) {
        if let Some(id) = json.device_id.as_deref() {
            match id.parse::<DeviceId>() {
                Ok(id) => self.device_id = Some(id),
                Err(e) => tracing::debug!("Ignoring device id from {}: {}", self.ip, e),
            }
        }
        overlay(&mut self.ip, json.local_ip.as_ref());
        overlay_opt(&mut self.base_url, &json.base_url);
        overlay_opt(&mut self.lineup_url, &json.lineup_url);
        overlay_opt(&mut self.discover_url, &json.discover_url);
        overlay_opt(&mut self.device_auth, &json.device_auth);
        overlay_opt(&mut self.friendly_name, &json.friendly_name);
        overlay_opt(&mut self.model_number, &json.model_number);
        overlay_opt(&mut self.firmware_name, &json.firmware_name);
        overlay_opt(&mut self.firmware_version, &json.firmware_version);
        overlay_opt(&mut self.upgrade_available, &json.upgrade_available);
        overlay_opt(&mut self.tuner_count, &json.tuner_count);
        if let Some(legacy) = json.legacy {
            self.legacy = legacy;
        }
    }

    /// Overlay the details an HTTP rediscover returned, where present.
    ///
    /// The address, discovery method and online flag are left alone.
    pub fn overlay_http(&mut self, http: &DiscoveredDevice) {
        self.overlay_udp(http);
        overlay_opt(&mut self.discover_url, &http.discover_url);
        overlay_opt(&mut self.friendly_name, &http.friendly_name);
        overlay_opt(&mut self.model_number, &http.model_number);
        overlay_opt(&mut self.firmware_name, &http.firmware_name);
        overlay_opt(&mut self.firmware_version, &http.firmware_version);
        overlay_opt(&mut self.upgrade_available, &http.upgrade_available);
        self.legacy = http.legacy;
    }

    /// Overlay the fields a UDP reply can carry, where present.
    pub fn overlay_udp(&mut self, udp: &DiscoveredDevice) {
        overlay_opt(&mut self.device_id, &udp.device_id);
        overlay_opt(&mut self.device_type, &udp.device_type);
        overlay_opt(&mut self.tuner_count, &udp.tuner_count);
        overlay_opt(&mut self.base_url, &udp.base_url);
        overlay_opt(&mut self.lineup_url, &udp.lineup_url);
        overlay_opt(&mut self.device_auth, &udp.device_auth);
    }

    /// Identity used to match the same device across discovery methods.
    pub fn key(&self) -> String {
        match self.device_id {
            Some(id) => id.to_string(),
            None => self.ip.clone(),
        }
    }

    /// URL of this device's own `discover.json`.
    pub fn local_discover_url(&self) -> String {
        if let Some(url) = &self.discover_url {
            return url.clone();
        }
        match &self.base_url {
            Some(base) => format!("{}/discover.json", base.trim_end_matches('/')),
            None => format!("http://{}/discover.json", self.ip),
        }
    }

    /// Root URL for the device's HTTP API.
    pub fn http_base(&self) -> String {
        match &self.base_url {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("http://{}", self.ip),
        }
    }
}

fn overlay(target: &mut String, value: Option<&String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        target.clone_from(value);
    }
}

fn overlay_opt<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
    if value.is_some() {
        target.clone_from(value);
    }
}

/// The `discover.json` document served by devices and the cloud service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DiscoverJson {
    pub friendly_name: Option<String>,
    pub model_number: Option<String>,
    pub firmware_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub firmware_version: Option<String>,
    #[serde(rename = "DeviceID")]
    pub device_id: Option<String>,
    pub device_auth: Option<String>,
    #[serde(rename = "BaseURL")]
    pub base_url: Option<String>,
    #[serde(rename = "LineupURL")]
    pub lineup_url: Option<String>,
    #[serde(rename = "DiscoverURL")]
    pub discover_url: Option<String>,
    #[serde(rename = "LocalIP")]
    pub local_ip: Option<String>,
    pub tuner_count: Option<u8>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub upgrade_available: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub legacy: Option<bool>,
}

impl DiscoverJson {
    pub fn from_json(text: &str) -> crate::Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| crate::DiscoveryError::ParseError(format!("discover.json: {}", e)))
    }
}

/// Devices report some fields as either strings or numbers.
mod lenient {
    use super::*;
    use serde_json::Value;

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
            Some(Value::Number(n)) => Some(n.as_i64().unwrap_or(0) != 0),
            _ => None,
        })
    }
}

/// Host part of a URL.
pub fn extract_host(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLEX_4K: &str = r#"{
        "FriendlyName": "HDHomeRun FLEX 4K",
        "ModelNumber": "HDFX-4K",
        "FirmwareName": "hdhomerun_dvr_atsc3",
        "FirmwareVersion": "20230713",
        "DeviceID": "1040ABCD",
        "DeviceAuth": "secret-auth",
        "BaseURL": "http://192.168.1.50",
        "LineupURL": "http://192.168.1.50/lineup.json",
        "TunerCount": 4
    }"#;

    #[test]
    fn test_extract_host() {
        assert_eq!(
            extract_host("http://192.168.1.100:80/discover.json"),
            Some("192.168.1.100".to_string())
        );
        assert_eq!(
            extract_host("https://ipv4-api.hdhomerun.com/discover"),
            Some("ipv4-api.hdhomerun.com".to_string())
        );
        assert_eq!(extract_host("invalid-url"), None);
    }

    #[test]
    fn test_discover_json_parsing() {
        let json = DiscoverJson::from_json(FLEX_4K).unwrap();
        let device = DiscoveredDevice::from_discover_json(&json, "192.168.1.50");

        assert_eq!(device.ip, "192.168.1.50");
        assert_eq!(device.device_id, Some(DeviceId::new(0x1040_ABCD)));
        assert_eq!(device.tuner_count, Some(4));
        assert_eq!(device.model_number.as_deref(), Some("HDFX-4K"));
        assert_eq!(device.firmware_name.as_deref(), Some("hdhomerun_dvr_atsc3"));
        assert_eq!(device.method, Some(DiscoveryMethod::Http));
        assert!(!device.legacy);
        assert!(device.online);
    }

    #[test]
    fn test_lenient_fields() {
        let json = DiscoverJson::from_json(
            r#"{"FirmwareVersion": 20200101, "UpgradeAvailable": "20231020", "Legacy": 1}"#,
        )
        .unwrap();

        assert_eq!(json.firmware_version.as_deref(), Some("20200101"));
        assert_eq!(json.upgrade_available.as_deref(), Some("20231020"));
        assert_eq!(json.legacy, Some(true));
    }

    #[test]
    fn test_local_ip_wins_over_fallback() {
        let json = DiscoverJson {
            local_ip: Some("10.0.0.9".to_string()),
            ..Default::default()
        };
        let device = DiscoveredDevice::from_discover_json(&json, "ipv4-api.hdhomerun.com");
        assert_eq!(device.ip, "10.0.0.9");
    }

    #[test]
    fn test_overlay_udp_keeps_http_only_fields() {
        let json = DiscoverJson::from_json(FLEX_4K).unwrap();
        let mut device = DiscoveredDevice::from_discover_json(&json, "192.168.1.50");

        let mut udp = DiscoveredDevice::new("192.168.1.50");
        udp.tuner_count = Some(2);
        udp.lineup_url = Some("http://192.168.1.50:80/lineup.json".to_string());
        device.overlay_udp(&udp);

        assert_eq!(device.tuner_count, Some(2));
        assert_eq!(
            device.lineup_url.as_deref(),
            Some("http://192.168.1.50:80/lineup.json")
        );
        assert_eq!(device.friendly_name.as_deref(), Some("HDHomeRun FLEX 4K"));
        assert_eq!(device.device_auth.as_deref(), Some("secret-auth"));
    }

    #[test]
    fn test_local_discover_url() {
        let mut device = DiscoveredDevice::new("192.168.1.77");
        assert_eq!(device.local_discover_url(), "http://192.168.1.77/discover.json");

        device.base_url = Some("http://192.168.1.77:80/".to_string());
        assert_eq!(device.local_discover_url(), "http://192.168.1.77:80/discover.json");

        device.discover_url = Some("http://192.168.1.77/discover.json".to_string());
        assert_eq!(device.local_discover_url(), "http://192.168.1.77/discover.json");
    }

    #[test]
    fn test_key_prefers_device_id() {
        let mut device = DiscoveredDevice::new("192.168.1.77");
        assert_eq!(device.key(), "192.168.1.77");
        device.device_id = Some(DeviceId::new(0x1010_0001));
        assert_eq!(device.key(), "10100001");
    }
}
