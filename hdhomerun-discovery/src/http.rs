//! HTTP discovery through `discover.json` documents
//!
//! The SiliconDust cloud service answers with every device registered from
//! the caller's public address; each device also serves its own document.

use std::time::Duration;

use serde_json::Value;

use crate::device::{extract_host, DiscoverJson, DiscoveredDevice};
use crate::error::{DiscoveryError, Result};

pub(crate) struct HttpDiscoverer {
    client: reqwest::blocking::Client,
}

impl HttpDiscoverer {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiscoveryError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Every device listed at `url`.
    ///
    /// Any failure to fetch the document is reported as
    /// [`DiscoveryError::HttpNotAvailable`].
    pub fn discover(&self, url: &str) -> Result<Vec<DiscoveredDevice>> {
        let fallback_host = extract_host(url).unwrap_or_default();
        let devices = self
            .fetch(url)?
            .iter()
            .map(|json| DiscoveredDevice::from_discover_json(json, &fallback_host))
            .collect::<Vec<_>>();

        tracing::debug!("{} device(s) listed at {}", devices.len(), url);
        Ok(devices)
    }

    fn fetch(&self, url: &str) -> Result<Vec<DiscoverJson>> {
        let not_available = |e: &dyn std::fmt::Display| {
            tracing::debug!("HTTP discovery via {} failed: {}", url, e);
            DiscoveryError::HttpNotAvailable(extract_host(url).unwrap_or_else(|| url.to_string()))
        };

        let text = self
            .client
            .get(url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(|e| not_available(&e))?;

        let body: Value = serde_json::from_str(&text)
            .map_err(|e| DiscoveryError::ParseError(format!("{}: {}", url, e)))?;
        parse_document(body)
    }
}

/// A document is either a single device object or a list of them; empty
/// objects and lists mean nothing was found.
fn parse_document(body: Value) -> Result<Vec<DiscoverJson>> {
    let entries = match body {
        Value::Array(entries) => entries,
        Value::Object(map) if map.is_empty() => Vec::new(),
        Value::Object(map) => vec![Value::Object(map)],
        Value::Null => Vec::new(),
        other => {
            return Err(DiscoveryError::ParseError(format!(
                "unexpected discover document: {}",
                other
            )))
        }
    };

    entries
        .into_iter()
        .map(|entry| {
            serde_json::from_value(entry)
                .map_err(|e| DiscoveryError::ParseError(format!("discover entry: {}", e)))
        })
        .collect()
}
