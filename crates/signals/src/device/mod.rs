//! Sensor device integration
//!
//! The device serves its event log as headerless CSV over plain HTTP.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use std::time::Duration;

/// Default export URL, with `{ip}` replaced by the device address
pub const DEFAULT_URL_TEMPLATE: &str =
    "http://{ip}/turnip_data_log/data?format=csv&mark_discontinuities=0";

/// Build the export URL for a device address
pub fn device_url(ip: &str) -> String {
    DEFAULT_URL_TEMPLATE.replace("{ip}", ip)
}

/// Default cap on the size of one export, far above what the device log reaches
pub const DEFAULT_MAX_BODY_BYTES: u64 = 1024 * 1024 * 1024;

/// Source of raw device exports
pub trait DeviceSource: Send + Sync {
    /// Download the full CSV export as text
    ///
    /// Transport failures, non-success statuses and non-UTF-8 bodies are
    /// all errors.
    fn fetch(&self) -> Result<String>;
}

/// HTTP client for the device's data log endpoint
pub struct DeviceClient {
    url: String,
    agent: ureq::Agent,
    max_body_bytes: u64,
}

impl DeviceClient {
    /// Create a client for `url`, bounding every request by `timeout`
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            url: url.into(),
            agent,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Override the largest export body accepted
    ///
    /// The export is the device's whole append-only log, so this must stay
    /// well above its expected size.
    pub fn with_max_body_bytes(mut self, max_body_bytes: u64) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl DeviceSource for DeviceClient {
    fn fetch(&self) -> Result<String> {
        let mut response = self
            .agent
            .get(&self.url)
            .call()
            .with_context(|| format!("Failed to send request to {}", self.url))?;

        response
            .body_mut()
            .with_config()
            .limit(self.max_body_bytes)
            .read_to_string()
            .context("Failed to read device response as UTF-8 text")
    }
}
