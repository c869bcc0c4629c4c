//! LED controller client
//!
//! The controller firmware exposes a single handler:
//! `GET /bpm?bpm=N` answers `200 OK`, or `400 Missing bpm` without the
//! parameter. It blanks the strip on its own when no value arrives for
//! [`DEVICE_HOLD_TIMEOUT`], so pushes have to keep coming even when the
//! value does not change.

use crate::device_sync::{DeviceError, DeviceSink};
use std::time::Duration;

use super::USER_AGENT;

/// How long the controller keeps blinking after the last push
pub const DEVICE_HOLD_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the LED controller
pub struct LedDeviceClient {
    http_client: reqwest::Client,
    url: String,
}

impl LedDeviceClient {
    /// `url` is the full handler URL, e.g. `http://192.168.0.42/bpm`
    pub fn new(url: &str, timeout: Duration) -> Result<Self, DeviceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| DeviceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl DeviceSink for LedDeviceClient {
    async fn push_bpm(&self, bpm: u32) -> Result<(), DeviceError> {
        let response = self
            .http_client
            .get(&self.url)
            .query(&[("bpm", bpm)])
            .send()
            .await
            .map_err(|e| DeviceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(DeviceError::Rejected(status.as_u16(), error_text));
        }

        Ok(())
    }
}
