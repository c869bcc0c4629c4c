//! GetSongBPM API client
//!
//! Looks up the tempo the service has on file for a title/artist pair:
//! `GET {base}?api_key=K&type=single&title=T&artist=A`
//!
//! The service reports tempo as a decimal string (`"tempo": "123.45"`),
//! either at the top level or inside the first `search` result depending on
//! the endpoint flavour. Both shapes are accepted.

use crate::resolvers::{ResolverError, TempoCatalog};
use serde_json::Value;
use std::time::Duration;

use super::USER_AGENT;

/// GetSongBPM API client
pub struct SongBpmClient {
    http_client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl SongBpmClient {
    /// Create new client with a per-request timeout
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, ResolverError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ResolverError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.to_string(),
            api_key,
            timeout,
        })
    }

    /// Query the reported tempo for a song
    pub async fn lookup(&self, title: &str, artist: &str) -> Result<Option<u32>, ResolverError> {
        tracing::debug!(title = %title, artist = %artist, "Querying GetSongBPM");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("type", "single"),
                ("title", title),
                ("artist", artist),
            ])
            .send()
            .await
            .map_err(|e| ResolverError::from_reqwest(e, self.timeout))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ResolverError::Api(status.as_u16(), error_text));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ResolverError::from_reqwest(e, self.timeout))?;

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| {
                ResolverError::Malformed(format!("GetSongBPM returned non-JSON body: {}", e))
            })?;

        let bpm = parse_tempo(&json);

        tracing::debug!(title = %title, artist = %artist, bpm = ?bpm, "GetSongBPM lookup complete");

        Ok(bpm)
    }
}

#[async_trait::async_trait]
impl TempoCatalog for SongBpmClient {
    async fn lookup_tempo(&self, title: &str, artist: &str) -> Result<Option<u32>, ResolverError> {
        self.lookup(title, artist).await
    }
}

/// Extract a rounded, positive tempo from a GetSongBPM response
pub fn parse_tempo(body: &Value) -> Option<u32> {
    let tempo = body.get("tempo").and_then(tempo_value).or_else(|| {
        body.get("search")
            .and_then(Value::as_array)
            .and_then(|results| results.first())
            .and_then(|first| first.get("tempo"))
            .and_then(tempo_value)
    })?;

    if !tempo.is_finite() || tempo <= 0.0 {
        return None;
    }

    let rounded = tempo.round();
    if rounded < 1.0 || rounded > u32::MAX as f64 {
        return None;
    }

    Some(rounded as u32)
}

fn tempo_value(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}
