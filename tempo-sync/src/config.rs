//! Runtime configuration for tempo-sync
//!
//! Merges the TOML bootstrap config with environment and command-line
//! overrides, then validates everything once before the loop starts.
//!
//! **Priority for secrets and endpoints:** CLI → ENV → TOML
//!
//! Validation failures are the only errors allowed to stop the process.

use crate::services::led_device_client::DEVICE_HOLD_TIMEOUT;
use reqwest::Url;
use std::fmt;
use std::time::Duration;
use tempo_common::config::{FallbackPolicy, TomlConfig};
use tempo_common::{Error, Result};
use tracing::{info, warn};

/// Spotify bearer token
pub const SPOTIFY_TOKEN_ENV: &str = "TEMPO_SYNC_SPOTIFY_TOKEN";
/// GetSongBPM API key
pub const SONGBPM_KEY_ENV: &str = "TEMPO_SYNC_GETSONGBPM_KEY";
/// LED controller URL
pub const DEVICE_URL_ENV: &str = "TEMPO_SYNC_DEVICE_URL";

/// Command-line overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub device_url: Option<String>,
}

/// Audio-sample resolver settings (present only when enabled)
#[derive(Debug, Clone)]
pub struct AudioSampleSettings {
    pub timeout: Duration,
    pub max_preview_bytes: usize,
}

/// Catalog resolver settings (present only when an API key is configured)
#[derive(Clone)]
pub struct CatalogSettings {
    pub api_key: String,
    pub base_url: Url,
    pub timeout: Duration,
}

/// Validated configuration
#[derive(Clone)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    pub device_sync_interval: Duration,
    pub fallback: FallbackPolicy,
    pub device_url: Url,
    pub device_timeout: Duration,
    pub spotify_token: String,
    pub spotify_api_base: Url,
    pub spotify_timeout: Duration,
    pub audio_sample: Option<AudioSampleSettings>,
    pub catalog: Option<CatalogSettings>,
}

impl SyncConfig {
    /// Merge overrides into `toml` and validate
    pub fn resolve(toml: TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        toml.validate_durations()?;

        let device_url = resolve_setting(
            "device URL",
            overrides.device_url,
            DEVICE_URL_ENV,
            toml.device.url.as_deref(),
        )
        .ok_or_else(|| {
            Error::Config(format!(
                "Device URL not configured. Set one of:\n\
                 1. CLI: --device-url http://<controller-ip>/bpm\n\
                 2. Environment: {}=http://<controller-ip>/bpm\n\
                 3. TOML config: [device] url = \"http://<controller-ip>/bpm\"",
                DEVICE_URL_ENV
            ))
        })?;
        let device_url = parse_url("device URL", &device_url)?;

        let spotify_token = resolve_setting(
            "Spotify access token",
            None,
            SPOTIFY_TOKEN_ENV,
            toml.spotify.access_token.as_deref(),
        )
        .ok_or_else(|| {
            Error::Config(format!(
                "Spotify access token not configured. Set one of:\n\
                 1. Environment: {}=<token>\n\
                 2. TOML config: [spotify] access_token = \"<token>\"",
                SPOTIFY_TOKEN_ENV
            ))
        })?;
        let spotify_api_base = parse_url("spotify.api_base", &toml.spotify.api_base)?;

        let audio_sample = if toml.audio_sample.enabled {
            Some(AudioSampleSettings {
                timeout: Duration::from_millis(toml.audio_sample.timeout_ms),
                max_preview_bytes: toml.audio_sample.max_preview_bytes,
            })
        } else {
            info!("Audio-sample resolver disabled by configuration");
            None
        };

        let catalog = match resolve_setting(
            "GetSongBPM API key",
            None,
            SONGBPM_KEY_ENV,
            toml.catalog.api_key.as_deref(),
        ) {
            Some(api_key) => Some(CatalogSettings {
                api_key,
                base_url: parse_url("catalog.base_url", &toml.catalog.base_url)?,
                timeout: Duration::from_millis(toml.catalog.timeout_ms),
            }),
            None => {
                warn!(
                    "GetSongBPM API key not configured ({} or [catalog] api_key); \
                     catalog resolver disabled",
                    SONGBPM_KEY_ENV
                );
                None
            }
        };

        if audio_sample.is_none() && catalog.is_none() {
            return Err(Error::Config(
                "No BPM resolver enabled: enable [audio_sample] or configure a GetSongBPM API key"
                    .to_string(),
            ));
        }

        let device_sync_interval = toml.device_sync_interval();
        if device_sync_interval >= DEVICE_HOLD_TIMEOUT {
            warn!(
                "device_sync_interval_ms ({}) is not below the controller's {}s hold time; \
                 the LEDs will blank between pushes",
                toml.device_sync_interval_ms,
                DEVICE_HOLD_TIMEOUT.as_secs()
            );
        }

        Ok(Self {
            poll_interval: toml.poll_interval(),
            device_sync_interval,
            fallback: toml.fallback,
            device_url,
            device_timeout: Duration::from_millis(toml.device.timeout_ms),
            spotify_token,
            spotify_api_base,
            spotify_timeout: Duration::from_millis(toml.spotify.timeout_ms),
            audio_sample,
            catalog,
        })
    }
}

// Secrets never reach log output
impl fmt::Debug for CatalogSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogSettings")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("poll_interval", &self.poll_interval)
            .field("device_sync_interval", &self.device_sync_interval)
            .field("fallback", &self.fallback)
            .field("device_url", &self.device_url.as_str())
            .field("device_timeout", &self.device_timeout)
            .field("spotify_token", &"<redacted>")
            .field("spotify_api_base", &self.spotify_api_base.as_str())
            .field("spotify_timeout", &self.spotify_timeout)
            .field("audio_sample", &self.audio_sample)
            .field("catalog", &self.catalog)
            .finish()
    }
}

/// Pick a setting by priority CLI → ENV → TOML, warning when several sources disagree
fn resolve_setting(
    label: &str,
    cli_value: Option<String>,
    env_var: &str,
    toml_value: Option<&str>,
) -> Option<String> {
    let env_value = std::env::var(env_var).ok();

    let candidates = [
        ("command line", cli_value),
        ("environment", env_value),
        ("TOML", toml_value.map(str::to_string)),
    ];

    let valid: Vec<(&str, String)> = candidates
        .into_iter()
        .filter_map(|(source, value)| value.filter(|v| is_valid_key(v)).map(|v| (source, v)))
        .collect();

    if valid.len() > 1 {
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            label,
            valid.iter().map(|(source, _)| *source).collect::<Vec<_>>().join(", "),
            valid[0].0
        );
    }

    valid.into_iter().next().map(|(source, value)| {
        info!("{} loaded from {}", label, source);
        value.trim().to_string()
    })
}

fn parse_url(label: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value.trim())
        .map_err(|e| Error::Config(format!("Invalid {} {:?}: {}", label, value, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::Config(format!(
            "Invalid {} {:?}: unsupported scheme {}",
            label, value, other
        ))),
    }
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
