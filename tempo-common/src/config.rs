//! Bootstrap configuration loading and config file resolution
//!
//! Configuration file priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config directory (`~/.config/tempo-sync/config.toml` on Linux)
//! 4. System config (`/etc/tempo-sync/config.toml`, Linux only)
//!
//! A missing file is not fatal: built-in defaults are used and startup
//! continues. Secrets and endpoints may still arrive via environment.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "TEMPO_SYNC_CONFIG";

const CONFIG_DIR_NAME: &str = "tempo-sync";
const CONFIG_FILE_NAME: &str = "config.toml";

/// What the coordinator passes as the pipeline default when every
/// resolver comes back empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Keep showing the most recently resolved BPM (0 if none yet)
    #[default]
    LastKnown,
    /// Turn the display off
    Silence,
}

/// Bootstrap configuration loaded from TOML
///
/// Cannot change while running; restart to pick up edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Playback poll cadence
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Device push cadence (independent of the poll cadence)
    #[serde(default = "default_device_sync_interval_ms")]
    pub device_sync_interval_ms: u64,

    /// Pipeline default when all resolvers miss
    #[serde(default)]
    pub fallback: FallbackPolicy,

    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub spotify: SpotifyConfig,

    #[serde(default)]
    pub audio_sample: AudioSampleConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// LED device endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Full URL of the device's BPM handler, e.g. `http://192.168.0.42/bpm`
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_device_timeout_ms")]
    pub timeout_ms: u64,
}

/// Spotify Web API access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    /// Pre-issued OAuth bearer token (refresh is handled outside this process)
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default = "default_spotify_api_base")]
    pub api_base: String,

    #[serde(default = "default_spotify_timeout_ms")]
    pub timeout_ms: u64,
}

/// Preview download + local tempo estimation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioSampleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Budget for the whole fetch + decode + analysis
    #[serde(default = "default_audio_sample_timeout_ms")]
    pub timeout_ms: u64,

    /// Previews larger than this are rejected before decoding
    #[serde(default = "default_max_preview_bytes")]
    pub max_preview_bytes: usize,
}

/// GetSongBPM text lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,

    #[serde(default = "default_catalog_timeout_ms")]
    pub timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_device_sync_interval_ms() -> u64 {
    1000
}

fn default_device_timeout_ms() -> u64 {
    1000
}

fn default_spotify_api_base() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_spotify_timeout_ms() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

fn default_audio_sample_timeout_ms() -> u64 {
    10_000
}

fn default_max_preview_bytes() -> usize {
    4 * 1024 * 1024
}

fn default_catalog_base_url() -> String {
    "https://api.getsongbpm.com/".to_string()
}

fn default_catalog_timeout_ms() -> u64 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            device_sync_interval_ms: default_device_sync_interval_ms(),
            fallback: FallbackPolicy::default(),
            device: DeviceConfig::default(),
            spotify: SpotifyConfig::default(),
            audio_sample: AudioSampleConfig::default(),
            catalog: CatalogConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: default_device_timeout_ms(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            api_base: default_spotify_api_base(),
            timeout_ms: default_spotify_timeout_ms(),
        }
    }
}

impl Default for AudioSampleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: default_audio_sample_timeout_ms(),
            max_preview_bytes: default_max_preview_bytes(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_catalog_base_url(),
            timeout_ms: default_catalog_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl TomlConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn device_sync_interval(&self) -> Duration {
        Duration::from_millis(self.device_sync_interval_ms)
    }

    /// Check that every duration is positive
    ///
    /// Endpoint and credential checks live with the service that owns them.
    pub fn validate_durations(&self) -> Result<()> {
        let durations = [
            ("poll_interval_ms", self.poll_interval_ms),
            ("device_sync_interval_ms", self.device_sync_interval_ms),
            ("device.timeout_ms", self.device.timeout_ms),
            ("spotify.timeout_ms", self.spotify.timeout_ms),
            ("audio_sample.timeout_ms", self.audio_sample.timeout_ms),
            ("catalog.timeout_ms", self.catalog.timeout_ms),
        ];

        for (key, value) in durations {
            if value == 0 {
                return Err(Error::Config(format!("{} must be a positive duration", key)));
            }
        }

        if self.audio_sample.max_preview_bytes == 0 {
            return Err(Error::Config(
                "audio_sample.max_preview_bytes must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;

    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse TOML {}: {}", path.display(), e)))
}

/// Locate the config file following the priority order in the module docs
///
/// Returns `None` when no candidate exists. An explicitly named file
/// (CLI or environment) is returned even if missing so the caller can
/// report it instead of silently falling back to defaults.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    if let Some(user_config) = user_config {
        if user_config.exists() {
            return Some(user_config);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolve and load the bootstrap config, degrading to defaults when no file exists
///
/// Returns the config together with the path it came from. Nothing is
/// logged here; callers typically load config before tracing is set up.
pub fn load_config(cli_arg: Option<&Path>) -> Result<(TomlConfig, Option<PathBuf>)> {
    match resolve_config_path(cli_arg) {
        Some(path) => {
            let config = load_toml_config(&path)?;
            Ok((config, Some(path)))
        }
        None => Ok((TomlConfig::default(), None)),
    }
}
