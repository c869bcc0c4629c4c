//! HTTP clients for the external collaborators
//!
//! - **spotify_client** - playback state and track previews (Spotify Web API)
//! - **songbpm_client** - text tempo lookup (GetSongBPM)
//! - **led_device_client** - BPM delivery to the LED controller

pub mod led_device_client;
pub mod songbpm_client;
pub mod spotify_client;

pub use led_device_client::LedDeviceClient;
pub use songbpm_client::SongBpmClient;
pub use spotify_client::SpotifyClient;

/// User agent sent to every remote service
pub const USER_AGENT: &str = concat!("tempo-sync/", env!("CARGO_PKG_VERSION"));
