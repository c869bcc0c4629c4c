//! tempo-sync library
//!
//! Mirrors the tempo of the track playing on Spotify onto a networked LED
//! controller.
//!
//! **Components:**
//! - `playback`: polls the playback service and feeds snapshots in
//! - `coordinator`: owns BPM state, launches and reconciles resolutions
//! - `pipeline`: ordered resolvers with per-resolver time budgets
//! - `resolvers`: preview analysis and catalog lookup
//! - `device_sync`: pushes the current BPM to the controller
//! - `sync_loop`: drives polling and device sync on their own cadences

pub mod config;
pub mod coordinator;
pub mod device_sync;
pub mod pipeline;
pub mod playback;
pub mod resolvers;
pub mod services;
pub mod sync_loop;

use crate::config::SyncConfig;
use crate::coordinator::ResolutionCoordinator;
use crate::device_sync::DeviceSync;
use crate::pipeline::ResolutionPipeline;
use crate::playback::PlaybackPoller;
use crate::resolvers::{AudioSampleResolver, BpmResolver, CatalogResolver, OnsetTempoEstimator};
use crate::services::{LedDeviceClient, SongBpmClient, SpotifyClient};
use crate::sync_loop::SyncLoop;
use std::sync::Arc;
use tempo_common::{Error, Result};
use tracing::info;

/// Fully wired service
pub struct TempoSync {
    pub pipeline: Arc<ResolutionPipeline>,
    pub coordinator: Arc<ResolutionCoordinator>,
    pub sync_loop: SyncLoop,
}

impl TempoSync {
    /// Build clients, resolvers and the loop from validated config
    pub fn build(config: &SyncConfig) -> Result<Self> {
        let spotify = Arc::new(
            SpotifyClient::new(
                config.spotify_api_base.as_str(),
                config.spotify_token.clone(),
                config.spotify_timeout,
                config
                    .audio_sample
                    .as_ref()
                    .map(|a| a.max_preview_bytes)
                    .unwrap_or_default(),
            )
            .map_err(|e| Error::Internal(format!("Failed to create Spotify client: {}", e)))?,
        );

        let mut resolvers: Vec<Arc<dyn BpmResolver>> = Vec::new();

        if let Some(audio) = &config.audio_sample {
            resolvers.push(Arc::new(AudioSampleResolver::new(
                spotify.clone(),
                Arc::new(OnsetTempoEstimator::default()),
                audio.timeout,
            )));
        }

        if let Some(catalog) = &config.catalog {
            let client = SongBpmClient::new(
                catalog.base_url.as_str(),
                catalog.api_key.clone(),
                catalog.timeout,
            )
            .map_err(|e| Error::Internal(format!("Failed to create GetSongBPM client: {}", e)))?;
            resolvers.push(Arc::new(CatalogResolver::new(Arc::new(client), catalog.timeout)));
        }

        let pipeline = Arc::new(ResolutionPipeline::new(resolvers));
        info!(resolvers = ?pipeline.names(), "Resolution pipeline ready");

        let device = LedDeviceClient::new(config.device_url.as_str(), config.device_timeout)
            .map_err(|e| Error::Internal(format!("Failed to create device client: {}", e)))?;
        info!(url = device.url(), "LED device client ready");

        let coordinator = Arc::new(ResolutionCoordinator::new(pipeline.clone(), config.fallback));
        let poller = PlaybackPoller::new(spotify, coordinator.clone());
        let device_sync = DeviceSync::new(Arc::new(device), coordinator.clone());

        let sync_loop = SyncLoop::new(
            poller,
            device_sync,
            config.poll_interval,
            config.device_sync_interval,
        );

        Ok(Self {
            pipeline,
            coordinator,
            sync_loop,
        })
    }
}
