//! Audio-sample resolver
//!
//! Fetches the track's preview clip and estimates tempo from the signal.
//! Highest latency of the resolvers (download + decode + analysis), but the
//! only one that measures the actual recording.

use super::{BpmResolver, ResolverError, TempoEstimator};
use std::sync::Arc;
use std::time::Duration;
use tempo_common::TrackIdentity;
use tracing::debug;

/// Source of short audio previews
#[async_trait::async_trait]
pub trait PreviewSource: Send + Sync {
    /// Download the preview for `track`
    ///
    /// # Returns
    /// `Ok(None)` when the catalog entry has no preview.
    async fn fetch_preview(&self, track: &TrackIdentity) -> Result<Option<Vec<u8>>, ResolverError>;
}

/// Resolver backed by preview download + local tempo estimation
pub struct AudioSampleResolver {
    previews: Arc<dyn PreviewSource>,
    estimator: Arc<dyn TempoEstimator>,
    budget: Duration,
}

impl AudioSampleResolver {
    pub fn new(
        previews: Arc<dyn PreviewSource>,
        estimator: Arc<dyn TempoEstimator>,
        budget: Duration,
    ) -> Self {
        Self {
            previews,
            estimator,
            budget,
        }
    }
}

#[async_trait::async_trait]
impl BpmResolver for AudioSampleResolver {
    fn name(&self) -> &'static str {
        "audio_sample"
    }

    fn budget(&self) -> Duration {
        self.budget
    }

    async fn resolve(&self, track: &TrackIdentity) -> Result<Option<u32>, ResolverError> {
        let Some(audio) = self.previews.fetch_preview(track).await? else {
            debug!(track_id = %track.id, "No preview available");
            return Ok(None);
        };

        debug!(
            track_id = %track.id,
            bytes = audio.len(),
            estimator = self.estimator.name(),
            "Estimating tempo from preview"
        );

        // Decoding and analysis are CPU-bound; keep them off the async workers
        let estimator = Arc::clone(&self.estimator);
        let bpm = tokio::task::spawn_blocking(move || estimator.estimate(&audio))
            .await
            .map_err(|e| ResolverError::Analysis(format!("Task join error: {}", e)))??;

        let rounded = bpm.round();
        if !rounded.is_finite() || rounded < 1.0 {
            return Ok(None);
        }

        Ok(Some(rounded as u32))
    }
}
