//! Playback poller
//!
//! One fetch per tick. A failed fetch is not "nothing playing": the tick is
//! skipped and the coordinator keeps whatever state it had.

use crate::coordinator::{ResolutionCoordinator, SnapshotOutcome};
use std::sync::Arc;
use tempo_common::PlaybackSnapshot;
use thiserror::Error;
use tracing::warn;

/// Playback fetch failure
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Service unreachable or request timed out
    #[error("Network error: {0}")]
    Network(String),

    /// Access token missing, expired or revoked
    #[error("Access token rejected")]
    Unauthorized,

    /// Service answered with a non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Response body could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Source of playback snapshots
#[async_trait::async_trait]
pub trait PlaybackSource: Send + Sync {
    async fn current_playback(&self) -> Result<PlaybackSnapshot, PlaybackError>;
}

/// Feeds playback snapshots into the coordinator
pub struct PlaybackPoller {
    source: Arc<dyn PlaybackSource>,
    coordinator: Arc<ResolutionCoordinator>,
}

impl PlaybackPoller {
    pub fn new(source: Arc<dyn PlaybackSource>, coordinator: Arc<ResolutionCoordinator>) -> Self {
        Self { source, coordinator }
    }

    /// Fetch one snapshot and hand it to the coordinator
    ///
    /// # Returns
    /// `None` when the fetch failed and the tick was skipped.
    pub async fn poll_once(&self) -> Option<SnapshotOutcome> {
        match self.source.current_playback().await {
            Ok(snapshot) => Some(self.coordinator.on_playback_snapshot(&snapshot).await),
            Err(e) => {
                warn!(error = %e, "Playback poll failed; keeping previous state");
                None
            }
        }
    }
}
