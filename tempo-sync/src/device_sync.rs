//! Device sync
//!
//! Reads the coordinator's current BPM and pushes it to the display
//! device. Delivery is best effort: a failed push is logged and the next
//! tick simply tries again with whatever value is current then.

use crate::coordinator::ResolutionCoordinator;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Device delivery failure
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Device unreachable or request timed out
    #[error("Network error: {0}")]
    Network(String),

    /// Device answered with a non-success status
    #[error("Device rejected update ({0}): {1}")]
    Rejected(u16, String),
}

/// Outbound delivery of a BPM value
#[async_trait::async_trait]
pub trait DeviceSink: Send + Sync {
    async fn push_bpm(&self, bpm: u32) -> Result<(), DeviceError>;
}

/// Pushes the authoritative BPM to the device, once per call
pub struct DeviceSync {
    sink: Arc<dyn DeviceSink>,
    coordinator: Arc<ResolutionCoordinator>,
}

impl DeviceSync {
    pub fn new(sink: Arc<dyn DeviceSink>, coordinator: Arc<ResolutionCoordinator>) -> Self {
        Self { sink, coordinator }
    }

    /// Push the current BPM
    ///
    /// # Returns
    /// The value pushed. Failures are logged here; the caller may ignore
    /// the error, it never affects coordinator state.
    pub async fn sync_once(&self) -> Result<u32, DeviceError> {
        let bpm = self.coordinator.current_bpm().await;

        match self.sink.push_bpm(bpm).await {
            Ok(()) => {
                debug!(bpm, "Pushed BPM to device");
                Ok(bpm)
            }
            Err(e) => {
                warn!(bpm, error = %e, "Device push failed; skipping this tick");
                Err(e)
            }
        }
    }
}
