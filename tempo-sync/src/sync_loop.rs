//! Main sync loop
//!
//! One task, two cadences. Poll and device-sync ticks are served one at a
//! time from a single `select!`, so a slow poll delays the next device push
//! instead of racing it. Resolution work never runs here; the coordinator
//! spawns it.

use crate::device_sync::DeviceSync;
use crate::playback::PlaybackPoller;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct SyncLoop {
    poller: PlaybackPoller,
    device_sync: DeviceSync,
    poll_interval: Duration,
    device_sync_interval: Duration,
}

impl SyncLoop {
    pub fn new(
        poller: PlaybackPoller,
        device_sync: DeviceSync,
        poll_interval: Duration,
        device_sync_interval: Duration,
    ) -> Self {
        Self {
            poller,
            device_sync,
            poll_interval,
            device_sync_interval,
        }
    }

    /// Run until `cancel` fires
    pub async fn run(&self, cancel: CancellationToken) {
        let mut poll_tick = tokio::time::interval(self.poll_interval);
        poll_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut sync_tick = tokio::time::interval(self.device_sync_interval);
        sync_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            poll_interval = ?self.poll_interval,
            device_sync_interval = ?self.device_sync_interval,
            "Sync loop started"
        );

        loop {
            // Poll before push when both are due so the first push already
            // reflects the first snapshot
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = poll_tick.tick() => {
                    self.poller.poll_once().await;
                }

                _ = sync_tick.tick() => {
                    let _ = self.device_sync.sync_once().await;
                }
            }
        }

        info!("Sync loop stopped");
    }
}
