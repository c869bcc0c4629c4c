//! Resolution coordinator
//!
//! Owns the only shared mutable state in the process ([`BpmState`]) and is
//! the only writer of it. Two events drive it:
//!
//! - **on_playback_snapshot** (poll tick): detect stop / track change /
//!   resume, and launch a background resolution on change
//! - **on_resolution_complete** (background task): apply the result only if
//!   the resolution is still the active one; otherwise discard it
//!
//! Superseded resolutions are never interrupted. They run to completion and
//! their results are dropped by the `active_resolution_track_id` check, which
//! makes the outcome independent of completion order.
//!
//! All state access goes through one `tokio::sync::Mutex`; it is never held
//! across resolver I/O.

use crate::pipeline::ResolutionPipeline;
use std::sync::Arc;
use tempo_common::config::FallbackPolicy;
use tempo_common::{PlaybackSnapshot, TrackIdentity};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// BPM state shared between the poll loop and resolution tasks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BpmState {
    /// Value pushed to the device; 0 means nothing to display
    pub current_bpm: u32,
    /// Most recent resolved BPM, kept across track changes
    pub last_known_bpm: u32,
    /// Track that `last_known_bpm` belongs to
    pub last_track_id: Option<String>,
    /// Track the in-flight resolution is working on, if any
    pub active_resolution_track_id: Option<String>,
}

/// What a snapshot did to the state
#[derive(Debug)]
pub enum SnapshotOutcome {
    /// Playback not active; display cleared
    Stopped,
    /// Nothing to do
    Unchanged,
    /// Playback resumed on an already-resolved track
    Resumed(u32),
    /// New track; background resolution launched
    ResolutionStarted(JoinHandle<ResolutionOutcome>),
}

/// What a completed resolution did to the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Result was current and has been applied
    Applied(u32),
    /// Result was stale and has been dropped
    Discarded,
}

enum Transition {
    Stopped,
    Unchanged,
    Resumed(u32),
    Start { track: TrackIdentity, default: u32 },
}

/// Owner of [`BpmState`]
pub struct ResolutionCoordinator {
    state: Mutex<BpmState>,
    pipeline: Arc<ResolutionPipeline>,
    fallback: FallbackPolicy,
}

impl ResolutionCoordinator {
    pub fn new(pipeline: Arc<ResolutionPipeline>, fallback: FallbackPolicy) -> Self {
        Self {
            state: Mutex::new(BpmState::default()),
            pipeline,
            fallback,
        }
    }

    /// Current BPM for the device
    pub async fn current_bpm(&self) -> u32 {
        self.state.lock().await.current_bpm
    }

    /// Copy of the full state
    pub async fn state(&self) -> BpmState {
        self.state.lock().await.clone()
    }

    /// Apply one poll's snapshot
    ///
    /// Never waits on resolution; a track change spawns the work and
    /// returns its handle.
    pub async fn on_playback_snapshot(
        self: &Arc<Self>,
        snapshot: &PlaybackSnapshot,
    ) -> SnapshotOutcome {
        let transition = {
            let mut state = self.state.lock().await;
            self.transition(&mut state, snapshot)
        };

        match transition {
            Transition::Stopped => SnapshotOutcome::Stopped,
            Transition::Unchanged => SnapshotOutcome::Unchanged,
            Transition::Resumed(bpm) => SnapshotOutcome::Resumed(bpm),
            Transition::Start { track, default } => {
                let coordinator = Arc::clone(self);
                let handle = tokio::spawn(async move {
                    let bpm = coordinator.pipeline.resolve(&track, default).await;
                    coordinator.on_resolution_complete(&track, bpm).await
                });
                SnapshotOutcome::ResolutionStarted(handle)
            }
        }
    }

    fn transition(&self, state: &mut BpmState, snapshot: &PlaybackSnapshot) -> Transition {
        let Some(track) = snapshot.active_track() else {
            if state.current_bpm != 0 || state.active_resolution_track_id.is_some() {
                info!("Playback stopped");
            }
            state.current_bpm = 0;
            state.active_resolution_track_id = None;
            return Transition::Stopped;
        };

        let is_new_subject = match state.active_resolution_track_id.as_deref() {
            Some(active) if active == track.id => return Transition::Unchanged,
            Some(_) => true,
            None => state.last_track_id.as_deref() != Some(track.id.as_str()),
        };

        if is_new_subject {
            let default = match self.fallback {
                FallbackPolicy::LastKnown => state.last_known_bpm,
                FallbackPolicy::Silence => 0,
            };

            info!(track_id = %track.id, "Now playing: {}", track);

            state.current_bpm = 0;
            state.active_resolution_track_id = Some(track.id.clone());

            return Transition::Start {
                track: track.clone(),
                default,
            };
        }

        if state.current_bpm == 0 && state.last_known_bpm > 0 {
            state.current_bpm = state.last_known_bpm;
            info!(track_id = %track.id, bpm = state.current_bpm, "Playback resumed");
            return Transition::Resumed(state.current_bpm);
        }

        Transition::Unchanged
    }

    /// Reconcile a finished resolution
    ///
    /// Applies `bpm` only if `track` is still the active resolution.
    pub async fn on_resolution_complete(
        &self,
        track: &TrackIdentity,
        bpm: u32,
    ) -> ResolutionOutcome {
        let mut state = self.state.lock().await;

        if state.active_resolution_track_id.as_deref() != Some(track.id.as_str()) {
            debug!(
                track_id = %track.id,
                bpm,
                active = ?state.active_resolution_track_id,
                "Discarding stale resolution result"
            );
            return ResolutionOutcome::Discarded;
        }

        state.current_bpm = bpm;
        state.last_known_bpm = bpm;
        state.last_track_id = Some(track.id.clone());
        state.active_resolution_track_id = None;

        info!(track_id = %track.id, bpm, "BPM for {} is now {}", track, bpm);

        ResolutionOutcome::Applied(bpm)
    }
}
