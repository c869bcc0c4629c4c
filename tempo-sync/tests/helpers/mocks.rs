//! In-process stand-ins for the playback service, resolvers and device

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempo_common::{PlaybackSnapshot, TrackIdentity};
use tempo_sync::device_sync::{DeviceError, DeviceSink};
use tempo_sync::playback::{PlaybackError, PlaybackSource};
use tempo_sync::resolvers::{BpmResolver, ResolverError};
use tokio::sync::Notify;

pub fn track(id: &str) -> TrackIdentity {
    TrackIdentity::new(id, format!("Song {}", id), "Band")
}

/// Resolver with per-track answers; gated tracks block until released
///
/// Releasing before the resolver reaches the gate is fine: the permit is
/// stored and the next wait returns immediately.
pub struct GatedResolver {
    name: &'static str,
    answers: HashMap<String, Option<u32>>,
    gates: HashMap<String, Arc<Notify>>,
    calls: Mutex<Vec<String>>,
}

impl GatedResolver {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            answers: HashMap::new(),
            gates: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer `bpm` for `id` immediately
    pub fn answer(mut self, id: &str, bpm: Option<u32>) -> Self {
        self.answers.insert(id.to_string(), bpm);
        self
    }

    /// Answer `bpm` for `id` once [`GatedResolver::release`] is called
    pub fn gated(mut self, id: &str, bpm: Option<u32>) -> Self {
        self.answers.insert(id.to_string(), bpm);
        self.gates.insert(id.to_string(), Arc::new(Notify::new()));
        self
    }

    pub fn release(&self, id: &str) {
        if let Some(gate) = self.gates.get(id) {
            gate.notify_one();
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, id: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| c.as_str() == id).count()
    }
}

#[async_trait::async_trait]
impl BpmResolver for GatedResolver {
    fn name(&self) -> &'static str {
        self.name
    }

    fn budget(&self) -> Duration {
        Duration::from_secs(60)
    }

    async fn resolve(&self, track: &TrackIdentity) -> Result<Option<u32>, ResolverError> {
        self.calls.lock().unwrap().push(track.id.clone());

        if let Some(gate) = self.gates.get(&track.id).cloned() {
            gate.notified().await;
        }

        Ok(self.answers.get(&track.id).copied().flatten())
    }
}

/// Playback source returning whatever snapshot the test last set
#[derive(Default)]
pub struct ScriptedPlayback {
    snapshot: Mutex<PlaybackSnapshot>,
    failing: AtomicBool,
    polls: AtomicUsize,
}

impl ScriptedPlayback {
    pub fn new(snapshot: PlaybackSnapshot) -> Self {
        Self {
            snapshot: Mutex::new(snapshot),
            ..Self::default()
        }
    }

    pub fn set(&self, snapshot: PlaybackSnapshot) {
        *self.snapshot.lock().unwrap() = snapshot;
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PlaybackSource for ScriptedPlayback {
    async fn current_playback(&self) -> Result<PlaybackSnapshot, PlaybackError> {
        self.polls.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(PlaybackError::Network("connection refused".to_string()));
        }

        Ok(self.snapshot.lock().unwrap().clone())
    }
}

/// Device that records every delivered BPM
#[derive(Default)]
pub struct RecordingDevice {
    pushes: Mutex<Vec<u32>>,
    attempts: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingDevice {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successfully delivered values, in order
    pub fn pushes(&self) -> Vec<u32> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DeviceSink for RecordingDevice {
    async fn push_bpm(&self, bpm: u32) -> Result<(), DeviceError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(DeviceError::Network("host unreachable".to_string()));
        }

        self.pushes.lock().unwrap().push(bpm);
        Ok(())
    }
}
