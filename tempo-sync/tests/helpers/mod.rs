//! Test Helper Utilities
//!
//! Shared collaborators and fixtures for tempo-sync integration tests

#![allow(dead_code, unused_imports)]

pub mod audio_generator;
pub mod mocks;

pub use audio_generator::{click_track, click_track_wav};
pub use mocks::{track, GatedResolver, RecordingDevice, ScriptedPlayback};
