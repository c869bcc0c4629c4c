//! # Tempo Common Library
//!
//! Shared code for the tempo-sync workspace:
//! - Track and playback snapshot types
//! - Bootstrap configuration loading (TOML)
//! - Common error type

pub mod config;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{PlaybackSnapshot, TrackIdentity};
