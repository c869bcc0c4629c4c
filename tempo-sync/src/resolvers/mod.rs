//! BPM resolvers
//!
//! A resolver takes a track identity and tries to produce a tempo. The
//! pipeline tries them in a fixed priority order:
//!
//! 1. **audio_sample** - download the track's preview clip and estimate
//!    tempo locally (slow, accurate when a preview exists)
//! 2. **catalog** - text lookup of title + artist against GetSongBPM
//!    (fast, may match the wrong recording)
//!
//! "Not found" is `Ok(None)`. Errors are reserved for conditions worth a
//! log line (network, malformed payloads, decode failures); the pipeline
//! treats both the same way.

pub mod audio_sample;
pub mod catalog;
pub mod tempo_estimator;

pub use audio_sample::{AudioSampleResolver, PreviewSource};
pub use catalog::{CatalogResolver, TempoCatalog};
pub use tempo_estimator::{OnsetTempoEstimator, TempoEstimator};

use std::time::Duration;
use tempo_common::TrackIdentity;
use thiserror::Error;

/// Resolver failure
#[derive(Debug, Error)]
pub enum ResolverError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Remote service answered with a non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Response body could not be interpreted
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Preview audio could not be decoded
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Decoded audio did not yield a tempo
    #[error("Tempo analysis failed: {0}")]
    Analysis(String),

    /// Budget exceeded
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl ResolverError {
    /// Classify a reqwest failure, keeping timeouts distinct
    pub fn from_reqwest(err: reqwest::Error, budget: Duration) -> Self {
        if err.is_timeout() {
            ResolverError::Timeout(budget)
        } else {
            ResolverError::Network(err.to_string())
        }
    }
}

/// A strategy for turning a track into a tempo
///
/// # Example
/// ```rust,ignore
/// pub struct FixedResolver(u32);
///
/// #[async_trait::async_trait]
/// impl BpmResolver for FixedResolver {
///     fn name(&self) -> &'static str { "fixed" }
///     fn budget(&self) -> Duration { Duration::from_millis(10) }
///
///     async fn resolve(&self, _track: &TrackIdentity) -> Result<Option<u32>, ResolverError> {
///         Ok(Some(self.0))
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait BpmResolver: Send + Sync {
    /// Resolver name for logs
    fn name(&self) -> &'static str;

    /// Upper bound on a single `resolve` call
    ///
    /// Enforced by the pipeline; implementations should also bound their
    /// own requests so abandoned work does not pile up.
    fn budget(&self) -> Duration;

    /// Attempt to resolve a BPM for `track`
    ///
    /// # Returns
    /// `Ok(Some(bpm))` on success, `Ok(None)` when the source has nothing
    /// for this track.
    async fn resolve(&self, track: &TrackIdentity) -> Result<Option<u32>, ResolverError>;
}
