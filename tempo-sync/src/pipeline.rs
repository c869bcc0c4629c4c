//! Resolution pipeline
//!
//! Tries resolvers strictly in priority order and stops at the first usable
//! BPM. What to return when every resolver misses is the caller's decision
//! (the coordinator's fallback policy), so the default is a parameter.

use crate::resolvers::BpmResolver;
use std::sync::Arc;
use tempo_common::TrackIdentity;
use tracing::{debug, info, warn};

/// Ordered chain of resolvers with a caller-supplied default
pub struct ResolutionPipeline {
    resolvers: Vec<Arc<dyn BpmResolver>>,
}

impl ResolutionPipeline {
    /// Create pipeline; `resolvers` is the priority order
    pub fn new(resolvers: Vec<Arc<dyn BpmResolver>>) -> Self {
        Self { resolvers }
    }

    /// Resolver count
    pub fn count(&self) -> usize {
        self.resolvers.len()
    }

    /// Resolver names in priority order
    pub fn names(&self) -> Vec<&'static str> {
        self.resolvers.iter().map(|r| r.name()).collect()
    }

    /// Resolve a BPM for `track`, or return `default`
    ///
    /// Each resolver runs under its own budget. Errors and timeouts are
    /// logged and treated exactly like "no result".
    pub async fn resolve(&self, track: &TrackIdentity, default: u32) -> u32 {
        for resolver in &self.resolvers {
            let name = resolver.name();
            let budget = resolver.budget();

            match tokio::time::timeout(budget, resolver.resolve(track)).await {
                Ok(Ok(Some(bpm))) if bpm > 0 => {
                    info!(resolver = name, track_id = %track.id, bpm, "Resolved BPM for {}", track);
                    return bpm;
                }
                Ok(Ok(_)) => {
                    debug!(resolver = name, track_id = %track.id, "Resolver had no result");
                }
                Ok(Err(e)) => {
                    warn!(resolver = name, track_id = %track.id, error = %e, "Resolver failed");
                }
                Err(_) => {
                    warn!(
                        resolver = name,
                        track_id = %track.id,
                        budget = ?budget,
                        "Resolver timed out"
                    );
                }
            }
        }

        info!(
            track_id = %track.id,
            default,
            "No resolver produced a BPM for {}; using default",
            track
        );
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::ResolverError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    enum Behaviour {
        Answer(Option<u32>),
        Fail,
        Hang,
    }

    struct MockResolver {
        name: &'static str,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl MockResolver {
        fn new(name: &'static str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                name,
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl BpmResolver for MockResolver {
        fn name(&self) -> &'static str {
            self.name
        }

        fn budget(&self) -> Duration {
            Duration::from_millis(500)
        }

        async fn resolve(&self, _track: &TrackIdentity) -> Result<Option<u32>, ResolverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behaviour {
                Behaviour::Answer(bpm) => Ok(bpm),
                Behaviour::Fail => Err(ResolverError::Malformed("Mock failure".to_string())),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Some(999))
                }
            }
        }
    }

    fn track() -> TrackIdentity {
        TrackIdentity::new("t", "Song", "Band")
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let audio = MockResolver::new("audio_sample", Behaviour::Answer(Some(140)));
        let catalog = MockResolver::new("catalog", Behaviour::Answer(Some(70)));
        let resolvers: Vec<Arc<dyn BpmResolver>> = vec![audio.clone(), catalog.clone()];
        let pipeline = ResolutionPipeline::new(resolvers);

        assert_eq!(pipeline.resolve(&track(), 0).await, 140);
        assert_eq!(audio.calls(), 1);
        assert_eq!(catalog.calls(), 0, "Later resolvers must not run after a success");
    }

    #[tokio::test]
    async fn test_falls_through_misses_and_errors() {
        let audio = MockResolver::new("audio_sample", Behaviour::Fail);
        let zero = MockResolver::new("zero", Behaviour::Answer(Some(0)));
        let catalog = MockResolver::new("catalog", Behaviour::Answer(Some(101)));
        let resolvers: Vec<Arc<dyn BpmResolver>> =
            vec![audio.clone(), zero.clone(), catalog.clone()];
        let pipeline = ResolutionPipeline::new(resolvers);

        assert_eq!(pipeline.resolve(&track(), 0).await, 101);
        assert_eq!(audio.calls(), 1);
        assert_eq!(zero.calls(), 1);
        assert_eq!(catalog.calls(), 1);
    }

    #[tokio::test]
    async fn test_default_when_all_miss() {
        let resolvers: Vec<Arc<dyn BpmResolver>> = vec![
            MockResolver::new("audio_sample", Behaviour::Answer(None)),
            MockResolver::new("catalog", Behaviour::Fail),
        ];
        let pipeline = ResolutionPipeline::new(resolvers);

        assert_eq!(pipeline.resolve(&track(), 95).await, 95);
        assert_eq!(pipeline.resolve(&track(), 0).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_no_result() {
        let slow = MockResolver::new("audio_sample", Behaviour::Hang);
        let catalog = MockResolver::new("catalog", Behaviour::Answer(Some(128)));
        let resolvers: Vec<Arc<dyn BpmResolver>> = vec![slow.clone(), catalog.clone()];
        let pipeline = ResolutionPipeline::new(resolvers);

        assert_eq!(pipeline.resolve(&track(), 0).await, 128);
        assert_eq!(slow.calls(), 1);
    }

    #[test]
    fn test_names_in_priority_order() {
        let resolvers: Vec<Arc<dyn BpmResolver>> = vec![
            MockResolver::new("audio_sample", Behaviour::Answer(None)),
            MockResolver::new("catalog", Behaviour::Answer(None)),
        ];
        let pipeline = ResolutionPipeline::new(resolvers);

        assert_eq!(pipeline.count(), 2);
        assert_eq!(pipeline.names(), vec!["audio_sample", "catalog"]);
    }
}
