//! Catalog-lookup resolver
//!
//! Asks a song-metadata service for the tempo it has on file, keyed only by
//! title and artist text. Cheap and quick, but text matching can land on a
//! different recording (live versions, remasters, covers).

use super::{BpmResolver, ResolverError};
use std::sync::Arc;
use std::time::Duration;
use tempo_common::TrackIdentity;
use tracing::debug;

/// Text-keyed tempo lookup service
#[async_trait::async_trait]
pub trait TempoCatalog: Send + Sync {
    /// Look up the reported tempo for `title` by `artist`
    async fn lookup_tempo(&self, title: &str, artist: &str) -> Result<Option<u32>, ResolverError>;
}

/// Resolver backed by a [`TempoCatalog`]
pub struct CatalogResolver {
    catalog: Arc<dyn TempoCatalog>,
    budget: Duration,
}

impl CatalogResolver {
    pub fn new(catalog: Arc<dyn TempoCatalog>, budget: Duration) -> Self {
        Self { catalog, budget }
    }
}

#[async_trait::async_trait]
impl BpmResolver for CatalogResolver {
    fn name(&self) -> &'static str {
        "catalog"
    }

    fn budget(&self) -> Duration {
        self.budget
    }

    async fn resolve(&self, track: &TrackIdentity) -> Result<Option<u32>, ResolverError> {
        if track.title.trim().is_empty() {
            debug!(track_id = %track.id, "Track has no title; skipping catalog lookup");
            return Ok(None);
        }

        let bpm = self.catalog.lookup_tempo(&track.title, &track.artist).await?;
        Ok(bpm.filter(|bpm| *bpm > 0))
    }
}
