//! Spotify Web API client
//!
//! Two uses:
//! - `GET /me/player` for the playback snapshot (poller)
//! - `GET /tracks/{id}` + preview download for the audio-sample resolver
//!
//! Authentication is a pre-issued bearer token. Refreshing it is somebody
//! else's job; a rejected token surfaces as [`PlaybackError::Unauthorized`]
//! on every poll until the process is restarted with a fresh one.

use crate::playback::{PlaybackError, PlaybackSource};
use crate::resolvers::{PreviewSource, ResolverError};
use serde::Deserialize;
use std::time::Duration;
use tempo_common::{PlaybackSnapshot, TrackIdentity};

use super::USER_AGENT;

/// `GET /me/player` body (fields we use)
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentPlayback {
    #[serde(default)]
    pub is_playing: bool,
    /// Null for ads and while switching devices
    #[serde(default)]
    pub item: Option<PlaybackItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackItem {
    /// Null for local files
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Absent for podcast episodes
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistRef {
    pub name: String,
}

/// `GET /tracks/{id}` body (fields we use)
#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    #[serde(default)]
    pub preview_url: Option<String>,
}

impl CurrentPlayback {
    /// Reduce the API body to a snapshot
    ///
    /// Items without an id cannot be tracked across polls, so they are
    /// reported as "no track" rather than invented.
    pub fn into_snapshot(self) -> PlaybackSnapshot {
        let track = self.item.and_then(|item| {
            let id = item.id.filter(|id| !id.is_empty())?;
            let artist = item
                .artists
                .into_iter()
                .next()
                .map(|a| a.name)
                .unwrap_or_default();
            Some(TrackIdentity::new(id, item.name.unwrap_or_default(), artist))
        });

        PlaybackSnapshot {
            is_playing: self.is_playing,
            track,
        }
    }
}

/// Spotify Web API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    api_base: String,
    access_token: String,
    timeout: Duration,
    max_preview_bytes: usize,
}

impl SpotifyClient {
    /// Create new Spotify client
    ///
    /// `api_base` is e.g. `https://api.spotify.com/v1` (trailing slash optional).
    pub fn new(
        api_base: &str,
        access_token: String,
        timeout: Duration,
        max_preview_bytes: usize,
    ) -> Result<Self, PlaybackError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| PlaybackError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token,
            timeout,
            max_preview_bytes,
        })
    }

    /// Fetch the current playback snapshot
    ///
    /// `204 No Content` means no active device: reported as not playing.
    pub async fn current_playback(&self) -> Result<PlaybackSnapshot, PlaybackError> {
        let url = format!("{}/me/player", self.api_base);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| PlaybackError::Network(e.to_string()))?;

        let status = response.status();

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(PlaybackSnapshot::stopped());
        }

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(PlaybackError::Unauthorized);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PlaybackError::Api(status.as_u16(), error_text));
        }

        let playback: CurrentPlayback = response
            .json()
            .await
            .map_err(|e| PlaybackError::Parse(e.to_string()))?;

        Ok(playback.into_snapshot())
    }

    /// Look up the preview clip URL for a track
    pub async fn preview_url(&self, track_id: &str) -> Result<Option<String>, ResolverError> {
        let url = format!("{}/tracks/{}", self.api_base, track_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ResolverError::from_reqwest(e, self.timeout))?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ResolverError::Api(status.as_u16(), error_text));
        }

        let track: TrackObject = response
            .json()
            .await
            .map_err(|e| ResolverError::Malformed(e.to_string()))?;

        Ok(track.preview_url.filter(|url| !url.is_empty()))
    }

    /// Download a preview clip, refusing anything larger than the configured cap
    ///
    /// The body is read chunk by chunk, so at most one chunk past the cap
    /// is ever buffered even when the server omits `Content-Length`.
    pub async fn download_preview(&self, url: &str) -> Result<Vec<u8>, ResolverError> {
        let mut response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ResolverError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolverError::Api(
                status.as_u16(),
                format!("preview download failed: {}", url),
            ));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_preview_bytes as u64 {
                return Err(self.preview_too_large(length));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ResolverError::from_reqwest(e, self.timeout))?
        {
            if body.len() + chunk.len() > self.max_preview_bytes {
                return Err(self.preview_too_large((body.len() + chunk.len()) as u64));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }

    fn preview_too_large(&self, seen: u64) -> ResolverError {
        ResolverError::Malformed(format!(
            "Preview too large ({}+ bytes, limit {})",
            seen, self.max_preview_bytes
        ))
    }
}

#[async_trait::async_trait]
impl PlaybackSource for SpotifyClient {
    async fn current_playback(&self) -> Result<PlaybackSnapshot, PlaybackError> {
        SpotifyClient::current_playback(self).await
    }
}

#[async_trait::async_trait]
impl PreviewSource for SpotifyClient {
    async fn fetch_preview(&self, track: &TrackIdentity) -> Result<Option<Vec<u8>>, ResolverError> {
        let Some(url) = self.preview_url(&track.id).await? else {
            return Ok(None);
        };

        tracing::debug!(track_id = %track.id, url = %url, "Downloading preview");

        self.download_preview(&url).await.map(Some)
    }
}
