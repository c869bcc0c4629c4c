//! Playback data model
//!
//! Values observed from the streaming account. Nothing here is shared
//! mutable state; see the coordinator in `tempo-sync` for that.

use serde::{Deserialize, Serialize};

/// Identity of a track as reported by the playback service
///
/// Two identities are equal iff their `id` matches. `title` and `artist`
/// are informational and only used as lookup keys by resolvers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackIdentity {
    /// Opaque catalog id
    pub id: String,
    /// Track title
    pub title: String,
    /// Primary artist name (empty when the service reports none)
    pub artist: String,
}

impl TrackIdentity {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
        }
    }
}

impl PartialEq for TrackIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TrackIdentity {}

impl std::fmt::Display for TrackIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.artist.is_empty() {
            write!(f, "{}", self.title)
        } else {
            write!(f, "{} - {}", self.artist, self.title)
        }
    }
}

/// One poll's observation of playback state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    /// Whether the account is actively playing
    pub is_playing: bool,
    /// Current track, if the service exposes one
    pub track: Option<TrackIdentity>,
}

impl PlaybackSnapshot {
    /// Snapshot for an actively playing track
    pub fn playing(track: TrackIdentity) -> Self {
        Self {
            is_playing: true,
            track: Some(track),
        }
    }

    /// Snapshot for "nothing playing"
    pub fn stopped() -> Self {
        Self::default()
    }

    /// The track to follow, if playback is active
    pub fn active_track(&self) -> Option<&TrackIdentity> {
        if self.is_playing {
            self.track.as_ref()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_equality_by_id_only() {
        let a =
            TrackIdentity::new("4uLU6hMCjMI75M1A2tKUQC", "Never Gonna Give You Up", "Rick Astley");
        let b = TrackIdentity::new("4uLU6hMCjMI75M1A2tKUQC", "Different title", "Someone else");
        let c =
            TrackIdentity::new("7GhIk7Il098yCjg4BQjzvb", "Never Gonna Give You Up", "Rick Astley");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_active_track() {
        let track = TrackIdentity::new("abc", "Song", "Band");

        assert_eq!(PlaybackSnapshot::playing(track.clone()).active_track(), Some(&track));
        assert!(PlaybackSnapshot::stopped().active_track().is_none());

        let paused = PlaybackSnapshot {
            is_playing: false,
            track: Some(track),
        };
        assert!(paused.active_track().is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(TrackIdentity::new("1", "Song", "Band").to_string(), "Band - Song");
        assert_eq!(TrackIdentity::new("1", "Song", "").to_string(), "Song");
    }
}
