//! Canonical playback snapshots

use std::sync::Arc;

use crate::queue::Track;

/// Authoritative description of what should be playing, as of
/// `reference_timestamp`. Never mutated after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    /// Position reported by the server, in seconds
    pub reported_time: f64,
    /// Server wall clock when `reported_time` was sampled, epoch ms
    pub reference_timestamp: Option<i64>,
    pub active_track: Option<Arc<Track>>,
}

impl PlaybackSnapshot {
    /// Media URL the element should have loaded
    pub fn media_url(&self) -> Option<&str> {
        self.active_track.as_deref().map(|t| t.media_url.as_str())
    }
}

/// Snapshot plus the drift-compensated position to seek to
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustedSnapshot {
    pub snapshot: PlaybackSnapshot,
    pub adjusted_time: f64,
}

impl AdjustedSnapshot {
    pub fn is_playing(&self) -> bool {
        self.snapshot.is_playing
    }

    pub fn active_track(&self) -> Option<&Arc<Track>> {
        self.snapshot.active_track.as_ref()
    }

    pub fn media_url(&self) -> Option<&str> {
        self.snapshot.media_url()
    }
}
