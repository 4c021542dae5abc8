//! Snapshot normalization
//!
//! The server has shipped two snapshot shapes over time: a legacy one that
//! carries standalone `metadata` for the playing track, and the current one
//! that carries the whole `queue` plus `currentTrackIndex`. Both are
//! classified into [`SnapshotPayload`] here and collapsed into a single
//! [`PlaybackSnapshot`]; nothing past this module looks at the raw shape.

use std::sync::Arc;

use super::snapshot::PlaybackSnapshot;
use crate::protocol::{MusicMetadata, QueueItem, RawSnapshot};
use crate::queue::{resolve, DownloadStatus, QueueManager, QueueState, Track, NO_INDEX};

/// Track-bearing part of a raw snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotPayload {
    /// Full queue with the current position
    Queue { items: Vec<QueueItem>, current_index: i64 },
    /// Standalone metadata for the playing track
    Legacy { metadata: MusicMetadata },
    /// Timeline only; the track comes from the last known queue
    Bare,
}

/// Timeline fields shared by every snapshot shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timeline {
    pub is_playing: bool,
    pub reported_time: f64,
    pub reference_timestamp: Option<i64>,
}

impl SnapshotPayload {
    /// Split a raw snapshot into its timeline and payload
    pub fn classify(raw: RawSnapshot) -> (Timeline, SnapshotPayload) {
        let reported_time = if raw.current_time.is_finite() {
            raw.current_time.max(0.0)
        } else {
            0.0
        };

        let timeline = Timeline {
            is_playing: raw.is_playing,
            reported_time,
            reference_timestamp: raw.server_timestamp.or(raw.last_updated),
        };

        let payload = match (raw.queue, raw.metadata) {
            (Some(items), _) => SnapshotPayload::Queue {
                items,
                current_index: raw.current_track_index.unwrap_or(NO_INDEX),
            },
            (None, Some(metadata)) => SnapshotPayload::Legacy { metadata },
            (None, None) => SnapshotPayload::Bare,
        };

        (timeline, payload)
    }
}

/// Convert a raw snapshot into the canonical form.
///
/// Queue payloads also replace the queue held by `queue`. The resulting
/// `active_track` is `None` only when no playable media URL resolves.
pub fn normalize(raw: RawSnapshot, queue: &mut QueueManager) -> PlaybackSnapshot {
    let (timeline, payload) = SnapshotPayload::classify(raw);

    let active = match payload {
        SnapshotPayload::Queue {
            items,
            current_index,
        } => queue.update_from_wire(&items, current_index).active,
        SnapshotPayload::Legacy { metadata } => legacy_track(&metadata, queue),
        SnapshotPayload::Bare => queue.resolution().active,
    };

    let active_track = active.filter(|track| {
        let playable = track.is_playable();
        if !playable {
            tracing::debug!("Active track {} has no media URL yet", track.id);
        }
        playable
    });

    PlaybackSnapshot {
        is_playing: timeline.is_playing,
        reported_time: timeline.reported_time,
        reference_timestamp: timeline.reference_timestamp,
        active_track,
    }
}

/// Wrap legacy metadata as a single-element queue and resolve it
fn legacy_track(metadata: &MusicMetadata, queue: &QueueManager) -> Option<Arc<Track>> {
    let media_url = queue.urls().resolve(&metadata.mp3_url)?;

    let track = Track {
        id: format!("legacy:{}", media_url),
        title: metadata.title.clone(),
        artist: metadata.artist.clone(),
        duration_secs: metadata.duration.max(0.0),
        media_url,
        cover_url: metadata.cover_url.clone(),
        added_by: String::new(),
        added_at: None,
        download_status: DownloadStatus::Completed,
        download_progress: 100,
    };

    resolve(&QueueState::new(vec![Arc::new(track)], 0), None).active
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MediaUrlResolver;

    fn manager() -> QueueManager {
        QueueManager::new(MediaUrlResolver::new("http://host:3000"))
    }

    fn item(id: &str, url: &str) -> QueueItem {
        QueueItem {
            id: id.to_string(),
            mp3_url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_queue_snapshot() {
        let mut queue = manager();
        let raw = RawSnapshot {
            is_playing: true,
            current_time: 12.0,
            server_timestamp: Some(1_000),
            last_updated: Some(500),
            queue: Some(vec![item("a", "/a.mp3"), item("b", "/b.mp3")]),
            current_track_index: Some(1),
            ..Default::default()
        };

        let snapshot = normalize(raw, &mut queue);

        assert!(snapshot.is_playing);
        assert_eq!(snapshot.reported_time, 12.0);
        assert_eq!(snapshot.reference_timestamp, Some(1_000));
        assert_eq!(snapshot.media_url(), Some("http://host:3000/b.mp3"));
        assert_eq!(queue.state().current_index, 1);
    }

    #[test]
    fn test_legacy_metadata_snapshot() {
        let mut queue = manager();
        let raw = RawSnapshot {
            current_time: 3.0,
            last_updated: Some(42),
            metadata: Some(MusicMetadata {
                title: "Old".into(),
                mp3_url: "/old.mp3".into(),
                ..Default::default()
            }),
            ..Default::default()
        };

        let snapshot = normalize(raw, &mut queue);

        let track = snapshot.active_track.unwrap();
        assert_eq!(track.title, "Old");
        assert_eq!(track.media_url, "http://host:3000/old.mp3");
        assert_eq!(snapshot.reference_timestamp, Some(42));
        // Legacy snapshots leave the queue alone
        assert!(queue.state().is_empty());
    }

    #[test]
    fn test_bare_snapshot_uses_known_queue() {
        let mut queue = manager();
        queue.update_from_wire(&[item("a", "/a.mp3")], 0);

        let snapshot = normalize(
            RawSnapshot {
                is_playing: true,
                current_time: 1.0,
                ..Default::default()
            },
            &mut queue,
        );

        assert_eq!(snapshot.media_url(), Some("http://host:3000/a.mp3"));
        assert_eq!(snapshot.reference_timestamp, None);
    }

    #[test]
    fn test_unplayable_track_is_none() {
        let mut queue = manager();
        let snapshot = normalize(
            RawSnapshot {
                queue: Some(vec![item("a", "")]),
                current_track_index: Some(0),
                ..Default::default()
            },
            &mut queue,
        );
        assert!(snapshot.active_track.is_none());

        let snapshot = normalize(
            RawSnapshot {
                metadata: Some(MusicMetadata::default()),
                ..Default::default()
            },
            &mut queue,
        );
        assert!(snapshot.active_track.is_none());
    }

    #[test]
    fn test_empty_queue_snapshot() {
        let mut queue = manager();
        queue.update_from_wire(&[item("a", "/a.mp3")], 0);

        let snapshot = normalize(
            RawSnapshot {
                is_playing: true,
                queue: Some(vec![]),
                current_track_index: Some(-1),
                ..Default::default()
            },
            &mut queue,
        );

        assert!(snapshot.active_track.is_none());
        assert!(queue.state().is_empty());
    }

    #[test]
    fn test_negative_time_clamped() {
        let (timeline, payload) = SnapshotPayload::classify(RawSnapshot {
            current_time: -4.0,
            ..Default::default()
        });
        assert_eq!(timeline.reported_time, 0.0);
        assert_eq!(payload, SnapshotPayload::Bare);
    }

    #[test]
    fn test_queue_without_index_keeps_prior() {
        let mut queue = manager();
        queue.update_from_wire(&[item("a", "/a.mp3"), item("b", "/b.mp3")], 1);

        let snapshot = normalize(
            RawSnapshot {
                queue: Some(vec![item("a", "/a.mp3"), item("b", "/b.mp3")]),
                ..Default::default()
            },
            &mut queue,
        );

        assert_eq!(snapshot.media_url(), Some("http://host:3000/b.mp3"));
    }
}
