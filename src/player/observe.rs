//! Observable player state for UI consumers

use std::sync::Arc;
use tokio::sync::watch;

use super::interaction::Dimension;
use crate::queue::Track;

/// What the UI shows on the transport bar
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackProgress {
    pub is_playing: bool,
    pub current_time: f64,
}

/// Local-only value shown while a control is being dragged
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragPreview {
    pub dimension: Dimension,
    pub value: f64,
}

/// Receivers handed to the UI
#[derive(Debug, Clone)]
pub struct PlayerWatch {
    pub progress: watch::Receiver<PlaybackProgress>,
    pub active_track: watch::Receiver<Option<Arc<Track>>>,
    pub autoplay_blocked: watch::Receiver<bool>,
    pub preview: watch::Receiver<Option<DragPreview>>,
    pub volume: watch::Receiver<f64>,
}

/// Publish `track` only if it differs from the current value
pub(crate) fn publish_track(tx: &watch::Sender<Option<Arc<Track>>>, track: Option<Arc<Track>>) {
    tx.send_if_modified(|current| {
        let same = match (current.as_ref(), track.as_ref()) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b) || a == b,
            (None, None) => true,
            _ => false,
        };
        if !same {
            *current = track;
        }
        !same
    });
}
