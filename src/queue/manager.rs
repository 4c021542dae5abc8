//! Queue manager
//!
//! Holds the latest queue pushed by the server and publishes it to UI
//! consumers. Item-level download events replace individual entries.

use std::sync::Arc;
use tokio::sync::watch;

use super::resolver::{resolve, QueueState, Resolution};
use super::track::{DownloadStatus, MediaUrlResolver, Track};
use crate::protocol::QueueItem;

/// Owner of the client's view of the room queue
pub struct QueueManager {
    state: QueueState,
    /// Last valid index, used when the server omits one
    prior_index: Option<usize>,
    urls: MediaUrlResolver,
    tx: watch::Sender<QueueState>,
}

impl QueueManager {
    pub fn new(urls: MediaUrlResolver) -> Self {
        let (tx, _) = watch::channel(QueueState::empty());
        Self {
            state: QueueState::empty(),
            prior_index: None,
            urls,
            tx,
        }
    }

    /// Subscribe to queue changes
    pub fn subscribe(&self) -> watch::Receiver<QueueState> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> &QueueState {
        &self.state
    }

    pub fn urls(&self) -> &MediaUrlResolver {
        &self.urls
    }

    /// Replace the queue with wire items from the server
    pub fn update_from_wire(&mut self, items: &[QueueItem], current_index: i64) -> Resolution {
        let tracks = items
            .iter()
            .map(|item| Arc::new(item.to_track(&self.urls)))
            .collect();
        self.update(QueueState::new(tracks, current_index))
    }

    /// Replace the queue, keeping the prior index if the new one is missing
    pub fn update(&mut self, mut state: QueueState) -> Resolution {
        let resolution = resolve(&state, self.prior_index);
        state.current_index = resolution.index;
        self.prior_index = resolution.position();

        tracing::debug!(
            "Queue updated: {} tracks, current index {}",
            state.len(),
            state.current_index
        );

        self.state = state;
        self.publish();
        resolution
    }

    /// Resolution of the current state
    pub fn resolution(&self) -> Resolution {
        resolve(&self.state, self.prior_index)
    }

    /// Download progress for a queued item
    pub fn apply_item_progress(&mut self, item_id: &str, progress: u8, status: &str) -> bool {
        self.replace_item(item_id, |track| {
            track.download_progress = progress.min(100);
            track.download_status = DownloadStatus::parse(status);
        })
    }

    /// Item finished downloading and now has a media path
    pub fn apply_item_complete(&mut self, item_id: &str, media_path: &str, status: &str) -> bool {
        let media_url = self.urls.resolve(media_path).unwrap_or_default();
        self.replace_item(item_id, move |track| {
            track.media_url = media_url;
            track.download_status = DownloadStatus::parse(status);
            track.download_progress = 100;
        })
    }

    pub fn apply_item_error(&mut self, item_id: &str, error: &str, status: &str) -> bool {
        tracing::warn!("Queue item {} failed: {}", item_id, error);
        self.replace_item(item_id, |track| {
            track.download_status = DownloadStatus::parse(status);
            track.download_progress = 0;
        })
    }

    fn replace_item(&mut self, item_id: &str, update: impl FnOnce(&mut Track)) -> bool {
        let Some(slot) = self.state.tracks.iter_mut().find(|t| t.id == item_id) else {
            tracing::debug!("Ignoring event for unknown queue item {}", item_id);
            return false;
        };

        let mut track = Track::clone(slot);
        update(&mut track);
        *slot = Arc::new(track);
        self.publish();
        true
    }

    fn publish(&self) {
        self.tx.send_replace(self.state.clone());
    }
}
