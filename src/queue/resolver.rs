//! Active track resolution
//!
//! Maps an ordered track list plus a current index to the single active
//! track. The server occasionally omits the index (`-1`) while the queue is
//! still populated; a prior index that is still in range wins in that case so
//! the player does not flicker to "nothing playing".

use std::sync::Arc;

use super::track::Track;

/// Sentinel for "no active track"
pub const NO_INDEX: i64 = -1;

/// Ordered queue with the current position
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueState {
    pub tracks: Vec<Arc<Track>>,
    /// `-1` or a valid index into `tracks`
    pub current_index: i64,
}

impl QueueState {
    pub fn new(tracks: Vec<Arc<Track>>, current_index: i64) -> Self {
        Self {
            tracks,
            current_index,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), NO_INDEX)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn has_next(&self) -> bool {
        !self.tracks.is_empty() && self.current_index < self.tracks.len() as i64 - 1
    }

    pub fn has_previous(&self) -> bool {
        !self.tracks.is_empty() && self.current_index > 0
    }
}

/// Outcome of resolving a queue
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub active: Option<Arc<Track>>,
    /// Normalized index, `-1` when nothing is active
    pub index: i64,
}

impl Resolution {
    pub fn none() -> Self {
        Self {
            active: None,
            index: NO_INDEX,
        }
    }

    /// Index as `usize` when something is active
    pub fn position(&self) -> Option<usize> {
        usize::try_from(self.index).ok()
    }
}

/// Resolve the active track of `state`.
///
/// `prior_index` is the last valid index seen before this update.
pub fn resolve(state: &QueueState, prior_index: Option<usize>) -> Resolution {
    if state.tracks.is_empty() {
        return Resolution::none();
    }

    let index = if state.current_index < 0 {
        match prior_index {
            Some(prior) if prior < state.tracks.len() => prior,
            _ => return Resolution::none(),
        }
    } else {
        match usize::try_from(state.current_index) {
            Ok(index) if index < state.tracks.len() => index,
            _ => return Resolution::none(),
        }
    };

    Resolution {
        active: Some(Arc::clone(&state.tracks[index])),
        index: index as i64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::track::test_track;

    fn queue(n: usize, index: i64) -> QueueState {
        let tracks = (0..n)
            .map(|i| Arc::new(test_track(&i.to_string(), &format!("/t{}.mp3", i))))
            .collect();
        QueueState::new(tracks, index)
    }

    #[test]
    fn test_resolves_current_index() {
        let resolution = resolve(&queue(3, 1), None);
        assert_eq!(resolution.index, 1);
        assert_eq!(resolution.active.unwrap().id, "1");
    }

    #[test]
    fn test_empty_queue_is_none() {
        assert_eq!(resolve(&queue(0, 0), Some(0)), Resolution::none());
        assert_eq!(resolve(&QueueState::empty(), None), Resolution::none());
    }

    #[test]
    fn test_prior_index_survives_missing_index() {
        let resolution = resolve(&queue(3, NO_INDEX), Some(2));
        assert_eq!(resolution.index, 2);
        assert_eq!(resolution.active.unwrap().id, "2");
    }

    #[test]
    fn test_prior_index_out_of_range() {
        assert_eq!(resolve(&queue(2, NO_INDEX), Some(5)), Resolution::none());
        assert_eq!(resolve(&queue(2, NO_INDEX), None), Resolution::none());
    }

    #[test]
    fn test_out_of_range_index() {
        assert_eq!(resolve(&queue(2, 7), Some(0)), Resolution::none());
    }

    #[test]
    fn test_active_track_is_shared_not_copied() {
        let state = queue(2, 0);
        let resolution = resolve(&state, None);
        assert!(Arc::ptr_eq(&state.tracks[0], &resolution.active.unwrap()));
    }

    #[test]
    fn test_neighbours() {
        assert!(queue(3, 0).has_next());
        assert!(!queue(3, 0).has_previous());
        assert!(!queue(3, 2).has_next());
        assert!(queue(3, 2).has_previous());
        assert!(!QueueState::empty().has_next());
    }
}
