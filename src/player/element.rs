//! Media element abstraction
//!
//! The reconciler is the only owner of a [`MediaElement`]. Everything else
//! talks to the element through the reconciler's operations.

use crate::error::PlaybackError;

/// How much media the element has buffered, ordered from least to most
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReadyState {
    HaveNothing,
    HaveMetadata,
    HaveCurrentData,
    /// Enough to start playing; `canplay` fires on reaching this
    HaveFutureData,
    HaveEnoughData,
}

impl ReadyState {
    /// Seeking is reliable from here on
    pub fn can_seek_reliably(self) -> bool {
        self >= ReadyState::HaveFutureData
    }
}

/// Lifecycle events reported by the element
#[derive(Debug, Clone, PartialEq)]
pub enum ElementEvent {
    LoadedMetadata,
    CanPlay,
    Play,
    Pause,
    TimeUpdate,
    Seeked,
    Error(String),
}

/// Playable resource with transport-level controls
pub trait MediaElement {
    /// URL currently loaded, if any
    fn source(&self) -> Option<&str>;

    /// Point the element at a new URL and start loading it.
    /// Loading resets the position and pauses the element.
    fn load(&mut self, url: &str);

    /// Drop the current source
    fn clear_source(&mut self);

    fn current_time(&self) -> f64;

    fn set_current_time(&mut self, seconds: f64);

    fn duration(&self) -> Option<f64>;

    fn paused(&self) -> bool;

    /// Attempt programmatic playback. Fails with
    /// [`PlaybackError::AutoplayBlocked`] when the platform requires a user
    /// gesture.
    fn play(&mut self) -> Result<(), PlaybackError>;

    fn pause(&mut self);

    fn ready_state(&self) -> ReadyState;

    fn volume(&self) -> f64;

    fn set_volume(&mut self, volume: f64);
}
