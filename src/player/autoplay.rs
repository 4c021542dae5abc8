//! Autoplay recovery
//!
//! Platforms may reject programmatic playback until the user interacts with
//! the page. A rejected play leaves a [`PendingResume`] behind; a later user
//! gesture replays it through [`AutoplayRecovery::resume`]. Playback is never
//! retried automatically, since a retry loop outside a gesture handler would
//! just be rejected again.

use tokio::sync::watch;

use super::element::MediaElement;
use crate::error::PlaybackError;

/// Playback intent captured when play was rejected
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingResume {
    pub is_playing: bool,
    pub adjusted_time: f64,
}

pub struct AutoplayRecovery {
    pending: Option<PendingResume>,
    blocked_tx: watch::Sender<bool>,
}

impl AutoplayRecovery {
    pub fn new() -> Self {
        let (blocked_tx, _) = watch::channel(false);
        Self {
            pending: None,
            blocked_tx,
        }
    }

    /// Blocked/unblocked transitions
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.blocked_tx.subscribe()
    }

    pub fn is_blocked(&self) -> bool {
        *self.blocked_tx.borrow()
    }

    pub fn pending(&self) -> Option<PendingResume> {
        self.pending
    }

    /// Record a rejected play
    pub fn on_rejection(&mut self, pending: PendingResume) {
        tracing::warn!(
            "Playback blocked by autoplay policy, waiting for user gesture (resume at {:.2}s)",
            pending.adjusted_time
        );
        self.pending = Some(pending);
        self.set_blocked(true);
    }

    /// A newer snapshot replaces the pending intent while blocked
    pub fn supersede(&mut self, pending: PendingResume) {
        if self.pending.is_some() {
            self.pending = Some(pending);
        }
    }

    /// Drop any pending intent and unblock
    pub fn clear(&mut self) {
        self.pending = None;
        self.set_blocked(false);
    }

    /// Replay the pending intent. Must only be called from a user gesture.
    ///
    /// On success the pending entry is consumed and the block cleared. On
    /// failure nothing changes and the caller should keep offering a
    /// "tap to resume" affordance.
    pub fn resume<E: MediaElement>(&mut self, element: &mut E) -> Result<PendingResume, PlaybackError> {
        let pending = self.pending.ok_or(PlaybackError::NoPendingResume)?;

        if (element.current_time() - pending.adjusted_time).abs() > f64::EPSILON {
            element.set_current_time(pending.adjusted_time);
        }

        if pending.is_playing && element.paused() {
            if let Err(e) = element.play() {
                tracing::warn!("Resume rejected: {}", e);
                return Err(PlaybackError::AutoplayBlocked);
            }
        } else if !pending.is_playing && !element.paused() {
            element.pause();
        }

        tracing::info!("Playback resumed at {:.2}s", pending.adjusted_time);
        self.clear();
        Ok(pending)
    }

    fn set_blocked(&self, blocked: bool) {
        self.blocked_tx.send_if_modified(|current| {
            let changed = *current != blocked;
            *current = blocked;
            changed
        });
    }
}

impl Default for AutoplayRecovery {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::element::fake::{FakeElement, Op};

    #[test]
    fn test_rejection_then_resume() {
        let mut recovery = AutoplayRecovery::new();
        let blocked = recovery.subscribe();
        let mut element = FakeElement::new();
        element.src = Some("http://host/a.mp3".into());

        recovery.on_rejection(PendingResume {
            is_playing: true,
            adjusted_time: 40.5,
        });
        assert!(*blocked.borrow());

        let resumed = recovery.resume(&mut element).unwrap();
        assert_eq!(resumed.adjusted_time, 40.5);
        assert_eq!(element.take_ops(), vec![Op::Seek(40.5), Op::Play]);
        assert!(!element.paused());
        assert!(!*blocked.borrow());

        // Consumed at most once
        assert_eq!(recovery.resume(&mut element), Err(PlaybackError::NoPendingResume));
    }

    #[test]
    fn test_failed_resume_keeps_state() {
        let mut recovery = AutoplayRecovery::new();
        let mut element = FakeElement::new();
        element.reject_play = true;

        let pending = PendingResume {
            is_playing: true,
            adjusted_time: 5.0,
        };
        recovery.on_rejection(pending);

        assert_eq!(recovery.resume(&mut element), Err(PlaybackError::AutoplayBlocked));
        assert!(recovery.is_blocked());
        assert_eq!(recovery.pending(), Some(pending));
    }

    #[test]
    fn test_supersede_only_when_pending() {
        let mut recovery = AutoplayRecovery::new();
        let later = PendingResume {
            is_playing: true,
            adjusted_time: 9.0,
        };

        recovery.supersede(later);
        assert_eq!(recovery.pending(), None);

        recovery.on_rejection(PendingResume {
            is_playing: true,
            adjusted_time: 1.0,
        });
        recovery.supersede(later);
        assert_eq!(recovery.pending(), Some(later));
    }
}
