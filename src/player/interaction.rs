//! Local interaction guard
//!
//! While the user drags the seek bar or the volume slider, incoming syncs
//! must not move that control. The guard is a cooperative lock: a flag with
//! an owner tag that the reconciler checks before touching the locked
//! dimension. Drag values live in a local preview and are only committed on
//! release.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

use super::observe::DragPreview;
use crate::error::InteractionError;

/// Which control is being dragged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Progress,
    Volume,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Progress => write!(f, "progress"),
            Dimension::Volume => write!(f, "volume"),
        }
    }
}

/// Held lock with its preview value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionLock {
    pub holder: Dimension,
    pub preview: Option<f64>,
}

/// Value committed when a drag is released
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragCommit {
    /// Seek intent for the room, in seconds
    Seek(f64),
    /// Local volume, 0.0..=1.0
    Volume(f64),
}

pub struct InteractionGuard {
    lock: Option<InteractionLock>,
    preview_tx: watch::Sender<Option<DragPreview>>,
}

impl InteractionGuard {
    pub fn new() -> Self {
        let (preview_tx, _) = watch::channel(None);
        Self {
            lock: None,
            preview_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<DragPreview>> {
        self.preview_tx.subscribe()
    }

    pub fn is_locked(&self, dimension: Dimension) -> bool {
        self.holder() == Some(dimension)
    }

    pub fn holder(&self) -> Option<Dimension> {
        self.lock.map(|lock| lock.holder)
    }

    pub fn lock(&self) -> Option<InteractionLock> {
        self.lock
    }

    /// Take the lock for `dimension`. Re-entering the same drag is a no-op.
    pub fn begin_drag(&mut self, dimension: Dimension) -> Result<(), InteractionError> {
        match self.lock {
            Some(lock) if lock.holder == dimension => Ok(()),
            Some(lock) => Err(InteractionError::Busy(lock.holder)),
            None => {
                tracing::debug!("Drag started on {}", dimension);
                self.lock = Some(InteractionLock {
                    holder: dimension,
                    preview: None,
                });
                Ok(())
            }
        }
    }

    /// Update the local preview. Never touches the element.
    pub fn update_preview(&mut self, dimension: Dimension, value: f64) -> Result<(), InteractionError> {
        let lock = match self.lock.as_mut() {
            Some(lock) if lock.holder == dimension => lock,
            _ => return Err(InteractionError::NotHeld(dimension)),
        };

        let value = clamp_value(dimension, value);
        lock.preview = Some(value);
        self.preview_tx.send_replace(Some(DragPreview { dimension, value }));
        Ok(())
    }

    /// Release the lock. With `commit` the last preview value is returned
    /// for the caller to act on; a cancelled drag yields nothing.
    pub fn end_drag(
        &mut self,
        dimension: Dimension,
        commit: bool,
    ) -> Result<Option<DragCommit>, InteractionError> {
        let lock = match self.lock {
            Some(lock) if lock.holder == dimension => lock,
            _ => return Err(InteractionError::NotHeld(dimension)),
        };

        self.lock = None;
        self.preview_tx.send_replace(None);
        tracing::debug!("Drag on {} released (commit: {})", dimension, commit);

        if !commit {
            return Ok(None);
        }

        Ok(lock.preview.map(|value| match dimension {
            Dimension::Progress => DragCommit::Seek(value),
            Dimension::Volume => DragCommit::Volume(value),
        }))
    }
}

impl Default for InteractionGuard {
    fn default() -> Self {
        Self::new()
    }
}

fn clamp_value(dimension: Dimension, value: f64) -> f64 {
    let value = if value.is_finite() { value } else { 0.0 };
    match dimension {
        Dimension::Progress => value.max(0.0),
        Dimension::Volume => value.clamp(0.0, 1.0),
    }
}
