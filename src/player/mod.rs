//! Playback subsystem: the reconciler and the pieces it owns

pub mod autoplay;
pub mod element;
pub mod interaction;
pub mod observe;
pub mod reconciler;
pub mod simulated;

pub use autoplay::{AutoplayRecovery, PendingResume};
pub use element::{ElementEvent, MediaElement, ReadyState};
pub use interaction::{Dimension, DragCommit, InteractionGuard, InteractionLock};
pub use observe::{DragPreview, PlaybackProgress, PlayerWatch};
pub use reconciler::{Phase, Reconciler, ReconcilerSignal, ReconcilerState, Tick};
pub use simulated::{SimulatedConfig, SimulatedControl, SimulatedElement};
