//! Snapshot pipeline: normalization and drift compensation

pub mod drift;
pub mod normalizer;
pub mod snapshot;

pub use drift::DriftCompensator;
pub use normalizer::{normalize, SnapshotPayload, Timeline};
pub use snapshot::{AdjustedSnapshot, PlaybackSnapshot};
