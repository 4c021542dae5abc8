//! Network delay compensation
//!
//! A snapshot describes where playback was at `reference_timestamp`; by the
//! time it arrives the room has moved on. While playing, the position is
//! pushed forward by the measured one-way delay, capped at
//! `max_adjustment_secs`. Delays at or past the ceiling are stale and get no
//! compensation at all.

use std::time::Duration;

use super::snapshot::{AdjustedSnapshot, PlaybackSnapshot};
use crate::config::SyncTuning;

/// Forward-only, bounded position extrapolation
#[derive(Debug, Clone, Copy)]
pub struct DriftCompensator {
    delay_ceiling_ms: i64,
    max_adjustment_secs: f64,
}

impl DriftCompensator {
    pub fn new(delay_ceiling: Duration, max_adjustment_secs: f64) -> Self {
        Self {
            delay_ceiling_ms: i64::try_from(delay_ceiling.as_millis()).unwrap_or(i64::MAX),
            max_adjustment_secs: max_adjustment_secs.max(0.0),
        }
    }

    pub fn from_tuning(tuning: &SyncTuning) -> Self {
        Self::new(tuning.delay_ceiling, tuning.max_adjustment_secs)
    }

    /// Estimated one-way delay in milliseconds
    pub fn delay_ms(snapshot: &PlaybackSnapshot, now_ms: i64) -> i64 {
        now_ms.saturating_sub(snapshot.reference_timestamp.unwrap_or(now_ms))
    }

    /// Compensation in seconds that applies to `snapshot` at `now_ms`
    pub fn compensation(&self, snapshot: &PlaybackSnapshot, now_ms: i64) -> f64 {
        if !snapshot.is_playing {
            return 0.0;
        }

        let delay = Self::delay_ms(snapshot, now_ms);
        if delay <= 0 {
            return 0.0;
        }
        if delay >= self.delay_ceiling_ms {
            tracing::debug!(
                "Ignoring stale snapshot delay of {}ms (ceiling {}ms)",
                delay,
                self.delay_ceiling_ms
            );
            return 0.0;
        }

        (delay as f64 / 1000.0).min(self.max_adjustment_secs)
    }

    pub fn adjust(&self, snapshot: PlaybackSnapshot, now_ms: i64) -> AdjustedSnapshot {
        let compensation = self.compensation(&snapshot, now_ms);
        // Compensation never rewinds
        let adjusted_time = (snapshot.reported_time + compensation).max(snapshot.reported_time);

        AdjustedSnapshot {
            snapshot,
            adjusted_time,
        }
    }
}

impl Default for DriftCompensator {
    fn default() -> Self {
        Self::from_tuning(&SyncTuning::desktop())
    }
}
