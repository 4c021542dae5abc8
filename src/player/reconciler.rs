//! Playback reconciler
//!
//! Owns the media element and converges it on the latest authoritative
//! snapshot with the fewest element operations possible.
//!
//! ```text
//!            no track                    source differs
//!   ┌──────┐ ◄──────── any ───────────► ┌─────────┐
//!   │ Idle │                            │ Loading │──── fallback timer ───┐
//!   └──────┘                            └────┬────┘ ◄── reload once ──────┘
//!                                   canplay  │
//!                                            ▼
//!                                      ┌──────────┐  play() rejected  ┌─────────────────┐
//!                                      │  Synced  │ ────────────────► │ AutoplayBlocked │
//!                                      └──────────┘ ◄──── resume() ── └─────────────────┘
//! ```
//!
//! Per snapshot, once the element's source matches the active track:
//! a drift above the hard threshold on a buffered element seeks and asks the
//! room for a fresh snapshot; a drift above the soft threshold only seeks.
//! Play/pause intent is reconciled last. None of the time-based steps run
//! while the user is dragging the progress bar; the snapshot is kept and
//! applied on release.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use super::autoplay::{AutoplayRecovery, PendingResume};
use super::element::{ElementEvent, MediaElement};
use super::interaction::{Dimension, DragCommit, InteractionGuard};
use super::observe::{publish_track, PlaybackProgress, PlayerWatch};
use crate::config::SyncTuning;
use crate::error::{InteractionError, PlaybackError};
use crate::queue::{Resolution, Track};
use crate::sync::{AdjustedSnapshot, DriftCompensator, PlaybackSnapshot};

/// Positions closer than this are considered equal
const POSITION_EPSILON_SECS: f64 = 0.01;

/// Monotonic and wall-clock time of an event
#[derive(Debug, Clone, Copy)]
pub struct Tick {
    pub at: Instant,
    /// Wall clock in epoch milliseconds, comparable with server timestamps
    pub epoch_ms: i64,
}

impl Tick {
    pub fn now() -> Self {
        Self {
            at: Instant::now(),
            epoch_ms: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn after(&self, elapsed: Duration) -> Self {
        Self {
            at: self.at + elapsed,
            epoch_ms: self.epoch_ms + elapsed.as_millis() as i64,
        }
    }
}

/// Reconciler phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No active track
    Idle,
    /// Element is loading the active track's source
    Loading,
    /// Source matches the active track
    Synced,
    /// A play attempt was rejected; waiting for a user gesture
    AutoplayBlocked,
}

/// Live view of the element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcilerState {
    pub current_track: Option<Arc<Track>>,
    pub is_playing: bool,
    pub local_time: f64,
    pub element_ready: bool,
}

/// Requests the reconciler makes of its surroundings
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcilerSignal {
    /// Ask the room to re-broadcast its snapshot
    RequestSync,
    /// The source did not become playable after the fallback retry
    TrackNotReady { url: String },
}

struct PendingLoad {
    url: String,
    target: AdjustedSnapshot,
    /// Fallback expiry; `None` once the retry budget is spent
    deadline: Option<Instant>,
    reloaded: bool,
}

/// Governor limiter bounding `timeupdate` publication
pub(crate) struct TimeUpdateThrottle {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl TimeUpdateThrottle {
    pub(crate) fn per_second(hz: u32) -> Self {
        let rate = NonZeroU32::new(hz).unwrap_or(NonZeroU32::MIN);
        Self {
            limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(NonZeroU32::MIN)),
        }
    }

    pub(crate) fn admit(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

pub struct Reconciler<E: MediaElement> {
    element: E,
    tuning: SyncTuning,
    compensator: DriftCompensator,
    phase: Phase,
    state: ReconcilerState,
    pending_load: Option<PendingLoad>,
    /// Snapshot for a different source that arrived mid-load
    parked: Option<PlaybackSnapshot>,
    /// Latest snapshot held back by the progress lock
    deferred: Option<PlaybackSnapshot>,
    /// Source finished loading but its start position was not applied yet
    fresh_source: bool,
    autoplay: AutoplayRecovery,
    interaction: InteractionGuard,
    progress_tx: watch::Sender<PlaybackProgress>,
    track_tx: watch::Sender<Option<Arc<Track>>>,
    volume_tx: watch::Sender<f64>,
    time_updates: TimeUpdateThrottle,
    signals: Vec<ReconcilerSignal>,
    last_sync_request: Option<Instant>,
    /// Volume to restore when unmuting
    unmuted_volume: Option<f64>,
}

impl<E: MediaElement> Reconciler<E> {
    pub fn new(element: E, tuning: SyncTuning) -> Self {
        let (progress_tx, _) = watch::channel(PlaybackProgress::default());
        let (track_tx, _) = watch::channel(None);
        let (volume_tx, _) = watch::channel(element.volume());

        Self {
            compensator: DriftCompensator::from_tuning(&tuning),
            time_updates: TimeUpdateThrottle::per_second(tuning.time_update_hz),
            element,
            tuning,
            phase: Phase::Idle,
            state: ReconcilerState::default(),
            pending_load: None,
            parked: None,
            deferred: None,
            fresh_source: false,
            autoplay: AutoplayRecovery::new(),
            interaction: InteractionGuard::new(),
            progress_tx,
            track_tx,
            volume_tx,
            signals: Vec::new(),
            last_sync_request: None,
            unmuted_volume: None,
        }
    }

    /// Receivers for UI consumers
    pub fn watch(&self) -> PlayerWatch {
        PlayerWatch {
            progress: self.progress_tx.subscribe(),
            active_track: self.track_tx.subscribe(),
            autoplay_blocked: self.autoplay.subscribe(),
            preview: self.interaction.subscribe(),
            volume: self.volume_tx.subscribe(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &ReconcilerState {
        &self.state
    }

    pub fn element(&self) -> &E {
        &self.element
    }

    pub fn pending_resume(&self) -> Option<PendingResume> {
        self.autoplay.pending()
    }

    /// When the load fallback timer should fire
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_load.as_ref().and_then(|p| p.deadline)
    }

    /// Take the signals raised since the last call
    pub fn drain_signals(&mut self) -> Vec<ReconcilerSignal> {
        std::mem::take(&mut self.signals)
    }

    /// Compensate `snapshot` for network delay and apply it
    pub fn apply(&mut self, snapshot: PlaybackSnapshot, tick: Tick) {
        let adjusted = self.compensator.adjust(snapshot, tick.epoch_ms);
        self.apply_adjusted(adjusted, tick);
    }

    pub fn apply_adjusted(&mut self, adjusted: AdjustedSnapshot, tick: Tick) {
        let Some(track) = adjusted.active_track().cloned() else {
            self.go_idle();
            return;
        };
        let url = track.media_url.clone();

        if let Some(pending) = self.pending_load.as_mut() {
            if pending.url == url {
                // Same source still loading: the newest target wins
                pending.target = adjusted;
                self.parked = None;
                return;
            }
            if pending.deadline.is_some() {
                tracing::debug!("Parking snapshot for {} until {} settles", url, pending.url);
                self.parked = Some(adjusted.snapshot);
                return;
            }
            // Retries spent on the old source; nothing left to wait for
            tracing::debug!("Dropping abandoned load of {}", pending.url);
            self.pending_load = None;
            self.parked = None;
        }

        if self.element.source() != Some(url.as_str()) {
            self.start_load(track, adjusted, tick);
            return;
        }

        self.set_current_track(Some(track));

        if self.interaction.is_locked(Dimension::Progress) {
            tracing::debug!("Progress drag in progress, deferring snapshot");
            self.deferred = Some(adjusted.snapshot);
            return;
        }

        self.converge(&adjusted, tick);
        self.sync_state();
    }

    /// Feed an element lifecycle event
    pub fn on_element_event(&mut self, event: ElementEvent, tick: Tick) {
        match event {
            ElementEvent::CanPlay => {
                self.state.element_ready = true;
                let awaited = self
                    .pending_load
                    .as_ref()
                    .is_some_and(|p| self.element.source() == Some(p.url.as_str()));
                if awaited {
                    self.complete_load(tick);
                }
            }
            ElementEvent::LoadedMetadata => {
                tracing::debug!("Metadata loaded, duration {:?}", self.element.duration());
            }
            ElementEvent::Play | ElementEvent::Pause | ElementEvent::Seeked => self.sync_state(),
            ElementEvent::TimeUpdate => {
                if self.time_updates.admit() {
                    self.sync_state();
                }
            }
            ElementEvent::Error(message) => {
                tracing::warn!("{}", PlaybackError::LoadFailed(message));
                self.state.element_ready = false;
                let loading = self.pending_load.as_ref().is_some_and(|p| p.deadline.is_some());
                if loading {
                    self.recover_load(tick, false);
                }
            }
        }
    }

    /// Fallback timer expiry
    pub fn on_timer(&mut self, tick: Tick) {
        let due = self
            .pending_load
            .as_ref()
            .and_then(|p| p.deadline)
            .is_some_and(|deadline| tick.at >= deadline);
        if !due {
            return;
        }

        self.recover_load(tick, true);
    }

    /// Move a stalled or failed load forward: switch to a parked source,
    /// start an element that turned out to be ready, reload once, or give up
    /// with `TrackNotReady`.
    fn recover_load(&mut self, tick: Tick, may_be_ready: bool) {
        if let Some(parked) = self.parked.take() {
            tracing::debug!("Abandoning in-flight load for a newer source");
            self.pending_load = None;
            self.apply(parked, tick);
            return;
        }

        if may_be_ready && self.element.ready_state().can_seek_reliably() {
            tracing::debug!("canplay not observed, element is ready; starting playback");
            self.complete_load(tick);
            return;
        }

        let fallback = self.tuning.load_fallback;
        let Some(pending) = self.pending_load.as_mut() else {
            return;
        };

        if !pending.reloaded {
            tracing::warn!("{} not ready, reloading once", pending.url);
            pending.reloaded = true;
            pending.deadline = Some(tick.at + fallback);
            let url = pending.url.clone();
            self.element.load(&url);
        } else {
            tracing::warn!("{} still not ready after retry", pending.url);
            pending.deadline = None;
            let url = pending.url.clone();
            self.signals.push(ReconcilerSignal::TrackNotReady { url });
        }
    }

    /// Queue collaborator update. A queue with nothing active stops playback.
    pub fn on_queue_changed(&mut self, resolution: &Resolution) {
        if resolution.active.is_none() {
            self.go_idle();
        }
    }

    /// Replay a playback intent blocked by autoplay policy.
    /// Only call this from a user-gesture handler.
    pub fn resume(&mut self) -> Result<(), PlaybackError> {
        self.autoplay.resume(&mut self.element)?;
        if self.phase == Phase::AutoplayBlocked {
            self.set_phase(Phase::Synced);
        }
        self.sync_state();
        Ok(())
    }

    pub fn begin_drag(&mut self, dimension: Dimension) -> Result<(), InteractionError> {
        self.interaction.begin_drag(dimension)
    }

    pub fn update_preview(&mut self, dimension: Dimension, value: f64) -> Result<(), InteractionError> {
        self.interaction.update_preview(dimension, value)
    }

    /// Release a drag. A committed volume is applied locally; a committed
    /// seek is returned for the caller to send to the room. Releasing the
    /// progress lock applies the snapshot held back during the drag.
    pub fn end_drag(
        &mut self,
        dimension: Dimension,
        commit: bool,
        tick: Tick,
    ) -> Result<Option<DragCommit>, InteractionError> {
        let committed = self.interaction.end_drag(dimension, commit)?;

        if let Some(DragCommit::Volume(volume)) = committed {
            self.unmuted_volume = None;
            self.write_volume(volume);
        }

        if dimension == Dimension::Progress {
            if let Some(snapshot) = self.deferred.take() {
                self.apply(snapshot, tick);
            }
        }

        Ok(committed)
    }

    /// Set local volume. Ignored while the volume slider is being dragged.
    pub fn set_volume(&mut self, volume: f64) -> bool {
        if self.interaction.is_locked(Dimension::Volume) {
            tracing::debug!("Volume drag in progress, ignoring volume write");
            return false;
        }
        self.unmuted_volume = None;
        self.write_volume(volume);
        true
    }

    /// Toggle mute, returning whether the element is now muted
    pub fn toggle_mute(&mut self) -> bool {
        if self.interaction.is_locked(Dimension::Volume) {
            return self.unmuted_volume.is_some();
        }

        match self.unmuted_volume.take() {
            Some(previous) => {
                self.write_volume(previous);
                false
            }
            None => {
                let previous = self.element.volume();
                self.write_volume(0.0);
                self.unmuted_volume = Some(previous);
                true
            }
        }
    }

    /// Stop playback and release the source
    pub fn shutdown(&mut self) {
        self.go_idle();
    }

    fn start_load(&mut self, track: Arc<Track>, target: AdjustedSnapshot, tick: Tick) {
        let url = track.media_url.clone();
        tracing::info!("Loading \"{}\" from {}", track.title, url);

        self.element.load(&url);
        self.set_current_track(Some(track));
        self.state.element_ready = false;
        self.deferred = None;
        self.fresh_source = false;
        self.autoplay.clear();
        self.pending_load = Some(PendingLoad {
            url,
            target,
            deadline: Some(tick.at + self.tuning.load_fallback),
            reloaded: false,
        });
        self.set_phase(Phase::Loading);
        self.sync_state();
    }

    fn complete_load(&mut self, tick: Tick) {
        let Some(pending) = self.pending_load.take() else {
            return;
        };
        self.state.element_ready = true;
        self.set_phase(Phase::Synced);

        if let Some(parked) = self.parked.take() {
            tracing::debug!("Applying snapshot parked during load of {}", pending.url);
            self.apply(parked, tick);
            return;
        }

        self.fresh_source = true;
        if self.interaction.is_locked(Dimension::Progress) {
            self.deferred = Some(pending.target.snapshot);
            return;
        }

        let target = self.compensator.adjust(pending.target.snapshot, tick.epoch_ms);
        self.converge(&target, tick);
        self.sync_state();
    }

    fn converge(&mut self, target: &AdjustedSnapshot, tick: Tick) {
        if self.phase == Phase::AutoplayBlocked && target.is_playing() {
            self.autoplay.supersede(PendingResume {
                is_playing: true,
                adjusted_time: target.adjusted_time,
            });
            return;
        }

        if std::mem::take(&mut self.fresh_source) {
            if (self.element.current_time() - target.adjusted_time).abs() > POSITION_EPSILON_SECS {
                self.element.set_current_time(target.adjusted_time);
            }
            self.reconcile_intent(target);
            return;
        }

        let drift = (self.element.current_time() - target.adjusted_time).abs();
        if drift > self.tuning.hard_resync_secs && self.element.ready_state().can_seek_reliably() {
            tracing::info!("Hard resync: drifted {:.2}s from the room", drift);
            self.request_sync(tick.at);
            self.element.set_current_time(target.adjusted_time);
        } else if drift > self.tuning.soft_sync_secs {
            tracing::debug!("Soft sync: drifted {:.2}s", drift);
            self.element.set_current_time(target.adjusted_time);
        }

        self.reconcile_intent(target);
    }

    fn reconcile_intent(&mut self, target: &AdjustedSnapshot) {
        if target.is_playing() {
            if self.element.paused() {
                match self.element.play() {
                    Ok(()) => {
                        self.autoplay.clear();
                        self.set_phase(Phase::Synced);
                    }
                    Err(PlaybackError::AutoplayBlocked) => {
                        self.autoplay.on_rejection(PendingResume {
                            is_playing: true,
                            adjusted_time: target.adjusted_time,
                        });
                        self.set_phase(Phase::AutoplayBlocked);
                    }
                    Err(e) => tracing::warn!("Play failed: {}", e),
                }
            } else {
                self.set_phase(Phase::Synced);
            }
        } else {
            self.autoplay.clear();
            if !self.element.paused() {
                self.element.pause();
            }
            self.set_phase(Phase::Synced);
        }
    }

    fn go_idle(&mut self) {
        if !self.element.paused() {
            self.element.pause();
        }
        if self.element.source().is_some() {
            self.element.clear_source();
        }

        self.pending_load = None;
        self.parked = None;
        self.deferred = None;
        self.fresh_source = false;
        self.autoplay.clear();
        self.state.element_ready = false;
        self.set_current_track(None);
        self.set_phase(Phase::Idle);
        self.sync_state();
    }

    fn request_sync(&mut self, at: Instant) {
        if let Some(last) = self.last_sync_request {
            if at.saturating_duration_since(last) < self.tuning.resync_cooldown {
                tracing::debug!("Sync request suppressed (cooldown)");
                return;
            }
        }
        self.last_sync_request = Some(at);
        self.signals.push(ReconcilerSignal::RequestSync);
    }

    fn write_volume(&mut self, volume: f64) {
        let volume = if volume.is_finite() { volume.clamp(0.0, 1.0) } else { 0.0 };
        if (self.element.volume() - volume).abs() > f64::EPSILON {
            self.element.set_volume(volume);
        }
        self.volume_tx.send_replace(volume);
    }

    fn set_current_track(&mut self, track: Option<Arc<Track>>) {
        publish_track(&self.track_tx, track.clone());
        self.state.current_track = track;
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            tracing::info!("Playback {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
    }

    /// Refresh the live view from the element and publish it
    fn sync_state(&mut self) {
        self.state.local_time = self.element.current_time();
        self.state.is_playing = !self.element.paused();

        let progress = PlaybackProgress {
            is_playing: self.state.is_playing,
            current_time: self.state.local_time,
        };
        self.progress_tx.send_if_modified(|current| {
            let changed = *current != progress;
            *current = progress;
            changed
        });
    }

    #[cfg(test)]
    pub(crate) fn element_mut(&mut self) -> &mut E {
        &mut self.element
    }
}
