//! Headless media element
//!
//! Plays nothing; it keeps a wall clock per source and reports the same
//! lifecycle events a browser element would. Loading completes after a fixed
//! latency, and a ticker reports `timeupdate` while playing. Playback can be
//! gated behind a user gesture to reproduce autoplay policies.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::element::{ElementEvent, MediaElement, ReadyState};
use crate::error::PlaybackError;
use crate::session::Subscription;

/// How often `timeupdate` fires while playing
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Simulated element settings
#[derive(Debug, Clone)]
pub struct SimulatedConfig {
    /// Time from `load` until `canplay`
    pub load_latency: Duration,
    /// Reported duration of every source
    pub duration_secs: Option<f64>,
    /// Reject `play()` until [`SimulatedControl::grant_gesture`] is called
    pub require_gesture: bool,
    pub volume: f64,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            load_latency: Duration::from_millis(150),
            duration_secs: None,
            require_gesture: false,
            volume: crate::constants::DEFAULT_VOLUME,
        }
    }
}

/// State shared with the loader and ticker tasks
#[derive(Debug)]
struct SimState {
    ready: ReadyState,
    /// Bumped on every load so stale loaders are ignored
    generation: u64,
    playing: bool,
    gesture_granted: bool,
}

/// Handle for the embedding application to stand in for the user
#[derive(Debug, Clone)]
pub struct SimulatedControl {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedControl {
    /// Record a user gesture; subsequent `play()` calls are allowed
    pub fn grant_gesture(&self) {
        self.state.lock().gesture_granted = true;
    }
}

pub struct SimulatedElement {
    config: SimulatedConfig,
    state: Arc<Mutex<SimState>>,
    events: mpsc::UnboundedSender<ElementEvent>,
    src: Option<String>,
    /// Position at `anchor`
    position: f64,
    /// Set while playing
    anchor: Option<Instant>,
    volume: f64,
    _ticker: Subscription,
}

impl SimulatedElement {
    /// Create an element and its event stream. Must be called inside a
    /// tokio runtime.
    pub fn new(config: SimulatedConfig) -> (Self, mpsc::UnboundedReceiver<ElementEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(SimState {
            ready: ReadyState::HaveNothing,
            generation: 0,
            playing: false,
            gesture_granted: !config.require_gesture,
        }));

        let ticker = tokio::spawn(run_ticker(Arc::clone(&state), events.clone()));

        let element = Self {
            volume: config.volume.clamp(0.0, 1.0),
            config,
            state,
            events,
            src: None,
            position: 0.0,
            anchor: None,
            _ticker: Subscription::new("element ticker", ticker),
        };
        (element, rx)
    }

    pub fn control(&self) -> SimulatedControl {
        SimulatedControl {
            state: Arc::clone(&self.state),
        }
    }

    fn emit(&self, event: ElementEvent) {
        // Receiver gone means the session is shutting down
        let _ = self.events.send(event);
    }

    /// Freeze the clock at its current value
    fn settle(&mut self) {
        self.position = self.current_time();
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
    }
}

impl MediaElement for SimulatedElement {
    fn source(&self) -> Option<&str> {
        self.src.as_deref()
    }

    fn load(&mut self, url: &str) {
        self.src = Some(url.to_string());
        self.position = 0.0;
        self.anchor = None;

        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.ready = ReadyState::HaveNothing;
            state.playing = false;
            state.generation
        };

        let state = Arc::clone(&self.state);
        let events = self.events.clone();
        let latency = self.config.load_latency;
        tokio::spawn(async move {
            tokio::time::sleep(latency / 2).await;
            {
                let mut state = state.lock();
                if state.generation != generation {
                    return;
                }
                state.ready = ReadyState::HaveMetadata;
            }
            let _ = events.send(ElementEvent::LoadedMetadata);

            tokio::time::sleep(latency - latency / 2).await;
            {
                let mut state = state.lock();
                if state.generation != generation {
                    return;
                }
                state.ready = ReadyState::HaveEnoughData;
            }
            let _ = events.send(ElementEvent::CanPlay);
        });
    }

    fn clear_source(&mut self) {
        self.src = None;
        self.position = 0.0;
        self.anchor = None;
        let mut state = self.state.lock();
        state.generation += 1;
        state.ready = ReadyState::HaveNothing;
        state.playing = false;
    }

    fn current_time(&self) -> f64 {
        let elapsed = self.anchor.map(|at| at.elapsed().as_secs_f64()).unwrap_or(0.0);
        let time = self.position + elapsed;
        match self.duration() {
            Some(duration) => time.min(duration),
            None => time,
        }
    }

    fn set_current_time(&mut self, seconds: f64) {
        self.position = seconds.max(0.0);
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
        self.emit(ElementEvent::Seeked);
    }

    fn duration(&self) -> Option<f64> {
        self.src.as_ref().and(self.config.duration_secs)
    }

    fn paused(&self) -> bool {
        self.anchor.is_none()
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if self.src.is_none() {
            return Err(PlaybackError::NoSource);
        }
        {
            let mut state = self.state.lock();
            if !state.gesture_granted {
                return Err(PlaybackError::AutoplayBlocked);
            }
            state.playing = true;
        }
        if self.anchor.is_none() {
            self.anchor = Some(Instant::now());
            self.emit(ElementEvent::Play);
        }
        Ok(())
    }

    fn pause(&mut self) {
        if self.anchor.is_none() {
            return;
        }
        self.settle();
        self.anchor = None;
        self.state.lock().playing = false;
        self.emit(ElementEvent::Pause);
    }

    fn ready_state(&self) -> ReadyState {
        self.state.lock().ready
    }

    fn volume(&self) -> f64 {
        self.volume
    }

    fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }
}

async fn run_ticker(state: Arc<Mutex<SimState>>, events: mpsc::UnboundedSender<ElementEvent>) {
    let mut interval = tokio::time::interval(TICK_INTERVAL);
    loop {
        interval.tick().await;
        let playing = state.lock().playing;
        if playing && events.send(ElementEvent::TimeUpdate).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_load_reports_canplay() {
        let (mut element, mut events) = SimulatedElement::new(SimulatedConfig::default());
        element.load("http://host/a.mp3");
        assert_eq!(element.ready_state(), ReadyState::HaveNothing);

        assert_eq!(events.recv().await, Some(ElementEvent::LoadedMetadata));
        assert_eq!(events.recv().await, Some(ElementEvent::CanPlay));
        assert!(element.ready_state().can_seek_reliably());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_drops_stale_loader() {
        let (mut element, mut events) = SimulatedElement::new(SimulatedConfig::default());
        element.load("http://host/a.mp3");
        element.load("http://host/b.mp3");

        assert_eq!(events.recv().await, Some(ElementEvent::LoadedMetadata));
        assert_eq!(events.recv().await, Some(ElementEvent::CanPlay));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(events.try_recv().is_err());
        assert_eq!(element.source(), Some("http://host/b.mp3"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_advances_while_playing() {
        let (mut element, _events) = SimulatedElement::new(SimulatedConfig::default());
        element.load("http://host/a.mp3");
        element.set_current_time(10.0);
        element.play().unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!((element.current_time() - 12.0).abs() < 1e-6);

        element.pause();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!((element.current_time() - 12.0).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gesture_gate() {
        let config = SimulatedConfig {
            require_gesture: true,
            ..Default::default()
        };
        let (mut element, _events) = SimulatedElement::new(config);
        assert_eq!(element.play(), Err(PlaybackError::NoSource));

        element.load("http://host/a.mp3");
        assert_eq!(element.play(), Err(PlaybackError::AutoplayBlocked));
        assert!(element.paused());

        element.control().grant_gesture();
        assert_eq!(element.play(), Ok(()));
        assert!(!element.paused());
    }
}
