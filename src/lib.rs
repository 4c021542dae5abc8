//! # Room Sync Client
//!
//! Client-side playback reconciliation for shared listening rooms.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                               ROOM SERVER                                │
//! │        music-state · queueUpdated · queueItem* · connect/disconnect      │
//! └───────────────────────────────────┬──────────────────────────────────────┘
//!                                     │ inbound events
//!                                     ▼
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                        Room Session (session::room)                      │
//! │                                                                          │
//! │   ┌───────────────┐    ┌──────────────────┐    ┌───────────────────┐     │
//! │   │ Queue Manager │◄──►│    Normalizer    │───►│ Drift Compensator │     │
//! │   │ queue::manager│    │ sync::normalizer │    │    sync::drift    │     │
//! │   └───────────────┘    └──────────────────┘    └─────────┬─────────┘     │
//! │                                                          │ adjusted      │
//! │                                                          ▼               │
//! │   ┌──────────────────────────────────────────────────────────────────┐   │
//! │   │                Playback Reconciler (player::reconciler)          │   │
//! │   │    Idle ─► Loading ─► Synced ◄─► AutoplayBlocked                 │   │
//! │   │    ┌──────────────────┐   ┌──────────────────────┐               │   │
//! │   │    │ Interaction Guard│   │  Autoplay Recovery   │               │   │
//! │   │    └──────────────────┘   └──────────────────────┘               │   │
//! │   └───────────────┬─────────────────────────────▲────────────────────┘   │
//! │                   │ load/seek/play/pause        │ canplay/timeupdate/... │
//! │                   ▼                             │                        │
//! │   ┌──────────────────────────────────────────────────────────────────┐   │
//! │   │                      Media Element (player::element)             │   │
//! │   └──────────────────────────────────────────────────────────────────┘   │
//! │                                                                          │
//! │   UI commands ──► intents (music-control, sync-request) ──► outbound     │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod player;
pub mod protocol;
pub mod queue;
pub mod session;
pub mod sync;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    /// Room server used when none is configured
    pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

    /// How long to wait for `canplay` before the load fallback fires
    pub const DEFAULT_LOAD_FALLBACK_MS: u64 = 500;

    /// Minimum spacing between hard-resync sync requests
    pub const DEFAULT_RESYNC_COOLDOWN_MS: u64 = 2_000;

    /// Delay of the second sync request sent after connecting
    pub const BACKUP_SYNC_DELAY_MS: u64 = 1_000;

    /// Upper bound on published `timeupdate` events per second
    pub const MAX_TIME_UPDATES_PER_SEC: u32 = 10;

    /// Initial element volume
    pub const DEFAULT_VOLUME: f64 = 0.5;
}
