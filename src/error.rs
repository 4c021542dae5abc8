//! Error types for the room sync client

use thiserror::Error;

use crate::player::interaction::Dimension;

/// Main error type for the client
#[derive(Error, Debug)]
pub enum Error {
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Interaction error: {0}")]
    Interaction(#[from] InteractionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Playback and media element errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    #[error("Playback blocked by autoplay policy")]
    AutoplayBlocked,

    #[error("No pending resume to replay")]
    NoPendingResume,

    #[error("Failed to load source: {0}")]
    LoadFailed(String),

    #[error("Track not ready: {0}")]
    TrackNotReady(String),

    #[error("Element has no source")]
    NoSource,
}

/// Wire protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("No room configured")]
    NoRoom,
}

/// Local interaction lock errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InteractionError {
    #[error("Interaction lock held by {0}")]
    Busy(Dimension),

    #[error("Interaction lock not held for {0}")]
    NotHeld(Dimension),
}

/// Result type alias for the client
pub type Result<T> = std::result::Result<T, Error>;
