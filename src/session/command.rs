//! User commands accepted by the session

use serde::{Deserialize, Serialize};

use crate::player::Dimension;

/// Transport-bar and slider actions coming from the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "data", rename_all = "camelCase")]
pub enum UiCommand {
    /// Play or pause depending on the observed state
    TogglePlay,
    Play,
    Pause,
    Seek {
        time: f64,
    },
    Next,
    Previous,
    #[serde(rename_all = "camelCase")]
    PlayTrack {
        track_index: usize,
    },
    BeginDrag {
        dimension: Dimension,
    },
    Preview {
        dimension: Dimension,
        value: f64,
    },
    EndDrag {
        dimension: Dimension,
        commit: bool,
    },
    SetVolume {
        volume: f64,
    },
    ToggleMute,
    /// "Tap to resume" after an autoplay block
    Resume,
    /// Ask the room to re-broadcast its state
    Sync,
    Leave,
}
