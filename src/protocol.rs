//! Wire protocol between the client and the room server
//!
//! Every message is a JSON object `{"event": <name>, "data": <payload>}`.
//! Field names follow the server's camelCase convention.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ProtocolError;
use crate::queue::{DownloadStatus, MediaUrlResolver, Track};

/// Queue entry as sent by the server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration: f64,
    pub cover_url: String,
    /// Older servers call this `url`
    #[serde(alias = "url")]
    pub mp3_url: String,
    pub added_by: String,
    pub added_at: Option<DateTime<Utc>>,
    pub download_status: Option<DownloadStatus>,
    pub download_progress: Option<u8>,
}

impl QueueItem {
    pub fn to_track(&self, urls: &MediaUrlResolver) -> Track {
        Track {
            id: self.id.clone(),
            title: self.title.clone(),
            artist: self.artist.clone(),
            duration_secs: self.duration.max(0.0),
            media_url: urls.resolve(&self.mp3_url).unwrap_or_default(),
            cover_url: self.cover_url.clone(),
            added_by: self.added_by.clone(),
            added_at: self.added_at,
            download_status: self.download_status.unwrap_or_default(),
            download_progress: self.download_progress.unwrap_or(100).min(100),
        }
    }
}

/// Standalone track metadata carried by legacy snapshots
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MusicMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: f64,
    pub cover_url: String,
    pub mp3_url: String,
}

/// Playback state as broadcast by the server, before normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSnapshot {
    pub is_playing: bool,
    pub current_time: f64,
    pub last_updated: Option<i64>,
    pub server_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MusicMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue: Option<Vec<QueueItem>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_track_index: Option<i64>,
}

/// Full queue replacement
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueUpdate {
    pub queue: Vec<QueueItem>,
    pub current_track_index: i64,
}

/// Events pushed by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum InboundEvent {
    #[serde(rename = "music-state")]
    MusicState(RawSnapshot),

    #[serde(rename = "queueUpdated")]
    QueueUpdated(QueueUpdate),

    #[serde(rename = "queueItemProgress", rename_all = "camelCase")]
    QueueItemProgress {
        queue_item_id: String,
        progress: u8,
        status: String,
    },

    #[serde(rename = "queueItemComplete", rename_all = "camelCase")]
    QueueItemComplete {
        queue_item_id: String,
        mp3_url: String,
        status: String,
    },

    #[serde(rename = "queueItemError", rename_all = "camelCase")]
    QueueItemError {
        queue_item_id: String,
        error: String,
        status: String,
    },

    #[serde(rename = "error")]
    Error { message: String },
}

/// Transport connectivity changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ConnectivityEvent {
    Connect,
    Disconnect { reason: String },
}

/// Anything the transport can deliver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransportEvent {
    Inbound(InboundEvent),
    Connectivity(ConnectivityEvent),
}

impl TransportEvent {
    /// Parse one JSON line from the transport
    pub fn parse(line: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(line)?)
    }
}

/// Playback actions any participant may request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum ControlAction {
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
}

/// A control action addressed to a room on behalf of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlMessage {
    pub room_code: String,
    pub user_id: String,
    #[serde(flatten)]
    pub action: ControlAction,
}

/// Participant identity sent when joining
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomUser {
    pub id: String,
    pub name: String,
    pub is_host: bool,
}

/// Messages sent to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum OutboundMessage {
    #[serde(rename = "music-control")]
    MusicControl(ControlMessage),

    #[serde(rename = "sync-request", rename_all = "camelCase")]
    SyncRequest { room_code: String },

    #[serde(rename = "join-room", rename_all = "camelCase")]
    JoinRoom { room_code: String, user: RoomUser },

    #[serde(rename = "leave-room", rename_all = "camelCase")]
    LeaveRoom { room_code: String },
}

impl OutboundMessage {
    pub fn control(room_code: &str, user_id: &str, action: ControlAction) -> Self {
        OutboundMessage::MusicControl(ControlMessage {
            room_code: room_code.to_string(),
            user_id: user_id.to_string(),
            action,
        })
    }

    pub fn sync_request(room_code: &str) -> Self {
        OutboundMessage::SyncRequest {
            room_code: room_code.to_string(),
        }
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Item ids arrive as either strings or numbers
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Float(f) => f.to_string(),
    })
}
