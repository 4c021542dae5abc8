//! Queue track definition and media URL resolution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server-side preparation state of a queued track
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadStatus {
    Pending,
    Downloading,
    #[default]
    Completed,
    Error,
}

impl DownloadStatus {
    /// Parse the loosely typed status strings sent with item events
    pub fn parse(status: &str) -> Self {
        match status {
            "pending" => DownloadStatus::Pending,
            "downloading" => DownloadStatus::Downloading,
            "error" => DownloadStatus::Error,
            _ => DownloadStatus::Completed,
        }
    }
}

/// A single queue entry.
///
/// Tracks are immutable once resolved and shared as `Arc<Track>`; updates
/// from item events replace the entry rather than mutating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub duration_secs: f64,
    /// Absolute media URL, or empty while the track is not playable yet
    pub media_url: String,
    pub cover_url: String,
    pub added_by: String,
    pub added_at: Option<DateTime<Utc>>,
    pub download_status: DownloadStatus,
    /// Preparation progress, 0-100
    pub download_progress: u8,
}

impl Track {
    /// Whether the element can be pointed at this track
    pub fn is_playable(&self) -> bool {
        !self.media_url.is_empty()
    }

    /// Ready from the UI's point of view
    pub fn is_ready(&self) -> bool {
        self.download_status == DownloadStatus::Completed || self.is_playable()
    }
}

/// Turns server media paths into URLs the element can load
#[derive(Debug, Clone)]
pub struct MediaUrlResolver {
    base_url: String,
}

impl MediaUrlResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URLs pass through, relative paths are joined to the base.
    /// Empty paths resolve to `None`.
    pub fn resolve(&self, path: &str) -> Option<String> {
        let path = path.trim();
        if path.is_empty() {
            return None;
        }
        if path.starts_with("http://") || path.starts_with("https://") {
            return Some(path.to_string());
        }
        if path.starts_with('/') {
            Some(format!("{}{}", self.base_url, path))
        } else {
            Some(format!("{}/{}", self.base_url, path))
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
pub(crate) fn test_track(id: &str, url: &str) -> Track {
    Track {
        id: id.to_string(),
        title: format!("Title {}", id),
        artist: "Artist".to_string(),
        duration_secs: 180.0,
        media_url: url.to_string(),
        cover_url: String::new(),
        added_by: "tester".to_string(),
        added_at: None,
        download_status: DownloadStatus::Completed,
        download_progress: 100,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let resolver = MediaUrlResolver::new("http://localhost:3000/");

        assert_eq!(
            resolver.resolve("/downloads/a.mp3").as_deref(),
            Some("http://localhost:3000/downloads/a.mp3")
        );
        assert_eq!(
            resolver.resolve("downloads/a.mp3").as_deref(),
            Some("http://localhost:3000/downloads/a.mp3")
        );
        assert_eq!(
            resolver.resolve("https://cdn.example.com/a.mp3").as_deref(),
            Some("https://cdn.example.com/a.mp3")
        );
        assert_eq!(resolver.resolve("  "), None);
    }

    #[test]
    fn test_readiness() {
        let mut track = test_track("a", "");
        track.download_status = DownloadStatus::Downloading;
        assert!(!track.is_playable());
        assert!(!track.is_ready());

        track.download_status = DownloadStatus::Completed;
        assert!(track.is_ready());
        assert!(!track.is_playable());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(DownloadStatus::parse("downloading"), DownloadStatus::Downloading);
        assert_eq!(DownloadStatus::parse("error"), DownloadStatus::Error);
        assert_eq!(DownloadStatus::parse("completed"), DownloadStatus::Completed);
    }
}
