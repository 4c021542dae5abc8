//! Queue module

pub mod manager;
pub mod resolver;
pub mod track;

pub use manager::QueueManager;
pub use resolver::{resolve, QueueState, Resolution, NO_INDEX};
pub use track::{DownloadStatus, MediaUrlResolver, Track};
