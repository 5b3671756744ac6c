#[cfg(unix)]
pub mod mpv;

use anyhow::Result;
use async_trait::async_trait;

/// Something that can play a video by id. The backend reports progress and
/// completion through [`PlayerEvent`]s on the channel it was created with.
#[async_trait]
pub trait Player: Send + Sync {
    /// Replace whatever is playing with `video_id` and start playback.
    async fn load(&self, video_id: &str) -> Result<()>;

    async fn set_paused(&self, paused: bool) -> Result<()>;

    /// Absolute seek in seconds.
    async fn seek(&self, seconds: f64) -> Result<()>;

    async fn stop(&self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Playback position in seconds.
    Position(f64),
    /// Duration of the loaded video in seconds.
    Duration(f64),
    /// The loaded video played to the end.
    Ended,
    Error(String),
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}
