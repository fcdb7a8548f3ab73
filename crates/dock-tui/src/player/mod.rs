//! Playback session: resume decision, progress persistence and the mpv
//! driver behind it.

pub mod controller;
pub mod mpv;
pub mod resume;
pub mod service;

use std::future::Future;

use dock_proto::protocol::{EpisodeId, MediaId, ProgressUpdate};
use dock_proto::transport::Transport;
use dock_proto::{ApiClient, ApiError};

pub use controller::PlayerController;
pub use resume::{ResumeChoice, ResumeMachine, ResumePolicy, ResumeState};
pub use service::{PlayerCommand, PlayerService, PlayerSnapshot};

/// A media player the controller can drive.
pub trait Playback: Send {
    /// Replaces the current source. `paused` holds the first frame.
    fn load(&mut self, url: &str, paused: bool) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn seek(&mut self, secs: f64) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn set_paused(&mut self, paused: bool) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn is_paused(&mut self) -> impl Future<Output = anyhow::Result<bool>> + Send;
    /// Current playback time, `None` while nothing is loaded.
    fn position(&mut self) -> impl Future<Output = anyhow::Result<Option<f64>>> + Send;
    fn duration(&mut self) -> impl Future<Output = anyhow::Result<Option<f64>>> + Send;
    fn eof_reached(&mut self) -> impl Future<Output = anyhow::Result<bool>> + Send;
    fn is_alive(&mut self) -> bool;
    fn stop(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Where playback positions are read from and written to.
pub trait ProgressStore: Send + Sync {
    fn load_position(
        &self,
        media_id: MediaId,
        episode_id: Option<EpisodeId>,
    ) -> impl Future<Output = Result<u64, ApiError>> + Send;

    fn save_position(
        &self,
        media_id: MediaId,
        update: ProgressUpdate,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

impl<T: Transport> ProgressStore for ApiClient<T> {
    async fn load_position(&self, media_id: MediaId, episode_id: Option<EpisodeId>) -> Result<u64, ApiError> {
        Ok(self.progress(media_id, episode_id).await?.position)
    }

    async fn save_position(&self, media_id: MediaId, update: ProgressUpdate) -> Result<(), ApiError> {
        self.save_progress(media_id, &update).await.map(|_| ())
    }
}

/// What is open in the player. Lives exactly as long as the overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaSession {
    pub media_id: MediaId,
    pub episode_id: Option<EpisodeId>,
    pub title: String,
    pub stream_url: String,
}
