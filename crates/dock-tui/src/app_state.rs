//! AppState: shared read-only data passed to all components during render/event.
//!
//! Only the App event loop writes to it.

use std::collections::VecDeque;

use dock_proto::protocol::{
    Episode, EpisodeId, Job, MediaDetails, MediaItem, QueueStatus, ServiceStatus, Settings, Transfer,
    TransferStats,
};

use crate::action::Workspace;
use crate::player::PlayerSnapshot;

const LOG_CAPACITY: usize = 200;

#[derive(Debug, Default)]
pub struct AppState {
    pub workspace: Workspace,

    pub library: Vec<MediaItem>,
    pub library_loading: bool,

    pub transfers: Vec<Transfer>,
    pub jobs: Vec<Job>,
    pub stats: TransferStats,
    pub queue: Option<QueueStatus>,

    /// Last settings read from or accepted by the server.
    pub settings: Option<Settings>,
    pub status: Option<ServiceStatus>,
    pub online: bool,
    pub base_url: String,

    pub player: PlayerSnapshot,
    /// Details of the media open in the player overlay.
    pub details: Option<MediaDetails>,

    pub logs: VecDeque<String>,
    pub terminal_focused: bool,
}

impl AppState {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            online: true,
            terminal_focused: true,
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn push_log(&mut self, line: String) {
        if self.logs.len() == LOG_CAPACITY {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    pub fn last_log(&self) -> Option<&str> {
        self.logs.back().map(String::as_str)
    }

    pub fn player_open(&self) -> bool {
        self.details.is_some()
    }

    pub fn episodes(&self) -> &[Episode] {
        self.details.as_ref().map_or(&[], |d| d.episodes.as_slice())
    }

    pub fn current_episode_id(&self) -> Option<EpisodeId> {
        self.player.session.as_ref().and_then(|s| s.episode_id)
    }

    pub fn current_episode(&self) -> Option<&Episode> {
        let id = self.current_episode_id()?;
        self.episodes().iter().find(|e| e.id == id)
    }

    /// Neighbour of the playing episode in list order; `step` is +1 or -1.
    pub fn adjacent_episode(&self, step: isize) -> Option<&Episode> {
        let episodes = self.episodes();
        let current = self.current_episode_id()?;
        let idx = episodes.iter().position(|e| e.id == current)?;
        let target = idx.checked_add_signed(step)?;
        episodes.get(target)
    }

    /// Replaces the row with the same hash in place, or appends it.
    pub fn upsert_transfer(&mut self, transfer: Transfer) {
        match self.transfers.iter_mut().find(|t| t.hash == transfer.hash) {
            Some(slot) => *slot = transfer,
            None => self.transfers.push(transfer),
        }
    }

    pub fn media_title(&self, id: i64) -> Option<&str> {
        self.library
            .iter()
            .find(|m| m.id == id)
            .map(|m| m.title.as_str())
    }
}
