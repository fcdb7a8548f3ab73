//! Everything a component can ask the app to do.

use dock_proto::protocol::{EpisodeId, JobId, MediaId, Settings};
use dock_proto::Severity;

use crate::player::ResumeChoice;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    LibraryGrid,
    DownloadsPanel,
    SettingsPanel,
    PlayerOverlay,
    HelpOverlay,
}

/// Top-level tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Workspace {
    #[default]
    Library,
    Downloads,
    Settings,
}

impl Workspace {
    pub const ALL: [Workspace; 3] = [Workspace::Library, Workspace::Downloads, Workspace::Settings];

    pub fn next(self) -> Self {
        match self {
            Workspace::Library => Workspace::Downloads,
            Workspace::Downloads => Workspace::Settings,
            Workspace::Settings => Workspace::Library,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Workspace::Library => "Library",
            Workspace::Downloads => "Downloads",
            Workspace::Settings => "Settings",
        }
    }

    pub fn hotkey(self) -> char {
        match self {
            Workspace::Library => '1',
            Workspace::Downloads => '2',
            Workspace::Settings => '3',
        }
    }

    pub fn component(self) -> ComponentId {
        match self {
            Workspace::Library => ComponentId::LibraryGrid,
            Workspace::Downloads => ComponentId::DownloadsPanel,
            Workspace::Settings => ComponentId::SettingsPanel,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Navigation ───────────────────────────────────────────────────────────
    SwitchWorkspace(Workspace),
    NextWorkspace,
    ToggleHelp,
    DismissToast,
    Quit,

    // ── Library ──────────────────────────────────────────────────────────────
    ReloadLibrary,
    ScanLibrary,
    OpenMedia(MediaId),
    DeleteMedia { id: MediaId, title: String },

    // ── Downloads ────────────────────────────────────────────────────────────
    AddMagnet(String),
    /// Source path on the server.
    QueueTranscode(String),
    PauseTransfer(String),
    ResumeTransfer(String),
    RemoveTransfer { hash: String, delete_files: bool },
    CancelJob(JobId),
    RestartJob(JobId),
    RetryJob(JobId),
    ClearFinishedJobs,

    // ── Player ───────────────────────────────────────────────────────────────
    ResumeChoice(ResumeChoice),
    PlayEpisode(EpisodeId),
    TogglePause,
    SeekRelative(f64),
    NextEpisode,
    PrevEpisode,
    ClearProgress,
    CopyStreamUrl,
    ClosePlayer,

    // ── Settings ─────────────────────────────────────────────────────────────
    SaveSettings(Settings),

    // ── Feedback ─────────────────────────────────────────────────────────────
    Toast(String, Severity),
    CopyToClipboard(String),
    Noop,
}
