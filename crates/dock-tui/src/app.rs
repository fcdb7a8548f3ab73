//! App: the component event loop.
//!
//! - `App` owns the components and `AppState`.
//! - Terminal input, API results, poll events, notifications, player
//!   snapshots and forwarded log lines all arrive on channels polled by one
//!   `tokio::select!`.
//! - Components return `Vec<Action>`; `apply_action` carries them out. Anything
//!   that talks to the server runs in a spawned task and reports back with an
//!   `AppMessage`, so a frame never waits on the network.

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use dock_proto::config::Config;
use dock_proto::protocol::{
    CreateJobRequest, Episode, EpisodeId, MediaDetails, MediaId, MediaItem, MediaType, QueueStatus, ScanReport,
    ServiceStatus, Settings, Transfer,
};
use dock_proto::{ApiClient, ApiError, Notifier, Severity};
use ratatui::crossterm::{
    event::{self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Style,
    widgets::Block,
    Frame, Terminal,
};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::{
    action::{Action, Workspace},
    app_state::AppState,
    component::Component,
    components::{
        downloads_panel::DownloadsPanel, help_overlay::HelpOverlay, library_grid::LibraryGrid,
        player_overlay::PlayerOverlay, settings_panel::SettingsPanel,
    },
    notifier::{report_failure, Notification},
    player::{MediaSession, PlayerCommand, PlayerSnapshot},
    poller::{PollEvent, Poller},
    theme::C_BG,
    widgets::{
        status_bar::{self, InputMode},
        toast::ToastManager,
    },
};

const STATUS_REFRESH: Duration = Duration::from_secs(30);
const UI_TICK: Duration = Duration::from_millis(100);
const MAX_DRAIN: usize = 256;

// ── Internal event bus ────────────────────────────────────────────────────────

enum AppMessage {
    Event(Event),
    /// `None` when the load failed; the failure was already reported.
    LibraryLoaded(Option<Vec<MediaItem>>),
    ScanFinished(Option<ScanReport>),
    DetailsLoaded(MediaDetails),
    EpisodesLoaded { media_id: MediaId, episodes: Vec<Episode> },
    /// A pause/resume landed; `transfer` is the server's fresh view of it.
    TransferUpdated { message: String, transfer: Transfer },
    SettingsLoaded(Settings),
    SettingsSaved(Settings),
    StatusLoaded(ServiceStatus),
    QueueLoaded(QueueStatus),
    /// A mutation succeeded: show `message` and refetch what it touched.
    Done { message: String, refresh: Refresh },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Refresh {
    Nothing,
    Library,
    Downloads,
}

/// Receivers and senders the loop shares with the background services.
pub struct AppChannels {
    pub notifications: mpsc::Receiver<Notification>,
    pub poll_events: mpsc::Receiver<PollEvent>,
    pub player_rx: watch::Receiver<PlayerSnapshot>,
    pub logs: broadcast::Receiver<String>,
}

pub struct App {
    state: AppState,
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    poller: Poller<ApiClient>,
    polling_enabled: bool,
    player_tx: mpsc::Sender<PlayerCommand>,
    tx: mpsc::Sender<AppMessage>,
    rx: Option<mpsc::Receiver<AppMessage>>,

    toast: ToastManager,
    library: LibraryGrid,
    downloads: DownloadsPanel,
    settings: SettingsPanel,
    player: PlayerOverlay,
    help: HelpOverlay,

    should_quit: bool,
}

impl App {
    pub fn new(
        config: &Config,
        client: ApiClient,
        notifier: Arc<dyn Notifier>,
        poller: Poller<ApiClient>,
        player_tx: mpsc::Sender<PlayerCommand>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(1024);
        Self {
            state: AppState::new(client.base_url()),
            client,
            notifier,
            poller,
            polling_enabled: config.polling.enabled,
            player_tx,
            tx,
            rx: Some(rx),
            toast: ToastManager::new(
                config.notifications.max_visible,
                Duration::from_millis(config.notifications.default_duration_ms),
            ),
            library: LibraryGrid::new(),
            downloads: DownloadsPanel::new(),
            settings: SettingsPanel::new(),
            player: PlayerOverlay::new(),
            help: HelpOverlay::new(),
            should_quit: false,
        }
    }

    pub async fn run(mut self, channels: AppChannels) -> anyhow::Result<()> {
        let Some(mut rx) = self.rx.take() else {
            anyhow::bail!("app loop already ran");
        };
        let AppChannels {
            mut notifications,
            mut poll_events,
            mut player_rx,
            mut logs,
        } = channels;
        let mut logs_open = true;

        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableFocusChange)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal ready, size={:?}", terminal.size());

        // ── Background task: keyboard/focus/resize events ─────────────────────
        let event_tx = self.tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        self.startup();

        // ── Periodic timers ───────────────────────────────────────────────────
        let mut ui_tick = tokio::time::interval(UI_TICK);
        ui_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut status_refresh = tokio::time::interval(STATUS_REFRESH);
        status_refresh.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // startup() already fetched status
        status_refresh.reset();

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(msg) = rx.recv() => {
                    self.handle_message(msg).await;
                    let mut drained = 0usize;
                    while drained < MAX_DRAIN {
                        let Ok(next) = rx.try_recv() else { break };
                        drained += 1;
                        self.handle_message(next).await;
                    }
                    needs_redraw = true;
                }

                Some(note) = notifications.recv() => {
                    self.toast.push(note.message, note.severity, note.duration);
                    needs_redraw = true;
                }

                Some(ev) = poll_events.recv() => {
                    self.on_poll_event(ev);
                    needs_redraw = true;
                }

                changed = player_rx.changed() => {
                    if changed.is_ok() {
                        self.state.player = player_rx.borrow_and_update().clone();
                        needs_redraw = true;
                    }
                }

                line = logs.recv(), if logs_open => match line {
                    Ok(line) => {
                        self.state.push_log(line);
                        needs_redraw = true;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        self.state.push_log(format!("({} log lines skipped)", n));
                    }
                    Err(broadcast::error::RecvError::Closed) => logs_open = false,
                },

                _ = ui_tick.tick() => {
                    self.toast.tick();
                    self.state.online = self.client.connectivity().is_online();
                    let actions: Vec<Action> = {
                        let s = &self.state;
                        let mut all = Vec::new();
                        all.extend(self.library.tick(s));
                        all.extend(self.downloads.tick(s));
                        all
                    };
                    for action in actions {
                        self.apply_action(action).await;
                    }
                    needs_redraw = true;
                }

                _ = status_refresh.tick() => {
                    self.load_status();
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        self.poller.deactivate();
        if self.state.player.session.is_some() {
            let _ = self.player_tx.send(PlayerCommand::Close).await;
        }
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableFocusChange)?;
        terminal.show_cursor()?;
        info!("app: exited cleanly");
        Ok(())
    }

    fn startup(&mut self) {
        self.state.push_log(format!("streamdock started, server {}", self.state.base_url));

        let client = self.client.clone();
        let base_url = self.state.base_url.clone();
        self.spawn_call("Server unreachable", async move { client.health().await }, move |h| {
            info!("health: {} {}", h.service, h.status);
            Some(AppMessage::Done {
                message: format!("Connected to {}", base_url),
                refresh: Refresh::Nothing,
            })
        });

        self.load_library();
        self.load_settings();
        self.load_status();
        self.update_poll_visibility();
    }

    // ── Background calls ──────────────────────────────────────────────────────

    /// Runs `call` off the loop. Success maps through `done`; failure is
    /// reported once through the notifier under `context`.
    fn spawn_call<T, F, D>(&self, context: &'static str, call: F, done: D)
    where
        T: Send + 'static,
        F: Future<Output = Result<T, ApiError>> + Send + 'static,
        D: FnOnce(T) -> Option<AppMessage> + Send + 'static,
    {
        let tx = self.tx.clone();
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            match call.await {
                Ok(value) => {
                    if let Some(msg) = done(value) {
                        let _ = tx.send(msg).await;
                    }
                }
                Err(e) => report_failure(notifier.as_ref(), context, &e),
            }
        });
    }

    fn load_library(&mut self) {
        self.state.library_loading = true;
        let client = self.client.clone();
        let tx = self.tx.clone();
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let loaded = match client.list_library().await {
                Ok(items) => Some(items),
                Err(e) => {
                    report_failure(notifier.as_ref(), "Failed to load library", &e);
                    None
                }
            };
            let _ = tx.send(AppMessage::LibraryLoaded(loaded)).await;
        });
    }

    fn load_settings(&self) {
        let client = self.client.clone();
        self.spawn_call("Failed to load settings", async move { client.settings().await }, |s| {
            Some(AppMessage::SettingsLoaded(s))
        });
    }

    /// Service flags plus the transcode queue summary. Both are best effort.
    fn load_status(&self) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let (status, queue) = tokio::join!(client.status(), client.queue_status());
            match status {
                Ok(s) => {
                    let _ = tx.send(AppMessage::StatusLoaded(s)).await;
                }
                Err(e) => warn!("status refresh failed: {}", e),
            }
            match queue {
                Ok(q) => {
                    let _ = tx.send(AppMessage::QueueLoaded(q)).await;
                }
                Err(e) => warn!("queue status refresh failed: {}", e),
            }
        });
    }

    /// Mutation with a success toast and a follow-up refresh.
    fn mutate<T, F>(&self, context: &'static str, call: F, message: String, refresh: Refresh)
    where
        T: Send + 'static,
        F: Future<Output = Result<T, ApiError>> + Send + 'static,
    {
        self.spawn_call(context, call, move |_| Some(AppMessage::Done { message, refresh }));
    }

    // ── Message handling ──────────────────────────────────────────────────────

    async fn handle_message(&mut self, msg: AppMessage) {
        match msg {
            AppMessage::Event(ev) => match ev {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        return;
                    }
                    for action in self.handle_key(key) {
                        self.apply_action(action).await;
                    }
                }
                Event::FocusGained => {
                    self.state.terminal_focused = true;
                    self.update_poll_visibility();
                }
                Event::FocusLost => {
                    self.state.terminal_focused = false;
                    self.update_poll_visibility();
                }
                _ => {}
            },
            AppMessage::LibraryLoaded(items) => {
                self.state.library_loading = false;
                if let Some(items) = items {
                    debug!("library: {} items", items.len());
                    self.state.library = items;
                }
            }
            AppMessage::ScanFinished(report) => match report {
                Some(report) => {
                    self.toast.resolve_spinner(report.summary(), Severity::Success);
                    self.load_library();
                }
                None => self.toast.dismiss_spinner(),
            },
            AppMessage::DetailsLoaded(details) => {
                if details.item.media_type == MediaType::Tv && details.episodes.is_empty() {
                    let id = details.item.id;
                    self.state.details = Some(details);
                    let client = self.client.clone();
                    self.spawn_call("Failed to load episodes", async move { client.episodes(id).await }, move |episodes| {
                        Some(AppMessage::EpisodesLoaded { media_id: id, episodes })
                    });
                } else {
                    self.open_details(details).await;
                }
            }
            AppMessage::EpisodesLoaded { media_id, episodes } => {
                // the overlay may have been closed or switched meanwhile
                if let Some(mut details) = self.state.details.take() {
                    if details.item.id == media_id {
                        details.episodes = episodes;
                        self.open_details(details).await;
                    } else {
                        self.state.details = Some(details);
                    }
                }
            }
            AppMessage::TransferUpdated { message, transfer } => {
                self.toast.success(message);
                self.state.upsert_transfer(transfer);
                self.poller.kick();
            }
            AppMessage::SettingsLoaded(s) => self.state.settings = Some(s),
            AppMessage::SettingsSaved(s) => {
                self.state.settings = Some(s);
                self.toast.success("Settings saved");
            }
            AppMessage::StatusLoaded(s) => self.state.status = Some(s),
            AppMessage::QueueLoaded(q) => self.state.queue = Some(q),
            AppMessage::Done { message, refresh } => {
                self.toast.success(message);
                match refresh {
                    Refresh::Nothing => {}
                    Refresh::Library => self.load_library(),
                    Refresh::Downloads => {
                        self.poller.kick();
                        self.load_status();
                    }
                }
            }
        }
    }

    fn on_poll_event(&mut self, ev: PollEvent) {
        match ev {
            PollEvent::Transfers(list) => self.state.transfers = list,
            PollEvent::Jobs(list) => self.state.jobs = list,
            PollEvent::Stats(stats) => self.state.stats = stats,
        }
    }

    /// Polls only while someone can see the Downloads workspace.
    fn update_poll_visibility(&mut self) {
        let visible = self.polling_enabled
            && self.state.terminal_focused
            && self.state.workspace == Workspace::Downloads;
        self.poller.set_visible(visible);
    }

    fn focused(&mut self) -> &mut dyn Component {
        match self.state.workspace {
            Workspace::Library => &mut self.library,
            Workspace::Downloads => &mut self.downloads,
            Workspace::Settings => &mut self.settings,
        }
    }

    fn input_mode(&mut self) -> InputMode {
        if self.state.player_open() {
            InputMode::Player
        } else if self.focused().captures_input() {
            InputMode::Input
        } else {
            InputMode::Normal
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return vec![Action::Quit];
        }

        if self.help.is_visible() {
            return self.help.handle_key(key, &self.state);
        }

        let mode = self.input_mode();
        if mode == InputMode::Player {
            return match key.code {
                KeyCode::Char('?') => vec![Action::ToggleHelp],
                KeyCode::Char('x') => vec![Action::DismissToast],
                _ => self.player.handle_key(key, &self.state),
            };
        }
        if mode == InputMode::Normal {
            match key.code {
                KeyCode::Char('q') => return vec![Action::Quit],
                KeyCode::Char('?') => return vec![Action::ToggleHelp],
                KeyCode::Char('x') => return vec![Action::DismissToast],
                KeyCode::Tab => return vec![Action::NextWorkspace],
                KeyCode::Char(c) => {
                    if let Some(ws) = Workspace::ALL.into_iter().find(|w| w.hotkey() == c) {
                        return vec![Action::SwitchWorkspace(ws)];
                    }
                }
                _ => {}
            }
        }

        match self.state.workspace {
            Workspace::Library => self.library.handle_key(key, &self.state),
            Workspace::Downloads => self.downloads.handle_key(key, &self.state),
            Workspace::Settings => self.settings.handle_key(key, &self.state),
        }
    }

    // ── Actions ───────────────────────────────────────────────────────────────

    async fn apply_action(&mut self, action: Action) {
        if action != Action::Noop {
            debug!("apply_action: {:?}", action);
        }
        match action {
            // ── Navigation ────────────────────────────────────────────────────
            Action::SwitchWorkspace(ws) => {
                debug!("focus -> {:?}", ws.component());
                self.state.workspace = ws;
                self.update_poll_visibility();
                match ws {
                    Workspace::Downloads => self.load_status(),
                    Workspace::Settings if self.state.settings.is_none() => self.load_settings(),
                    _ => {}
                }
            }
            Action::NextWorkspace => {
                let next = self.state.workspace.next();
                Box::pin(self.apply_action(Action::SwitchWorkspace(next))).await;
            }
            Action::ToggleHelp => self.help.toggle(),
            Action::DismissToast => {
                self.toast.dismiss_latest();
            }
            Action::Quit => self.should_quit = true,

            // ── Library ───────────────────────────────────────────────────────
            Action::ReloadLibrary => self.load_library(),
            Action::ScanLibrary => {
                self.toast.spinner("Scanning library…");
                let client = self.client.clone();
                let tx = self.tx.clone();
                let notifier = Arc::clone(&self.notifier);
                tokio::spawn(async move {
                    let report = match client.scan_library().await {
                        Ok(r) => Some(r),
                        Err(e) => {
                            report_failure(notifier.as_ref(), "Scan failed", &e);
                            None
                        }
                    };
                    let _ = tx.send(AppMessage::ScanFinished(report)).await;
                });
            }
            Action::OpenMedia(id) => {
                info!("opening {} ({})", id, self.state.media_title(id).unwrap_or("unknown"));
                let client = self.client.clone();
                self.spawn_call("Failed to load details", async move { client.load_details(id).await }, |d| {
                    Some(AppMessage::DetailsLoaded(d))
                });
            }
            Action::DeleteMedia { id, title } => {
                let client = self.client.clone();
                self.mutate(
                    "Delete failed",
                    async move { client.delete_media(id).await },
                    format!("Deleted {}", title),
                    Refresh::Library,
                );
            }

            // ── Downloads ─────────────────────────────────────────────────────
            Action::AddMagnet(link) => {
                let client = self.client.clone();
                self.mutate(
                    "Failed to add torrent",
                    async move { client.add_magnet(&link, None).await },
                    "Torrent added".to_string(),
                    Refresh::Downloads,
                );
            }
            Action::PauseTransfer(hash) => self.flip_transfer(hash, true),
            Action::ResumeTransfer(hash) => self.flip_transfer(hash, false),
            Action::RemoveTransfer { hash, delete_files } => {
                let client = self.client.clone();
                let message = if delete_files {
                    "Torrent and data removed"
                } else {
                    "Torrent removed"
                };
                self.mutate(
                    "Remove failed",
                    async move { client.remove_transfer(&hash, delete_files).await },
                    message.to_string(),
                    Refresh::Downloads,
                );
            }
            Action::QueueTranscode(source_path) => {
                let client = self.client.clone();
                let request = CreateJobRequest {
                    source_path,
                    ..CreateJobRequest::default()
                };
                self.spawn_call(
                    "Failed to queue transcode",
                    async move { client.create_job(&request).await },
                    |job| {
                        Some(AppMessage::Done {
                            message: format!("Queued #{} {}", job.id, job.file_name()),
                            refresh: Refresh::Downloads,
                        })
                    },
                );
            }
            Action::CancelJob(id) => {
                let client = self.client.clone();
                self.mutate(
                    "Cancel failed",
                    async move { client.cancel_job(id).await },
                    format!("Job #{} cancelled", id),
                    Refresh::Downloads,
                );
            }
            Action::RestartJob(id) => {
                let client = self.client.clone();
                self.mutate(
                    "Restart failed",
                    async move { client.restart_job(id).await },
                    format!("Job #{} restarted", id),
                    Refresh::Downloads,
                );
            }
            Action::RetryJob(id) => {
                let client = self.client.clone();
                self.mutate(
                    "Retry failed",
                    async move { client.retry_job(id).await },
                    format!("Job #{} queued again", id),
                    Refresh::Downloads,
                );
            }
            Action::ClearFinishedJobs => {
                let client = self.client.clone();
                self.spawn_call(
                    "Clear failed",
                    async move { client.clear_finished_jobs().await },
                    |n| {
                        Some(AppMessage::Done {
                            message: format!("Cleared {} finished job{}", n, if n == 1 { "" } else { "s" }),
                            refresh: Refresh::Downloads,
                        })
                    },
                );
            }

            // ── Player ────────────────────────────────────────────────────────
            Action::ResumeChoice(choice) => self.send_player(PlayerCommand::Choose(choice)).await,
            Action::PlayEpisode(id) => self.play_episode(id).await,
            Action::TogglePause => self.send_player(PlayerCommand::TogglePause).await,
            Action::SeekRelative(delta) => self.send_player(PlayerCommand::Seek(delta)).await,
            Action::NextEpisode | Action::PrevEpisode => {
                let step = if action == Action::NextEpisode { 1 } else { -1 };
                match self.state.adjacent_episode(step).map(|e| e.id) {
                    Some(id) => self.play_episode(id).await,
                    None => {
                        let which = if step > 0 { "next" } else { "previous" };
                        self.toast.info(format!("No {} episode", which));
                    }
                }
            }
            Action::ClearProgress => {
                let Some(session) = self.state.player.session.clone() else {
                    return;
                };
                let client = self.client.clone();
                self.mutate(
                    "Failed to clear progress",
                    async move { client.clear_progress(session.media_id, session.episode_id).await },
                    "Marked as unwatched".to_string(),
                    Refresh::Nothing,
                );
            }
            Action::CopyStreamUrl => {
                if let Some(session) = &self.state.player.session {
                    let url = session.stream_url.clone();
                    Box::pin(self.apply_action(Action::CopyToClipboard(url))).await;
                }
            }
            Action::ClosePlayer => {
                self.send_player(PlayerCommand::Close).await;
                self.state.details = None;
            }

            // ── Settings ──────────────────────────────────────────────────────
            Action::SaveSettings(settings) => {
                let client = self.client.clone();
                let saved = settings.clone();
                self.spawn_call(
                    "Failed to save settings",
                    async move { client.update_settings(&settings).await },
                    move |_| Some(AppMessage::SettingsSaved(saved)),
                );
            }

            // ── Feedback ──────────────────────────────────────────────────────
            Action::Toast(message, severity) => {
                self.toast.push(message, severity, None);
            }
            Action::CopyToClipboard(text) => {
                match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.clone())) {
                    Ok(()) => {
                        let display = if text.chars().count() > 48 {
                            format!("{}…", text.chars().take(48).collect::<String>())
                        } else {
                            text
                        };
                        self.toast.success(format!("Copied {}", display));
                    }
                    Err(e) => {
                        warn!("clipboard error: {}", e);
                        self.toast.danger(format!("Clipboard unavailable: {}", e));
                    }
                }
            }
            Action::Noop => {}
        }
    }

    /// Pauses (or resumes) a transfer, then refetches just that row so the
    /// list reflects it before the next poll.
    fn flip_transfer(&self, hash: String, pause: bool) {
        let client = self.client.clone();
        let (context, message) = if pause {
            ("Pause failed", "Torrent paused")
        } else {
            ("Resume failed", "Torrent resumed")
        };
        self.spawn_call(
            context,
            async move {
                if pause {
                    client.pause_transfer(&hash).await?;
                } else {
                    client.resume_transfer(&hash).await?;
                }
                match client.transfer(&hash).await {
                    Ok(transfer) => Ok::<_, ApiError>(Some(transfer)),
                    Err(e) => {
                        warn!("refetch of {} failed: {}", hash, e);
                        Ok(None)
                    }
                }
            },
            move |transfer| {
                let message = message.to_string();
                Some(match transfer {
                    Some(transfer) => AppMessage::TransferUpdated { message, transfer },
                    None => AppMessage::Done {
                        message,
                        refresh: Refresh::Downloads,
                    },
                })
            },
        );
    }

    async fn send_player(&mut self, cmd: PlayerCommand) {
        if let Err(e) = self.player_tx.send(cmd).await {
            warn!("player service gone: {}", e);
            self.toast.danger("Player is not running");
        }
    }

    /// Shows the overlay for `details` and starts playback: movies directly,
    /// shows from their first episode.
    async fn open_details(&mut self, details: MediaDetails) {
        let item = &details.item;
        let episode_id = match item.media_type {
            MediaType::Movie => None,
            MediaType::Tv => match details.episodes.first() {
                Some(ep) => Some(ep.id),
                None => {
                    self.toast.warning(format!("{} has no episodes yet", item.title));
                    self.state.details = Some(details);
                    return;
                }
            },
        };
        let session = self.session_for(&details, episode_id);
        self.state.details = Some(details);
        self.send_player(PlayerCommand::Open(session)).await;
    }

    async fn play_episode(&mut self, episode_id: EpisodeId) {
        let Some(details) = &self.state.details else {
            return;
        };
        let session = self.session_for(details, Some(episode_id));
        let cmd = if self.state.player.session.is_some() {
            PlayerCommand::SwitchEpisode(session)
        } else {
            PlayerCommand::Open(session)
        };
        self.send_player(cmd).await;
    }

    fn session_for(&self, details: &MediaDetails, episode_id: Option<EpisodeId>) -> MediaSession {
        let item = &details.item;
        let title = match episode_id.and_then(|id| details.episodes.iter().find(|e| e.id == id)) {
            Some(ep) => format!("{} · {}", item.title, ep.code()),
            None => item.title.clone(),
        };
        MediaSession {
            media_id: item.id,
            episode_id,
            title,
            stream_url: self.client.stream_url(item.id, episode_id),
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Block::default().style(Style::default().bg(C_BG)), area);

        let outer = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        status_bar::draw_header(
            frame,
            outer[0],
            self.state.workspace,
            self.state.online,
            self.state.status.as_ref(),
        );

        let overlay_open = self.state.player_open();
        let body_focused = !overlay_open && !self.help.is_visible();
        match self.state.workspace {
            Workspace::Library => self.library.draw(frame, outer[1], body_focused, &self.state),
            Workspace::Downloads => self.downloads.draw(frame, outer[1], body_focused, &self.state),
            Workspace::Settings => self.settings.draw(frame, outer[1], body_focused, &self.state),
        }

        status_bar::draw_separator(frame, outer[2]);
        status_bar::draw_log_bar(frame, outer[3], self.state.last_log());
        let mode = self.input_mode();
        status_bar::draw_keys_bar(frame, outer[4], mode, self.state.workspace);

        if overlay_open {
            self.player.draw(frame, area, true, &self.state);
        }
        self.help.draw(frame, area, false, &self.state);

        // topmost
        self.toast.draw(frame, area);
    }
}
