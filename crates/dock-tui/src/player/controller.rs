//! Owns one playback session at a time.
//!
//! Ties the resume machine to the player and the progress store: decides the
//! start position, persists progress every `save_interval` and on every
//! teardown, and saves the outgoing episode before a switch loads the next.
//! Saves are best-effort and never surface to the user.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dock_proto::protocol::ProgressUpdate;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::resume::{Opening, ResumeChoice, ResumeMachine, ResumePolicy, ResumeState};
use super::{MediaSession, Playback, ProgressStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Idle,
    Playing,
    /// The player went away underneath the session.
    Ended,
}

pub struct PlayerController<P: Playback, S: ProgressStore> {
    player: P,
    store: Arc<S>,
    machine: ResumeMachine,
    save_interval: Duration,
    session: Option<MediaSession>,
    next_save: Option<Instant>,
    last_pos: f64,
}

impl<P: Playback, S: ProgressStore> PlayerController<P, S> {
    pub fn new(player: P, store: Arc<S>, policy: ResumePolicy, save_interval: Duration) -> Self {
        Self {
            player,
            store,
            machine: ResumeMachine::new(policy),
            save_interval,
            session: None,
            next_save: None,
            last_pos: 0.0,
        }
    }

    pub fn session(&self) -> Option<&MediaSession> {
        self.session.as_ref()
    }

    pub fn resume_state(&self) -> ResumeState {
        self.machine.state()
    }

    pub fn prompt_remaining(&self, now: Instant) -> Option<Duration> {
        self.machine.remaining(now)
    }

    pub fn last_position(&self) -> f64 {
        self.last_pos
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    /// Opens `session`, closing whatever was playing first.
    pub async fn open(&mut self, session: MediaSession, now: Instant) -> Result<Opening> {
        if self.session.is_some() {
            self.close().await;
        }
        self.begin(session, now).await
    }

    /// Moves to another episode of the open show. The outgoing episode's
    /// position is saved before the new source is loaded.
    pub async fn switch_episode(&mut self, next: MediaSession, now: Instant) -> Result<Opening> {
        if self.session.is_some() {
            self.save_now().await;
        }
        self.begin(next, now).await
    }

    async fn begin(&mut self, session: MediaSession, now: Instant) -> Result<Opening> {
        let saved = match self
            .store
            .load_position(session.media_id, session.episode_id)
            .await
        {
            Ok(pos) => pos,
            Err(e) => {
                warn!("player: could not load saved position for {}: {}", session.media_id, e);
                0
            }
        };

        self.machine.reset();
        let opening = self.machine.open(saved, now);
        let paused = matches!(opening, Opening::Prompt { .. });

        info!(
            "player: opening {} (media={} episode={:?}) saved={}s",
            session.title, session.media_id, session.episode_id, saved
        );
        if let Err(e) = self.player.load(&session.stream_url, paused).await {
            self.machine.reset();
            self.session = None;
            self.next_save = None;
            return Err(e);
        }

        self.session = Some(session);
        self.last_pos = 0.0;
        self.next_save = Some(now + self.save_interval);
        Ok(opening)
    }

    /// Answers the resume prompt. No-op when nothing is pending.
    pub async fn choose(&mut self, choice: ResumeChoice) -> Result<()> {
        if let Some(pos) = self.machine.choose(choice) {
            self.start_at(pos).await?;
        }
        Ok(())
    }

    async fn start_at(&mut self, pos: u64) -> Result<()> {
        debug!("player: starting at {}s", pos);
        if pos > 0 {
            self.player.seek(pos as f64).await?;
        }
        self.last_pos = pos as f64;
        self.player.set_paused(false).await
    }

    /// Drives the prompt timeout and the periodic save.
    pub async fn tick(&mut self, now: Instant) -> Result<TickOutcome> {
        if self.session.is_none() {
            return Ok(TickOutcome::Idle);
        }

        if !self.player.is_alive() {
            warn!("player: playback process exited");
            if !self.machine.is_prompting() {
                let pos = self.last_pos;
                self.persist(pos, false).await;
            }
            self.end_session();
            return Ok(TickOutcome::Ended);
        }

        if let Some(pos) = self.machine.poll_timeout(now) {
            info!("player: resume prompt timed out, resuming at {}s", pos);
            self.start_at(pos).await?;
        }

        if !self.machine.is_prompting() {
            match self.player.position().await {
                Ok(Some(pos)) => self.last_pos = pos,
                Ok(None) => {}
                Err(e) => debug!("player: position query failed: {}", e),
            }
        }

        if self.next_save.is_some_and(|at| now >= at) {
            self.save_now().await;
            self.next_save = Some(now + self.save_interval);
        }

        Ok(TickOutcome::Playing)
    }

    /// Saves the current position unless a resume prompt is still open.
    pub async fn save_now(&mut self) {
        if self.session.is_none() || self.machine.is_prompting() {
            return;
        }
        if let Ok(Some(pos)) = self.player.position().await {
            self.last_pos = pos;
        }
        let completed = self.player.eof_reached().await.unwrap_or(false);
        let pos = self.last_pos;
        self.persist(pos, completed).await;
    }

    async fn persist(&mut self, pos: f64, completed: bool) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let duration = match self.player.duration().await {
            Ok(Some(d)) if d.is_finite() && d > 0.0 => Some(d.floor() as u64),
            _ => None,
        };
        let update = ProgressUpdate {
            position: pos.max(0.0).floor() as u64,
            completed,
            episode_id: session.episode_id,
            duration,
        };
        debug!(
            "player: saving media={} episode={:?} at {}s completed={}",
            session.media_id, update.episode_id, update.position, completed
        );
        if let Err(e) = self.store.save_position(session.media_id, update).await {
            warn!("player: progress save failed: {}", e);
        }
    }

    /// Saves, stops playback and ends the session.
    pub async fn close(&mut self) {
        if self.session.is_none() {
            return;
        }
        self.save_now().await;
        if let Err(e) = self.player.stop().await {
            debug!("player: stop failed: {}", e);
        }
        self.end_session();
    }

    fn end_session(&mut self) {
        if let Some(s) = self.session.take() {
            info!("player: closed {}", s.title);
        }
        self.machine.reset();
        self.next_save = None;
        self.last_pos = 0.0;
    }

    pub async fn toggle_pause(&mut self) -> Result<Option<bool>> {
        if self.session.is_none() || self.machine.is_prompting() {
            return Ok(None);
        }
        let paused = !self.player.is_paused().await?;
        self.player.set_paused(paused).await?;
        Ok(Some(paused))
    }

    pub async fn seek_relative(&mut self, delta: f64) -> Result<()> {
        if self.session.is_none() || self.machine.is_prompting() {
            return Ok(());
        }
        let target = (self.last_pos + delta).max(0.0);
        self.player.seek(target).await?;
        self.last_pos = target;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use dock_proto::protocol::{EpisodeId, MediaId};
    use dock_proto::ApiError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub type Log = Arc<Mutex<Vec<String>>>;

    #[derive(Debug)]
    pub struct FakeState {
        pub pos: Option<f64>,
        pub duration: Option<f64>,
        pub eof: bool,
        pub alive: bool,
        pub paused: bool,
        pub fail_load: bool,
    }

    impl Default for FakeState {
        fn default() -> Self {
            Self {
                pos: None,
                duration: Some(1_500.0),
                eof: false,
                alive: true,
                paused: false,
                fail_load: false,
            }
        }
    }

    pub struct FakePlayer {
        pub log: Log,
        pub state: Arc<Mutex<FakeState>>,
    }

    impl Playback for FakePlayer {
        async fn load(&mut self, url: &str, paused: bool) -> Result<()> {
            let mut st = self.state.lock().unwrap();
            if st.fail_load {
                anyhow::bail!("mpv binary not found");
            }
            self.log.lock().unwrap().push(format!("load {} paused={}", url, paused));
            st.paused = paused;
            st.pos = Some(0.0);
            st.eof = false;
            Ok(())
        }

        async fn seek(&mut self, secs: f64) -> Result<()> {
            self.log.lock().unwrap().push(format!("seek {}", secs));
            self.state.lock().unwrap().pos = Some(secs);
            Ok(())
        }

        async fn set_paused(&mut self, paused: bool) -> Result<()> {
            self.log.lock().unwrap().push(format!("pause {}", paused));
            self.state.lock().unwrap().paused = paused;
            Ok(())
        }

        async fn is_paused(&mut self) -> Result<bool> {
            Ok(self.state.lock().unwrap().paused)
        }

        async fn position(&mut self) -> Result<Option<f64>> {
            Ok(self.state.lock().unwrap().pos)
        }

        async fn duration(&mut self) -> Result<Option<f64>> {
            Ok(self.state.lock().unwrap().duration)
        }

        async fn eof_reached(&mut self) -> Result<bool> {
            Ok(self.state.lock().unwrap().eof)
        }

        fn is_alive(&mut self) -> bool {
            self.state.lock().unwrap().alive
        }

        async fn stop(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("stop".into());
            self.state.lock().unwrap().pos = None;
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct FakeStore {
        pub log: Log,
        pub saved: Mutex<HashMap<(MediaId, Option<EpisodeId>), u64>>,
        pub fail_reads: bool,
        pub fail_writes: bool,
    }

    impl ProgressStore for FakeStore {
        async fn load_position(&self, media_id: MediaId, episode_id: Option<EpisodeId>) -> Result<u64, ApiError> {
            if self.fail_reads {
                return Err(ApiError::Network("reset".into()));
            }
            Ok(self
                .saved
                .lock()
                .unwrap()
                .get(&(media_id, episode_id))
                .copied()
                .unwrap_or(0))
        }

        async fn save_position(&self, media_id: MediaId, update: ProgressUpdate) -> Result<(), ApiError> {
            self.log.lock().unwrap().push(format!(
                "save {}/{:?} {} completed={}",
                media_id, update.episode_id, update.position, update.completed
            ));
            if self.fail_writes {
                return Err(ApiError::Http {
                    status: 500,
                    body: "boom".into(),
                });
            }
            self.saved
                .lock()
                .unwrap()
                .insert((media_id, update.episode_id), update.position);
            Ok(())
        }
    }

    pub struct Rig {
        pub ctl: PlayerController<FakePlayer, FakeStore>,
        pub log: Log,
        pub state: Arc<Mutex<FakeState>>,
    }

    pub fn rig_with(store: FakeStore, policy: ResumePolicy) -> Rig {
        let log = Arc::clone(&store.log);
        let state = Arc::new(Mutex::new(FakeState::default()));
        let player = FakePlayer {
            log: Arc::clone(&log),
            state: Arc::clone(&state),
        };
        let ctl = PlayerController::new(player, Arc::new(store), policy, Duration::from_secs(10));
        Rig { ctl, log, state }
    }

    pub fn store_with(entries: &[((MediaId, Option<EpisodeId>), u64)]) -> FakeStore {
        let store = FakeStore::default();
        store.saved.lock().unwrap().extend(entries.iter().copied());
        store
    }

    pub fn session(media_id: MediaId, episode_id: Option<EpisodeId>) -> MediaSession {
        let stream_url = match episode_id {
            Some(ep) => format!("http://srv/api/stream/{}/episode/{}", media_id, ep),
            None => format!("http://srv/api/stream/{}", media_id),
        };
        MediaSession {
            media_id,
            episode_id,
            title: format!("media {}", media_id),
            stream_url,
        }
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn short_saved_position_plays_immediately() {
        let mut r = rig_with(store_with(&[((1, None), 5)]), ResumePolicy::default());
        let opening = r.ctl.open(session(1, None), Instant::now()).await.unwrap();

        assert_eq!(opening, Opening::StartAt(0));
        assert_eq!(r.ctl.resume_state(), ResumeState::Resumed(0));
        assert_eq!(entries(&r.log), vec!["load http://srv/api/stream/1 paused=false"]);
    }

    #[tokio::test(start_paused = true)]
    async fn unanswered_prompt_starts_at_saved_position() {
        let mut r = rig_with(store_with(&[((1, None), 120)]), ResumePolicy::default());
        let t0 = Instant::now();
        let opening = r.ctl.open(session(1, None), t0).await.unwrap();
        assert_eq!(opening, Opening::Prompt { saved: 120 });
        assert!(r.state.lock().unwrap().paused);

        r.ctl.tick(t0 + Duration::from_secs(4)).await.unwrap();
        assert!(r.ctl.resume_state() != ResumeState::AutoResumedByTimeout(120));

        r.ctl.tick(t0 + Duration::from_secs(5)).await.unwrap();
        assert_eq!(r.ctl.resume_state(), ResumeState::AutoResumedByTimeout(120));
        assert_eq!(
            entries(&r.log),
            vec![
                "load http://srv/api/stream/1 paused=true",
                "seek 120",
                "pause false",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn restart_choice_plays_from_zero() {
        let mut r = rig_with(store_with(&[((1, None), 120)]), ResumePolicy::default());
        r.ctl.open(session(1, None), Instant::now()).await.unwrap();
        r.ctl.choose(ResumeChoice::Restart).await.unwrap();

        assert_eq!(r.ctl.resume_state(), ResumeState::Restarted);
        assert_eq!(
            entries(&r.log),
            vec!["load http://srv/api/stream/1 paused=true", "pause false"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_save_sends_floored_position() {
        let mut r = rig_with(FakeStore::default(), ResumePolicy::default());
        let t0 = Instant::now();
        r.ctl.open(session(3, Some(8)), t0).await.unwrap();
        r.state.lock().unwrap().pos = Some(42.9);

        r.ctl.tick(t0 + Duration::from_secs(9)).await.unwrap();
        r.ctl.tick(t0 + Duration::from_secs(10)).await.unwrap();
        r.ctl.tick(t0 + Duration::from_secs(15)).await.unwrap();

        let saves: Vec<_> = entries(&r.log).into_iter().filter(|l| l.starts_with("save")).collect();
        assert_eq!(saves, vec!["save 3/Some(8) 42 completed=false"]);
    }

    #[tokio::test(start_paused = true)]
    async fn no_saves_while_prompting() {
        let policy = ResumePolicy {
            prompt_timeout: Duration::from_secs(30),
            ..ResumePolicy::default()
        };
        let mut r = rig_with(store_with(&[((1, None), 600)]), policy);
        let t0 = Instant::now();
        r.ctl.open(session(1, None), t0).await.unwrap();

        r.ctl.tick(t0 + Duration::from_secs(11)).await.unwrap();
        r.ctl.close().await;

        assert!(entries(&r.log).iter().all(|l| !l.starts_with("save")));
    }

    #[tokio::test(start_paused = true)]
    async fn switching_episode_saves_outgoing_before_loading() {
        let mut r = rig_with(FakeStore::default(), ResumePolicy::default());
        let t0 = Instant::now();
        r.ctl.open(session(7, Some(1)), t0).await.unwrap();
        r.state.lock().unwrap().pos = Some(300.4);

        r.ctl.switch_episode(session(7, Some(2)), t0 + Duration::from_secs(3)).await.unwrap();

        let log = entries(&r.log);
        let save = log.iter().position(|l| l == "save 7/Some(1) 300 completed=false").unwrap();
        let load = log
            .iter()
            .position(|l| l == "load http://srv/api/stream/7/episode/2 paused=false")
            .unwrap();
        assert!(save < load, "log: {:?}", log);
        assert_eq!(r.ctl.session().unwrap().episode_id, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn close_marks_completion_at_end_of_file() {
        let mut r = rig_with(FakeStore::default(), ResumePolicy::default());
        r.ctl.open(session(2, None), Instant::now()).await.unwrap();
        {
            let mut st = r.state.lock().unwrap();
            st.pos = Some(1_499.6);
            st.eof = true;
        }
        r.ctl.close().await;

        assert_eq!(
            entries(&r.log)[1..],
            ["save 2/None 1499 completed=true".to_string(), "stop".to_string()]
        );
        assert!(r.ctl.session().is_none());
        assert_eq!(r.ctl.resume_state(), ResumeState::NotStarted);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_position_read_starts_from_zero() {
        let store = FakeStore {
            fail_reads: true,
            ..FakeStore::default()
        };
        let mut r = rig_with(store, ResumePolicy::default());
        let opening = r.ctl.open(session(1, None), Instant::now()).await.unwrap();
        assert_eq!(opening, Opening::StartAt(0));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_is_swallowed() {
        let store = FakeStore {
            fail_writes: true,
            ..FakeStore::default()
        };
        let mut r = rig_with(store, ResumePolicy::default());
        let t0 = Instant::now();
        r.ctl.open(session(1, None), t0).await.unwrap();
        let outcome = r.ctl.tick(t0 + Duration::from_secs(10)).await.unwrap();
        assert_eq!(outcome, TickOutcome::Playing);
        assert!(r.ctl.session().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn dead_player_saves_last_position_and_ends() {
        let mut r = rig_with(FakeStore::default(), ResumePolicy::default());
        let t0 = Instant::now();
        r.ctl.open(session(4, None), t0).await.unwrap();
        r.state.lock().unwrap().pos = Some(61.2);
        r.ctl.tick(t0 + Duration::from_secs(1)).await.unwrap();

        r.state.lock().unwrap().alive = false;
        let outcome = r.ctl.tick(t0 + Duration::from_secs(2)).await.unwrap();

        assert_eq!(outcome, TickOutcome::Ended);
        assert!(r.ctl.session().is_none());
        assert!(entries(&r.log).contains(&"save 4/None 61 completed=false".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn load_failure_leaves_controller_closed() {
        let mut r = rig_with(FakeStore::default(), ResumePolicy::default());
        r.state.lock().unwrap().fail_load = true;
        assert!(r.ctl.open(session(1, None), Instant::now()).await.is_err());
        assert!(r.ctl.session().is_none());
        assert_eq!(r.ctl.tick(Instant::now()).await.unwrap(), TickOutcome::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_seek_are_ignored_during_prompt() {
        let mut r = rig_with(store_with(&[((1, None), 200)]), ResumePolicy::default());
        r.ctl.open(session(1, None), Instant::now()).await.unwrap();
        assert_eq!(r.ctl.toggle_pause().await.unwrap(), None);
        r.ctl.seek_relative(10.0).await.unwrap();
        assert_eq!(entries(&r.log).len(), 1);

        r.ctl.choose(ResumeChoice::Resume).await.unwrap();
        assert_eq!(r.ctl.toggle_pause().await.unwrap(), Some(true));
        r.ctl.seek_relative(-300.0).await.unwrap();
        assert_eq!(entries(&r.log).last().unwrap(), "seek 0");
    }
}
