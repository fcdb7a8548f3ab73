//! Background task that owns the [`PlayerController`].
//!
//! The UI sends [`PlayerCommand`]s and reads the latest [`PlayerSnapshot`]
//! from a watch channel; mpv round trips never block a frame.

use std::sync::Arc;
use std::time::Duration;

use dock_proto::{Notifier, Severity};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error};

use super::controller::{PlayerController, TickOutcome};
use super::resume::{ResumeChoice, ResumeState};
use super::{MediaSession, Playback, ProgressStore};

const TICK: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Open(MediaSession),
    SwitchEpisode(MediaSession),
    Choose(ResumeChoice),
    TogglePause,
    Seek(f64),
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub session: Option<MediaSession>,
    pub resume: ResumeState,
    pub prompt_remaining: Option<Duration>,
    pub position: f64,
    pub duration: Option<f64>,
    pub paused: bool,
}

impl Default for PlayerSnapshot {
    fn default() -> Self {
        Self {
            session: None,
            resume: ResumeState::NotStarted,
            prompt_remaining: None,
            position: 0.0,
            duration: None,
            paused: false,
        }
    }
}

pub struct PlayerService<P: Playback + 'static, S: ProgressStore + 'static> {
    controller: PlayerController<P, S>,
    commands: mpsc::Receiver<PlayerCommand>,
    snapshots: watch::Sender<PlayerSnapshot>,
    notifier: Arc<dyn Notifier>,
}

impl<P: Playback + 'static, S: ProgressStore + 'static> PlayerService<P, S> {
    /// Spawns the service task. Dropping the command sender closes any open
    /// session (saving its position) and ends the task.
    pub fn spawn(
        controller: PlayerController<P, S>,
        notifier: Arc<dyn Notifier>,
    ) -> (mpsc::Sender<PlayerCommand>, watch::Receiver<PlayerSnapshot>, JoinHandle<()>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (snap_tx, snap_rx) = watch::channel(PlayerSnapshot::default());
        let service = Self {
            controller,
            commands: cmd_rx,
            snapshots: snap_tx,
            notifier,
        };
        let handle = tokio::spawn(service.run());
        (cmd_tx, snap_rx, handle)
    }

    async fn run(mut self) {
        let mut ticker = tokio::time::interval(TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => {
                        debug!("player service: command channel closed");
                        self.controller.close().await;
                        break;
                    }
                },
                _ = ticker.tick() => self.tick().await,
            }
            self.publish().await;
        }
    }

    async fn handle(&mut self, cmd: PlayerCommand) {
        debug!("player service: {:?}", cmd);
        let now = Instant::now();
        let result = match cmd {
            PlayerCommand::Open(session) => self.controller.open(session, now).await.map(|_| ()),
            PlayerCommand::SwitchEpisode(session) => {
                self.controller.switch_episode(session, now).await.map(|_| ())
            }
            PlayerCommand::Choose(choice) => self.controller.choose(choice).await,
            PlayerCommand::TogglePause => self.controller.toggle_pause().await.map(|_| ()),
            PlayerCommand::Seek(delta) => self.controller.seek_relative(delta).await,
            PlayerCommand::Close => {
                self.controller.close().await;
                Ok(())
            }
        };
        if let Err(e) = result {
            error!("player: {:#}", e);
            self.notifier
                .notify(&format!("Playback failed: {}", e), Severity::Danger, None);
        }
    }

    async fn tick(&mut self) {
        match self.controller.tick(Instant::now()).await {
            Ok(TickOutcome::Ended) => {
                self.notifier.notify("Player closed", Severity::Info, None);
            }
            Ok(_) => {}
            Err(e) => {
                error!("player: {:#}", e);
                self.notifier
                    .notify(&format!("Playback failed: {}", e), Severity::Danger, None);
            }
        }
    }

    async fn publish(&mut self) {
        let session = self.controller.session().cloned();
        let (duration, paused) = if session.is_some() {
            let player = self.controller.player_mut();
            let duration = player.duration().await.ok().flatten();
            let paused = player.is_paused().await.unwrap_or(false);
            (duration, paused)
        } else {
            (None, false)
        };
        let snapshot = PlayerSnapshot {
            session,
            resume: self.controller.resume_state(),
            prompt_remaining: self.controller.prompt_remaining(Instant::now()),
            position: self.controller.last_position(),
            duration,
            paused,
        };
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::controller::tests::{rig_with, session, store_with, FakeStore};
    use crate::player::ResumePolicy;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<(String, Severity)>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str, severity: Severity, _duration: Option<Duration>) {
            self.0.lock().unwrap().push((message.to_string(), severity));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn prompt_counts_down_and_auto_resumes() {
        let rig = rig_with(store_with(&[((1, None), 120)]), ResumePolicy::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let (tx, rx, _task) = PlayerService::spawn(rig.ctl, notifier.clone());

        tx.send(PlayerCommand::Open(session(1, None))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        {
            let snap = rx.borrow();
            assert!(matches!(snap.resume, ResumeState::Prompting { saved: 120, .. }));
            assert!(snap.paused);
            assert!(snap.prompt_remaining.is_some());
        }

        tokio::time::sleep(Duration::from_millis(5_500)).await;
        let snap = rx.borrow().clone();
        assert_eq!(snap.resume, ResumeState::AutoResumedByTimeout(120));
        assert!(!snap.paused);
        assert_eq!(snap.position, 120.0);
        assert!(notifier.0.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn load_failure_toasts_danger() {
        let rig = rig_with(FakeStore::default(), ResumePolicy::default());
        rig.state.lock().unwrap().fail_load = true;
        let notifier = Arc::new(RecordingNotifier::default());
        let (tx, rx, _task) = PlayerService::spawn(rig.ctl, notifier.clone());

        tx.send(PlayerCommand::Open(session(1, None))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(rx.borrow().session.is_none());
        let notes = notifier.0.lock().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].1, Severity::Danger);
        assert!(notes[0].0.contains("mpv binary not found"));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_sender_saves_and_stops() {
        let rig = rig_with(FakeStore::default(), ResumePolicy::default());
        let log = Arc::clone(&rig.log);
        let state = Arc::clone(&rig.state);
        let (tx, _rx, task) = PlayerService::spawn(rig.ctl, Arc::new(RecordingNotifier::default()));

        tx.send(PlayerCommand::Open(session(5, None))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        state.lock().unwrap().pos = Some(33.0);
        drop(tx);
        task.await.unwrap();

        let log = log.lock().unwrap();
        assert_eq!(log[log.len() - 2..], ["save 5/None 33 completed=false".to_string(), "stop".to_string()]);
    }
}
