//! Downloads poller.
//!
//! While the Downloads view is visible, refreshes transfers, jobs and
//! aggregate throughput on a fixed cadence. Owns at most one background
//! task: `activate()` aborts the previous one before spawning, so two timers
//! never run at once.
//!
//! Completion detection lives here too: the last-seen state per transfer hash
//! survives suspension and re-activation, and a transfer entering
//! {completed, seeding} from any other state produces exactly one success
//! notification.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dock_proto::protocol::{Job, Transfer, TransferState, TransferStats};
use dock_proto::transport::Transport;
use dock_proto::{ApiClient, ApiError, Notifier, Severity};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Where a fetch cycle gets its data.
pub trait PollSource: Send + Sync + 'static {
    fn fetch_transfers(&self) -> impl Future<Output = Result<Vec<Transfer>, ApiError>> + Send;
    fn fetch_jobs(&self) -> impl Future<Output = Result<Vec<Job>, ApiError>> + Send;
    fn fetch_stats(&self) -> impl Future<Output = Result<TransferStats, ApiError>> + Send;
}

impl<T: Transport> PollSource for ApiClient<T> {
    async fn fetch_transfers(&self) -> Result<Vec<Transfer>, ApiError> {
        self.transfers().await
    }

    async fn fetch_jobs(&self) -> Result<Vec<Job>, ApiError> {
        self.jobs().await
    }

    async fn fetch_stats(&self) -> Result<TransferStats, ApiError> {
        self.transfer_stats().await
    }
}

/// One successful fetch. A failed fetch produces nothing, so the view keeps
/// its previous render.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    Transfers(Vec<Transfer>),
    Jobs(Vec<Job>),
    Stats(TransferStats),
}

/// Last observed lifecycle state per transfer hash.
///
/// Hashes that drop out of a response are kept, so a transfer that vanishes
/// and comes back already complete is not announced twice.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    last_seen: HashMap<String, TransferState>,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `transfers` and returns those that just crossed into the
    /// terminal-success set. A hash seen for the first time only sets a
    /// baseline.
    pub fn observe<'a>(&mut self, transfers: &'a [Transfer]) -> Vec<&'a Transfer> {
        let mut completed = Vec::new();
        for t in transfers {
            let previous = self.last_seen.insert(t.hash.clone(), t.state);
            if let Some(prev) = previous {
                if !prev.is_terminal_success() && t.state.is_terminal_success() {
                    completed.push(t);
                }
            }
        }
        completed
    }

    pub fn state_of(&self, hash: &str) -> Option<TransferState> {
        self.last_seen.get(hash).copied()
    }

    pub fn len(&self) -> usize {
        self.last_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.last_seen.is_empty()
    }
}

pub struct Poller<S: PollSource> {
    source: Arc<S>,
    interval: Duration,
    events: mpsc::Sender<PollEvent>,
    notifier: Arc<dyn Notifier>,
    tracker: Arc<Mutex<CompletionTracker>>,
    task: Option<JoinHandle<()>>,
}

impl<S: PollSource> Poller<S> {
    pub fn new(
        source: Arc<S>,
        interval: Duration,
        events: mpsc::Sender<PollEvent>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            source,
            interval,
            events,
            notifier,
            tracker: Arc::new(Mutex::new(CompletionTracker::new())),
            task: None,
        }
    }

    /// Starts polling with an immediate fetch. Any running task is cancelled
    /// first.
    pub fn activate(&mut self) {
        self.deactivate();
        debug!("poller: activating every {:?}", self.interval);

        let source = Arc::clone(&self.source);
        let events = self.events.clone();
        let notifier = Arc::clone(&self.notifier);
        let tracker = Arc::clone(&self.tracker);
        let period = self.interval;

        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                poll_cycle(source.as_ref(), &events, notifier.as_ref(), &tracker).await;
                if events.is_closed() {
                    break;
                }
            }
        }));
    }

    pub fn deactivate(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("poller: suspending");
            task.abort();
        }
    }

    /// Maps host visibility onto activate/deactivate. Repeating the current
    /// visibility is a no-op.
    pub fn set_visible(&mut self, visible: bool) {
        if visible == self.is_active() {
            return;
        }
        if visible {
            self.activate();
        } else {
            self.deactivate();
        }
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Restarts an active cycle so the next fetch happens now. Used after a
    /// mutation so the list reflects it without waiting a full interval.
    pub fn kick(&mut self) {
        if self.is_active() {
            self.activate();
        }
    }
}

impl<S: PollSource> Drop for Poller<S> {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// One fetch cycle: the three fetches run concurrently and fail
/// independently. The tracker is updated once, after the join.
pub async fn poll_cycle<S: PollSource + ?Sized>(
    source: &S,
    events: &mpsc::Sender<PollEvent>,
    notifier: &dyn Notifier,
    tracker: &Mutex<CompletionTracker>,
) {
    let (transfers, jobs, stats) = tokio::join!(
        source.fetch_transfers(),
        source.fetch_jobs(),
        source.fetch_stats()
    );

    match transfers {
        Ok(list) => {
            let finished: Vec<String> = {
                let mut tracker = tracker.lock().await;
                tracker
                    .observe(&list)
                    .into_iter()
                    .map(|t| t.name.clone())
                    .collect()
            };
            for name in finished {
                notifier.notify(&format!("Download complete: {}", name), Severity::Success, None);
            }
            let _ = events.send(PollEvent::Transfers(list)).await;
        }
        Err(e) => warn!("poll: transfers fetch failed: {}", e),
    }

    match jobs {
        Ok(list) => {
            let _ = events.send(PollEvent::Jobs(list)).await;
        }
        Err(e) => warn!("poll: jobs fetch failed: {}", e),
    }

    match stats {
        Ok(s) => {
            let _ = events.send(PollEvent::Stats(s)).await;
        }
        Err(e) => warn!("poll: stats fetch failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    fn transfer(hash: &str, state: TransferState) -> Transfer {
        Transfer {
            hash: hash.to_string(),
            name: format!("{}.mkv", hash),
            state,
            ..Transfer::default()
        }
    }

    #[derive(Default)]
    struct RecordingNotifier(StdMutex<Vec<(String, Severity)>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str, severity: Severity, _duration: Option<Duration>) {
            self.0.lock().unwrap().push((message.to_string(), severity));
        }
    }

    /// Counts fetches and replays scripted transfer lists (repeating the last).
    #[derive(Default)]
    struct ScriptedSource {
        transfer_calls: AtomicUsize,
        script: StdMutex<VecDeque<Result<Vec<Transfer>, ApiError>>>,
        fail_jobs: bool,
    }

    impl ScriptedSource {
        fn with_script(script: Vec<Result<Vec<Transfer>, ApiError>>) -> Self {
            Self {
                script: StdMutex::new(script.into()),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.transfer_calls.load(Ordering::SeqCst)
        }
    }

    impl PollSource for ScriptedSource {
        async fn fetch_transfers(&self) -> Result<Vec<Transfer>, ApiError> {
            self.transfer_calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.pop_front().unwrap_or(Ok(Vec::new()))
            } else {
                script.front().cloned().unwrap_or(Ok(Vec::new()))
            }
        }

        async fn fetch_jobs(&self) -> Result<Vec<Job>, ApiError> {
            if self.fail_jobs {
                Err(ApiError::Network("refused".into()))
            } else {
                Ok(Vec::new())
            }
        }

        async fn fetch_stats(&self) -> Result<TransferStats, ApiError> {
            Ok(TransferStats::default())
        }
    }

    fn poller(source: Arc<ScriptedSource>) -> (Poller<ScriptedSource>, mpsc::Receiver<PollEvent>, Arc<RecordingNotifier>) {
        let (tx, rx) = mpsc::channel(1024);
        let notifier = Arc::new(RecordingNotifier::default());
        let poller = Poller::new(source, Duration::from_secs(2), tx, notifier.clone());
        (poller, rx, notifier)
    }

    #[test]
    fn tracker_fires_once_on_the_completion_edge() {
        let mut tracker = CompletionTracker::new();
        let states = [
            TransferState::Downloading,
            TransferState::Downloading,
            TransferState::Completed,
            TransferState::Completed,
        ];
        let fired: Vec<usize> = states
            .iter()
            .map(|s| tracker.observe(&[transfer("a", *s)]).len())
            .collect();
        assert_eq!(fired, vec![0, 0, 1, 0]);
    }

    #[test]
    fn first_sight_is_only_a_baseline() {
        let mut tracker = CompletionTracker::new();
        assert!(tracker.observe(&[transfer("a", TransferState::Seeding)]).is_empty());
        assert_eq!(tracker.state_of("a"), Some(TransferState::Seeding));
    }

    #[test]
    fn seeding_to_completed_is_not_a_new_completion() {
        let mut tracker = CompletionTracker::new();
        tracker.observe(&[transfer("a", TransferState::Downloading)]);
        assert_eq!(tracker.observe(&[transfer("a", TransferState::Seeding)]).len(), 1);
        assert!(tracker.observe(&[transfer("a", TransferState::Completed)]).is_empty());
    }

    #[test]
    fn stale_entries_are_kept_and_do_not_renotify() {
        let mut tracker = CompletionTracker::new();
        tracker.observe(&[transfer("a", TransferState::Downloading)]);
        assert_eq!(tracker.observe(&[transfer("a", TransferState::Completed)]).len(), 1);

        assert!(tracker.observe(&[]).is_empty());
        assert_eq!(tracker.len(), 1, "vanished hash is retained");

        assert!(tracker.observe(&[transfer("a", TransferState::Completed)]).is_empty());
    }

    #[test]
    fn paused_then_resumed_to_completion_fires() {
        let mut tracker = CompletionTracker::new();
        tracker.observe(&[transfer("a", TransferState::Downloading), transfer("b", TransferState::Paused)]);
        let batch = [transfer("a", TransferState::Downloading), transfer("b", TransferState::Completed)];
        let done = tracker.observe(&batch);
        let hashes: Vec<_> = done.iter().map(|t| t.hash.as_str()).collect();
        assert_eq!(hashes, vec!["b"]);
    }

    #[tokio::test]
    async fn completion_across_cycles_notifies_exactly_once() {
        let source = ScriptedSource::with_script(vec![
            Ok(vec![transfer("a", TransferState::Downloading)]),
            Ok(vec![transfer("a", TransferState::Downloading)]),
            Ok(vec![transfer("a", TransferState::Completed)]),
            Ok(vec![transfer("a", TransferState::Completed)]),
        ]);
        let (tx, mut rx) = mpsc::channel(64);
        let notifier = RecordingNotifier::default();
        let tracker = Mutex::new(CompletionTracker::new());

        for _ in 0..4 {
            poll_cycle(&source, &tx, &notifier, &tracker).await;
        }

        let notes = notifier.0.lock().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0], ("Download complete: a.mkv".to_string(), Severity::Success));

        let mut transfer_events = 0;
        while let Ok(ev) = rx.try_recv() {
            if matches!(ev, PollEvent::Transfers(_)) {
                transfer_events += 1;
            }
        }
        assert_eq!(transfer_events, 4);
    }

    #[tokio::test]
    async fn one_failed_fetch_does_not_cancel_the_others() {
        let source = ScriptedSource {
            fail_jobs: true,
            ..ScriptedSource::with_script(vec![Ok(vec![transfer("a", TransferState::Queued)])])
        };
        let (tx, mut rx) = mpsc::channel(64);
        let notifier = RecordingNotifier::default();
        let tracker = Mutex::new(CompletionTracker::new());

        poll_cycle(&source, &tx, &notifier, &tracker).await;

        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], PollEvent::Transfers(_)));
        assert!(matches!(events[1], PollEvent::Stats(_)));
        assert!(notifier.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_transfer_fetch_leaves_tracker_untouched() {
        let source = ScriptedSource::with_script(vec![
            Ok(vec![transfer("a", TransferState::Downloading)]),
            Err(ApiError::Network("reset".into())),
            Ok(vec![transfer("a", TransferState::Completed)]),
        ]);
        let (tx, _rx) = mpsc::channel(64);
        let notifier = RecordingNotifier::default();
        let tracker = Mutex::new(CompletionTracker::new());

        for _ in 0..3 {
            poll_cycle(&source, &tx, &notifier, &tracker).await;
        }
        assert_eq!(notifier.0.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_immediately_then_every_interval() {
        let source = Arc::new(ScriptedSource::default());
        let (mut poller, _rx, _) = poller(Arc::clone(&source));

        poller.activate();
        tokio::time::sleep(Duration::from_millis(5_000)).await;
        // t = 0, 2, 4
        assert_eq!(source.calls(), 3);
        assert!(poller.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn kick_fetches_now_only_while_active() {
        let source = Arc::new(ScriptedSource::default());
        let (mut poller, _rx, _) = poller(Arc::clone(&source));

        poller.kick();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls(), 0, "inactive poller ignores kicks");

        poller.activate();
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(source.calls(), 1);
        poller.kick();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reactivation_never_stacks_timers() {
        let source = Arc::new(ScriptedSource::default());
        let (mut poller, _rx, _) = poller(Arc::clone(&source));

        poller.activate();
        poller.activate();
        poller.activate();
        tokio::time::sleep(Duration::from_millis(5_000)).await;
        assert_eq!(source.calls(), 3);

        poller.deactivate();
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(source.calls(), 3, "suspended poller must not fetch");

        poller.activate();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.calls(), 4, "re-activation fetches immediately");

        poller.activate();
        tokio::time::sleep(Duration::from_millis(4_500)).await;
        // immediate fetch + t+2 + t+4 from the fresh timer only
        assert_eq!(source.calls(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn visibility_toggles_are_idempotent() {
        let source = Arc::new(ScriptedSource::default());
        let (mut poller, _rx, _) = poller(Arc::clone(&source));

        poller.set_visible(true);
        poller.set_visible(true);
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(source.calls(), 1);

        poller.set_visible(false);
        poller.set_visible(false);
        assert!(!poller.is_active());
        tokio::time::sleep(Duration::from_millis(6_000)).await;
        assert_eq!(source.calls(), 1);

        poller.set_visible(true);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_state_survives_suspension() {
        let source = Arc::new(ScriptedSource::with_script(vec![
            Ok(vec![transfer("a", TransferState::Downloading)]),
            Ok(vec![transfer("a", TransferState::Completed)]),
        ]));
        let (mut poller, _rx, notifier) = poller(Arc::clone(&source));

        poller.set_visible(true);
        tokio::time::sleep(Duration::from_millis(100)).await;
        poller.set_visible(false);
        tokio::time::sleep(Duration::from_millis(30_000)).await;

        poller.set_visible(true);
        tokio::time::sleep(Duration::from_millis(4_100)).await;
        poller.set_visible(false);

        let notes = notifier.0.lock().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].1, Severity::Success);
    }
}
