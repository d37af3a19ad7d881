//! Navigation watcher.
//!
//! Every signal source (DOM mutation, history push/replace, popstate, the
//! player poll, activation) funnels into one gate, [`NavigationWatcher::evaluate`],
//! which resolves the subject from the page location *after* a settle delay
//! and compares it with the last dispatched subject. Only a genuine change
//! reaches the [`SubjectHandler`], and it does so fire-and-forget.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use parking_lot::Mutex;
use recap_core::SubjectId;
use recap_settings::WatcherSettings;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::host::HostPage;
use crate::resolver::resolve_subject;
use crate::signals::NavigationSignal;

/// Downstream consumer of subject changes.
#[async_trait]
pub trait SubjectHandler: Send + Sync {
    /// The page now addresses `subject_id`.
    async fn subject_changed(&self, subject_id: SubjectId);

    /// The page no longer addresses any subject.
    fn subject_cleared(&self) {}
}

/// Watcher timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Wait after each signal before resolving.
    pub settle_delay: Duration,
    /// Wait after activation before the first resolution.
    pub initial_delay: Duration,
    /// Interval between player checks.
    pub player_poll_interval: Duration,
    /// Wait after activation before the first player check.
    pub player_poll_start: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self::from(&WatcherSettings::default())
    }
}

impl From<&WatcherSettings> for WatcherConfig {
    fn from(s: &WatcherSettings) -> Self {
        Self {
            settle_delay: Duration::from_millis(s.settle_delay_ms),
            initial_delay: Duration::from_millis(s.initial_delay_ms),
            player_poll_interval: Duration::from_millis(s.player_poll_interval_ms.max(1)),
            player_poll_start: Duration::from_millis(s.player_poll_start_ms),
        }
    }
}

/// Result of one pass through the gate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// A new subject was dispatched downstream.
    Dispatched(SubjectId),
    /// The subject equals the last dispatched one.
    Unchanged,
    /// The page addresses no subject.
    NoSubject,
    /// The page location could not be read.
    HostUnavailable,
}

/// Detects subject changes in a page that navigates without reloading.
pub struct NavigationWatcher {
    page: Arc<dyn HostPage>,
    handler: Arc<dyn SubjectHandler>,
    config: WatcherConfig,
    last_seen: Mutex<Option<SubjectId>>,
    last_url: Mutex<Option<String>>,
    dispatches: AtomicU64,
    handoffs: TaskTracker,
}

impl NavigationWatcher {
    /// Create a watcher with no subject seen yet.
    pub fn new(
        page: Arc<dyn HostPage>,
        handler: Arc<dyn SubjectHandler>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            page,
            handler,
            config,
            last_seen: Mutex::new(None),
            last_url: Mutex::new(None),
            dispatches: AtomicU64::new(0),
            handoffs: TaskTracker::new(),
        }
    }

    /// Most recently dispatched subject.
    pub fn last_seen(&self) -> Option<SubjectId> {
        self.last_seen.lock().clone()
    }

    /// Number of subjects dispatched downstream.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatches.load(Ordering::Relaxed)
    }

    /// The single gate behind every signal.
    ///
    /// Reads the location, then compares and updates `last_seen` in one
    /// critical section before handing the subject off, so overlapping
    /// evaluations can never dispatch the same subject twice.
    pub async fn evaluate(&self) -> GateOutcome {
        let location = match self.page.location().await {
            Ok(location) => location,
            Err(e) => {
                debug!(error = %e, "page location unavailable");
                return GateOutcome::HostUnavailable;
            }
        };

        let Some(subject_id) = resolve_subject(&location) else {
            let had_subject = self.last_seen.lock().take().is_some();
            if had_subject {
                debug!(%location, "left subject page");
                self.handler.subject_cleared();
            }
            return GateOutcome::NoSubject;
        };

        {
            let mut last_seen = self.last_seen.lock();
            if last_seen.as_ref() == Some(&subject_id) {
                return GateOutcome::Unchanged;
            }
            *last_seen = Some(subject_id.clone());
        }

        let _ = self.dispatches.fetch_add(1, Ordering::Relaxed);
        info!(subject_id = %subject_id, "subject changed");
        let handler = Arc::clone(&self.handler);
        let dispatched = subject_id.clone();
        drop(self.handoffs.spawn(async move {
            handler.subject_changed(dispatched).await;
        }));
        GateOutcome::Dispatched(subject_id)
    }

    /// Whether a mutation signal coincides with a URL change.
    ///
    /// Mutations fire constantly on a live page; only those observed after
    /// the location moved are worth a settle delay.
    async fn url_moved(&self) -> bool {
        let Ok(location) = self.page.location().await else {
            return false;
        };
        let mut last_url = self.last_url.lock();
        if last_url.as_deref() == Some(location.as_str()) {
            return false;
        }
        *last_url = Some(location);
        true
    }

    /// Handle one signal: wait the settle delay, then run the gate.
    pub async fn on_signal(&self, signal: NavigationSignal) -> GateOutcome {
        if signal == NavigationSignal::Mutation && !self.url_moved().await {
            counter!("recap_trigger_total", "signal" => signal.as_str(), "result" => "ignored")
                .increment(1);
            return GateOutcome::Unchanged;
        }
        let delay = match signal {
            NavigationSignal::Activation => self.config.initial_delay,
            _ => self.config.settle_delay,
        };
        tokio::time::sleep(delay).await;
        let outcome = self.evaluate().await;
        let result = match &outcome {
            GateOutcome::Dispatched(_) => "dispatched",
            GateOutcome::Unchanged => "suppressed",
            GateOutcome::NoSubject => "no_subject",
            GateOutcome::HostUnavailable => "host_unavailable",
        };
        counter!("recap_trigger_total", "signal" => signal.as_str(), "result" => result).increment(1);
        debug!(%signal, result, "trigger evaluated");
        outcome
    }

    /// Attach to a page context and start watching.
    ///
    /// Resolves from the current location after the initial delay (never
    /// assuming "no subject"), polls for the player element, and schedules
    /// one settle-delayed evaluation per incoming signal. Each evaluation
    /// runs on its own task so a burst of signals never blocks the channel.
    ///
    /// When the signal channel closes, the player poll stops and the task
    /// finishes once pending evaluations and the handler work they
    /// dispatched have completed.
    pub fn start(self: Arc<Self>, mut signals: mpsc::Receiver<NavigationSignal>) -> WatcherHandle {
        let cancel = CancellationToken::new();
        let watcher = Arc::clone(&self);
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let tracker = TaskTracker::new();
            spawn_evaluation(&tracker, &watcher, &token, NavigationSignal::Activation);
            let poll_token = token.child_token();
            {
                let watcher = Arc::clone(&watcher);
                let poll_token = poll_token.clone();
                drop(tracker.spawn(async move {
                    tokio::select! {
                        () = poll_token.cancelled() => {}
                        () = watcher.poll_for_player() => {}
                    }
                }));
            }

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    signal = signals.recv() => match signal {
                        Some(signal) => spawn_evaluation(&tracker, &watcher, &token, signal),
                        None => break,
                    },
                }
            }
            poll_token.cancel();
            let _ = tracker.close();
            tracker.wait().await;
            if !token.is_cancelled() {
                let _ = watcher.handoffs.close();
                watcher.handoffs.wait().await;
            }
            debug!("navigation watcher stopped");
        });

        WatcherHandle {
            watcher: self,
            cancel,
            task,
        }
    }

    /// Wait for a media element to exist, then evaluate once.
    async fn poll_for_player(&self) {
        tokio::time::sleep(self.config.player_poll_start).await;
        loop {
            if self.page.has_media().await.unwrap_or(false) {
                debug!("player element found");
                let _ = self.on_signal(NavigationSignal::PlayerReady).await;
                return;
            }
            tokio::time::sleep(self.config.player_poll_interval).await;
        }
    }
}

fn spawn_evaluation(
    tracker: &TaskTracker,
    watcher: &Arc<NavigationWatcher>,
    token: &CancellationToken,
    signal: NavigationSignal,
) {
    let watcher = Arc::clone(watcher);
    let token = token.clone();
    drop(tracker.spawn(async move {
        tokio::select! {
            () = token.cancelled() => {}
            _ = watcher.on_signal(signal) => {}
        }
    }));
}

/// Running watcher. Dropping the handle does not stop it; call [`stop`](Self::stop).
pub struct WatcherHandle {
    watcher: Arc<NavigationWatcher>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    /// The watcher behind this handle.
    pub fn watcher(&self) -> &Arc<NavigationWatcher> {
        &self.watcher
    }

    /// Detach from the page: pending evaluations are abandoned.
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }

    /// Wait until the signal channel closes and all pending work finishes.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::SnapshotPage;

    const ABC: &str = "https://www.youtube.com/watch?v=abc12345678";
    const XYZ: &str = "https://www.youtube.com/watch?v=xyz98765432";
    const HOME: &str = "https://www.youtube.com/";

    #[derive(Default)]
    struct Recorder {
        changes: Mutex<Vec<SubjectId>>,
        clears: AtomicU64,
    }

    impl Recorder {
        fn changes(&self) -> Vec<String> {
            self.changes
                .lock()
                .iter()
                .map(|s| s.as_str().to_string())
                .collect()
        }
    }

    #[async_trait]
    impl SubjectHandler for Recorder {
        async fn subject_changed(&self, subject_id: SubjectId) {
            self.changes.lock().push(subject_id);
        }

        fn subject_cleared(&self) {
            let _ = self.clears.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn setup(url: &str) -> (Arc<SnapshotPage>, Arc<Recorder>, Arc<NavigationWatcher>) {
        let page = Arc::new(SnapshotPage::new(url));
        let recorder = Arc::new(Recorder::default());
        let watcher = Arc::new(NavigationWatcher::new(
            page.clone(),
            recorder.clone(),
            WatcherConfig::default(),
        ));
        (page, recorder, watcher)
    }

    /// Let spawned fire-and-forget tasks run.
    async fn settle_tasks() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn evaluate_dispatches_then_suppresses() {
        let (_page, recorder, watcher) = setup(ABC);
        assert_eq!(
            watcher.evaluate().await,
            GateOutcome::Dispatched(SubjectId::parse("abc12345678").unwrap())
        );
        assert_eq!(watcher.evaluate().await, GateOutcome::Unchanged);
        settle_tasks().await;
        assert_eq!(recorder.changes(), vec!["abc12345678"]);
        assert_eq!(watcher.dispatch_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_evaluations_dispatch_once() {
        let (_page, recorder, watcher) = setup(ABC);
        let outcomes = futures_join(&watcher).await;
        let dispatched = outcomes
            .iter()
            .filter(|o| matches!(o, GateOutcome::Dispatched(_)))
            .count();
        assert_eq!(dispatched, 1);
        settle_tasks().await;
        assert_eq!(recorder.changes().len(), 1);
    }

    async fn futures_join(watcher: &Arc<NavigationWatcher>) -> Vec<GateOutcome> {
        let mut handles = Vec::new();
        for _ in 0..5 {
            let w = Arc::clone(watcher);
            handles.push(tokio::spawn(async move { w.evaluate().await }));
        }
        let mut out = Vec::new();
        for h in handles {
            out.push(h.await.unwrap());
        }
        out
    }

    #[tokio::test]
    async fn leaving_subject_clears_last_seen() {
        let (page, recorder, watcher) = setup(ABC);
        let _ = watcher.evaluate().await;
        page.navigate(HOME);
        assert_eq!(watcher.evaluate().await, GateOutcome::NoSubject);
        assert_eq!(watcher.last_seen(), None);
        assert_eq!(recorder.clears.load(Ordering::Relaxed), 1);

        // Coming back to the same subject is a genuine change again
        page.navigate(ABC);
        assert!(matches!(watcher.evaluate().await, GateOutcome::Dispatched(_)));
    }

    #[tokio::test]
    async fn detached_page_is_host_unavailable() {
        let (page, _recorder, watcher) = setup(ABC);
        page.detach();
        assert_eq!(watcher.evaluate().await, GateOutcome::HostUnavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_delay_resolves_page_state_after_delay() {
        let (page, recorder, watcher) = setup(ABC);
        let w = Arc::clone(&watcher);
        let pending = tokio::spawn(async move { w.on_signal(NavigationSignal::PushState).await });

        // URL changes while the trigger is still settling
        tokio::time::sleep(Duration::from_millis(500)).await;
        page.navigate(XYZ);

        let outcome = pending.await.unwrap();
        assert_eq!(
            outcome,
            GateOutcome::Dispatched(SubjectId::parse("xyz98765432").unwrap())
        );
        settle_tasks().await;
        assert_eq!(recorder.changes(), vec!["xyz98765432"]);
    }

    #[tokio::test(start_paused = true)]
    async fn two_push_states_within_settle_delay_dispatch_once() {
        let (page, recorder, watcher) = setup(ABC);
        let (tx, rx) = mpsc::channel(16);
        let handle = Arc::clone(&watcher).start(rx);

        // Let activation resolve the starting subject
        tokio::time::sleep(Duration::from_millis(2100)).await;
        settle_tasks().await;
        assert_eq!(recorder.changes(), vec!["abc12345678"]);

        page.navigate(XYZ);
        tx.send(NavigationSignal::PushState).await.unwrap();
        tokio::time::sleep(Duration::from_millis(300)).await;
        tx.send(NavigationSignal::PushState).await.unwrap();
        tokio::time::sleep(Duration::from_millis(3000)).await;
        settle_tasks().await;

        assert_eq!(recorder.changes(), vec!["abc12345678", "xyz98765432"]);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn redundant_signals_from_all_sources_collapse() {
        let (page, recorder, watcher) = setup(HOME);
        let (tx, rx) = mpsc::channel(16);
        let handle = Arc::clone(&watcher).start(rx);

        page.navigate(ABC);
        page.set_html("<video></video>");
        for signal in [
            NavigationSignal::Mutation,
            NavigationSignal::PushState,
            NavigationSignal::ReplaceState,
            NavigationSignal::PopState,
        ] {
            tx.send(signal).await.unwrap();
        }
        tokio::time::sleep(Duration::from_secs(10)).await;
        settle_tasks().await;

        assert_eq!(recorder.changes(), vec!["abc12345678"]);
        assert_eq!(watcher.dispatch_count(), 1);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_mutations_without_url_change_are_ignored() {
        let (_page, _recorder, watcher) = setup(ABC);
        // First mutation records the URL
        assert!(matches!(
            watcher.on_signal(NavigationSignal::Mutation).await,
            GateOutcome::Dispatched(_)
        ));
        let before = tokio::time::Instant::now();
        assert_eq!(
            watcher.on_signal(NavigationSignal::Mutation).await,
            GateOutcome::Unchanged
        );
        // Ignored without waiting for the settle delay
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn player_poll_dispatches_when_media_appears() {
        let page = Arc::new(SnapshotPage::new(ABC));
        let recorder = Arc::new(Recorder::default());
        let config = WatcherConfig {
            initial_delay: Duration::from_secs(3600),
            ..WatcherConfig::default()
        };
        let watcher = Arc::new(NavigationWatcher::new(page.clone(), recorder.clone(), config));
        let (_tx, rx) = mpsc::channel(4);
        let handle = Arc::clone(&watcher).start(rx);

        tokio::time::sleep(Duration::from_secs(5)).await;
        settle_tasks().await;
        assert!(recorder.changes().is_empty(), "no player yet, no dispatch");

        page.set_html("<video></video>");
        tokio::time::sleep(Duration::from_secs(4)).await;
        settle_tasks().await;
        assert_eq!(recorder.changes(), vec!["abc12345678"]);
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn recreated_watcher_re_resolves_current_location() {
        let page = Arc::new(SnapshotPage::new(ABC));
        let recorder = Arc::new(Recorder::default());

        let first = Arc::new(NavigationWatcher::new(
            page.clone(),
            recorder.clone(),
            WatcherConfig::default(),
        ));
        let (_tx1, rx1) = mpsc::channel(4);
        let handle = Arc::clone(&first).start(rx1);
        tokio::time::sleep(Duration::from_secs(3)).await;
        settle_tasks().await;
        handle.stop().await;

        // Context torn down and recreated on the same page
        let second = Arc::new(NavigationWatcher::new(
            page.clone(),
            recorder.clone(),
            WatcherConfig::default(),
        ));
        let (_tx2, rx2) = mpsc::channel(4);
        let handle = Arc::clone(&second).start(rx2);
        tokio::time::sleep(Duration::from_secs(3)).await;
        settle_tasks().await;

        assert_eq!(recorder.changes(), vec!["abc12345678", "abc12345678"]);
        assert_eq!(second.last_seen().unwrap().as_str(), "abc12345678");
        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn join_drains_pending_work_after_channel_closes() {
        let (page, recorder, watcher) = setup(HOME);
        let (tx, rx) = mpsc::channel(4);
        let handle = Arc::clone(&watcher).start(rx);
        page.navigate(XYZ);
        tx.send(NavigationSignal::PushState).await.unwrap();
        drop(tx);

        // No media element: the player poll would otherwise run forever
        handle.join().await;
        assert_eq!(recorder.changes(), vec!["xyz98765432"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_abandons_pending_evaluations() {
        let (page, recorder, watcher) = setup(HOME);
        let (tx, rx) = mpsc::channel(4);
        let handle = Arc::clone(&watcher).start(rx);
        page.navigate(ABC);
        tx.send(NavigationSignal::PopState).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.stop().await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        settle_tasks().await;
        assert!(recorder.changes().is_empty());
    }
}
