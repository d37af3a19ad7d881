//! Background extraction coordinator.
//!
//! Primes the shared store for whatever subject the watcher dispatches.
//! At most one cycle runs per coordinator; triggers that arrive while one
//! is running, or that repeat the last attempted subject, are dropped.
//! Failures are logged and absorbed.

use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use parking_lot::Mutex;
use recap_client::TranscriptService;
use recap_core::{Artifact, ArtifactEvent, DEFAULT_LANGUAGE, SubjectId};
use recap_store::{ArtifactRepository, Notifier};
use tracing::{debug, info, warn};

use crate::host::HostPage;
use crate::title::resolve_title;
use crate::watcher::SubjectHandler;

/// Outcome of one [`ExtractionCoordinator::process`] call.
#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    /// Another cycle was running; the call was dropped.
    Busy,
    /// The subject matches the last attempted one; the call was dropped.
    Skipped,
    /// The store already held an artifact; it was re-announced without a fetch.
    Reused(Artifact),
    /// A fresh artifact was fetched and committed.
    Committed(Artifact),
    /// The fetch failed; nothing was committed.
    Failed,
}

impl CycleOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Skipped => "skipped",
            Self::Reused(_) => "reused",
            Self::Committed(_) => "committed",
            Self::Failed => "failed",
        }
    }
}

/// Single-slot reentrancy guard state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InFlight {
    /// Whether a cycle is running.
    pub busy: bool,
    /// Subject of the running cycle.
    pub subject_id: Option<SubjectId>,
}

#[derive(Default)]
struct GuardState {
    in_flight: InFlight,
    last_attempted: Option<SubjectId>,
}

/// Resets the in-flight slot on every exit path, including panics and
/// dropped futures.
struct BusyGuard<'a> {
    state: &'a Mutex<GuardState>,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().in_flight = InFlight::default();
    }
}

/// Fetches and commits artifacts in the background.
pub struct ExtractionCoordinator {
    service: Arc<dyn TranscriptService>,
    page: Arc<dyn HostPage>,
    repo: ArtifactRepository,
    notifier: Arc<dyn Notifier>,
    language: String,
    state: Mutex<GuardState>,
}

impl ExtractionCoordinator {
    /// Create an idle coordinator.
    pub fn new(
        service: Arc<dyn TranscriptService>,
        page: Arc<dyn HostPage>,
        repo: ArtifactRepository,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            service,
            page,
            repo,
            notifier,
            language: DEFAULT_LANGUAGE.to_string(),
            state: Mutex::new(GuardState::default()),
        }
    }

    /// Stamp committed artifacts with `language` instead of the default.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Snapshot of the in-flight slot.
    pub fn in_flight(&self) -> InFlight {
        self.state.lock().in_flight.clone()
    }

    /// Subject of the last started cycle.
    pub fn last_attempted(&self) -> Option<SubjectId> {
        self.state.lock().last_attempted.clone()
    }

    /// Forget the last attempted subject so it can be processed again.
    pub fn reset(&self) {
        self.state.lock().last_attempted = None;
    }

    /// Run one extraction cycle for `subject_id`, unless dropped.
    #[tracing::instrument(skip_all, fields(subject_id = %subject_id))]
    pub async fn process(&self, subject_id: SubjectId) -> CycleOutcome {
        let outcome = match self.try_acquire(&subject_id) {
            Ok(guard) => {
                let outcome = self.run_cycle(&subject_id).await;
                drop(guard);
                outcome
            }
            Err(dropped) => dropped,
        };
        counter!("recap_cycle_total", "path" => "background", "outcome" => outcome.label())
            .increment(1);
        outcome
    }

    /// Check and claim the slot in one critical section.
    fn try_acquire(&self, subject_id: &SubjectId) -> Result<BusyGuard<'_>, CycleOutcome> {
        let mut state = self.state.lock();
        if state.in_flight.busy {
            debug!(running = ?state.in_flight.subject_id, "cycle in flight, dropping trigger");
            return Err(CycleOutcome::Busy);
        }
        if state.last_attempted.as_ref() == Some(subject_id) {
            debug!("subject already attempted, skipping");
            return Err(CycleOutcome::Skipped);
        }
        state.in_flight = InFlight {
            busy: true,
            subject_id: Some(subject_id.clone()),
        };
        state.last_attempted = Some(subject_id.clone());
        Ok(BusyGuard { state: &self.state })
    }

    async fn run_cycle(&self, subject_id: &SubjectId) -> CycleOutcome {
        if let Err(e) = self.repo.mark_current(subject_id).await {
            warn!(error = %e, "failed to update current pointer");
        }

        match self.repo.load(subject_id).await {
            Ok(Some(artifact)) => {
                debug!("artifact already stored, re-announcing");
                if let Err(e) = self.repo.commit(&artifact).await {
                    warn!(error = %e, "failed to re-commit stored artifact");
                }
                self.announce(&artifact).await;
                return CycleOutcome::Reused(artifact);
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "store read failed, fetching anyway"),
        }

        let segments = match self.service.transcript(subject_id).await {
            Ok(segments) => segments.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "transcript fetch failed");
                return CycleOutcome::Failed;
            }
        };
        let title = resolve_title(self.page.as_ref()).await;
        let artifact = Artifact::new(subject_id.clone(), title, segments)
            .with_language(self.language.clone());

        if let Err(e) = self.repo.commit(&artifact).await {
            warn!(error = %e, "failed to commit artifact");
            return CycleOutcome::Failed;
        }
        info!(
            segments = artifact.segments.len(),
            title = %artifact.title,
            "artifact primed"
        );
        self.announce(&artifact).await;
        CycleOutcome::Committed(artifact)
    }

    async fn announce(&self, artifact: &Artifact) {
        match self.notifier.send(ArtifactEvent::ready(artifact.clone())).await {
            Ok(ack) => debug!(delivered = ack.delivered, "artifact announced"),
            Err(e) => warn!(error = %e, "failed to announce artifact"),
        }
    }
}

#[async_trait]
impl SubjectHandler for ExtractionCoordinator {
    async fn subject_changed(&self, subject_id: SubjectId) {
        let _ = self.process(subject_id).await;
    }

    fn subject_cleared(&self) {
        self.reset();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
