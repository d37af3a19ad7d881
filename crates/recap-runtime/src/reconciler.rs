//! Read-path reconciler.
//!
//! Drives the on-demand surface: resolve the subject from the active page,
//! serve the stored artifact when there is one, otherwise fetch, commit and
//! serve a fresh one. State changes are published on a `watch` channel.
//!
//! ```text
//! loading ─┬─> ready
//!          ├─> unavailable
//!          ├─> failed ──retry──> loading
//!          └─> no-subject
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use metrics::counter;
use recap_client::TranscriptService;
use recap_core::{Artifact, ArtifactEvent, DEFAULT_LANGUAGE, SubjectId};
use recap_store::{ArtifactRepository, Notifier};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::errors::{HostError, ReconcileError};
use crate::host::HostPage;
use crate::resolver::resolve_subject;
use crate::title::resolve_title;

/// What the surface is showing.
#[derive(Clone, Debug, PartialEq)]
pub enum ReadState {
    /// A cycle is running.
    Loading,
    /// A transcript is available.
    Ready(Artifact),
    /// The service has no transcript for this subject.
    Unavailable {
        /// The subject that was looked up.
        subject_id: SubjectId,
        /// Its resolved title.
        title: String,
    },
    /// The transcript fetch failed. Retry is available.
    Failed {
        /// The subject that was looked up.
        subject_id: SubjectId,
        /// Human-readable cause.
        message: String,
    },
    /// The active page addresses no subject.
    NoSubject,
}

impl ReadState {
    /// Short state name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready(_) => "ready",
            Self::Unavailable { .. } => "unavailable",
            Self::Failed { .. } => "failed",
            Self::NoSubject => "no-subject",
        }
    }

    /// Whether the state ends a cycle.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading)
    }

    fn from_artifact(artifact: Artifact) -> Self {
        if artifact.has_transcript() {
            Self::Ready(artifact)
        } else {
            Self::Unavailable {
                subject_id: artifact.subject_id,
                title: artifact.title,
            }
        }
    }
}

/// Clears the in-flight flag when a cycle ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// State machine behind the on-demand surface.
pub struct ReadPathReconciler {
    service: Arc<dyn TranscriptService>,
    page: Arc<dyn HostPage>,
    repo: ArtifactRepository,
    notifier: Option<Arc<dyn Notifier>>,
    language: String,
    state: watch::Sender<ReadState>,
    running: AtomicBool,
}

impl ReadPathReconciler {
    /// Create a reconciler in the `loading` state.
    pub fn new(
        service: Arc<dyn TranscriptService>,
        page: Arc<dyn HostPage>,
        repo: ArtifactRepository,
    ) -> Self {
        let (state, _) = watch::channel(ReadState::Loading);
        Self {
            service,
            page,
            repo,
            notifier: None,
            language: DEFAULT_LANGUAGE.to_string(),
            state,
            running: AtomicBool::new(false),
        }
    }

    /// Announce artifacts this reconciler commits.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Stamp committed artifacts with `language` instead of the default.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Current state.
    pub fn state(&self) -> ReadState {
        self.state.borrow().clone()
    }

    /// Observe every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ReadState> {
        self.state.subscribe()
    }

    /// Run the read path for the active page and return its terminal state.
    ///
    /// An activation while a cycle is running returns the current state
    /// without starting a second cycle.
    pub async fn activate(&self) -> ReadState {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("read cycle already running");
            return self.state();
        }
        let _guard = CycleGuard(&self.running);

        self.publish(ReadState::Loading);
        let next = self.reconcile().await;
        counter!("recap_cycle_total", "path" => "read", "outcome" => next.name()).increment(1);
        self.publish(next.clone());
        next
    }

    /// Re-run the whole read path after a failure.
    pub async fn retry(&self) -> Result<ReadState, ReconcileError> {
        let current = self.state();
        if !matches!(current, ReadState::Failed { .. }) {
            return Err(ReconcileError::RetryNotAvailable {
                state: current.name(),
            });
        }
        info!("retrying read path");
        Ok(self.activate().await)
    }

    /// Seek the page's media element to `offset_seconds`.
    pub async fn seek_to(&self, offset_seconds: f64) -> Result<(), HostError> {
        self.page.set_current_time(offset_seconds).await
    }

    fn publish(&self, next: ReadState) {
        debug!(state = next.name(), "read state");
        let _ = self.state.send_replace(next);
    }

    #[tracing::instrument(skip_all)]
    async fn reconcile(&self) -> ReadState {
        let location = match self.page.location().await {
            Ok(location) => location,
            Err(e) => {
                debug!(error = %e, "no active page");
                return ReadState::NoSubject;
            }
        };
        let Some(subject_id) = resolve_subject(&location) else {
            return ReadState::NoSubject;
        };

        let stored = match self.repo.load(&subject_id).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(subject_id = %subject_id, error = %e, "store read failed, treating as miss");
                None
            }
        };

        match stored {
            Some(artifact) if artifact.subject_id == subject_id => self.serve_cached(artifact).await,
            _ => self.fetch_fresh(subject_id).await,
        }
    }

    /// Cache hit. A missing summary is fetched once more and merged in.
    async fn serve_cached(&self, artifact: Artifact) -> ReadState {
        debug!(subject_id = %artifact.subject_id, "cache hit");
        if artifact.summary.is_some() || !artifact.has_transcript() {
            return ReadState::from_artifact(artifact);
        }

        match self.service.summary(&artifact.subject_id).await {
            Ok(Some(summary)) => {
                let enriched = artifact.with_summary(Some(summary));
                self.commit(&enriched).await;
                ReadState::from_artifact(enriched)
            }
            Ok(None) => ReadState::from_artifact(artifact),
            Err(e) => {
                debug!(error = %e, "summary enrichment failed");
                ReadState::from_artifact(artifact)
            }
        }
    }

    /// Cache miss: title, transcript, summary, commit.
    async fn fetch_fresh(&self, subject_id: SubjectId) -> ReadState {
        debug!(subject_id = %subject_id, "cache miss");
        let title = resolve_title(self.page.as_ref()).await;

        let segments = match self.service.transcript(&subject_id).await {
            Ok(Some(segments)) if !segments.is_empty() => segments,
            Ok(_) => {
                let empty = Artifact::new(subject_id, title, Vec::new())
                    .with_language(self.language.clone());
                self.commit(&empty).await;
                return ReadState::from_artifact(empty);
            }
            Err(e) => {
                warn!(subject_id = %subject_id, error = %e, "transcript fetch failed");
                return ReadState::Failed {
                    subject_id,
                    message: e.to_string(),
                };
            }
        };

        let summary = match self.service.summary(&subject_id).await {
            Ok(summary) => summary,
            Err(e) => {
                debug!(error = %e, "summary unavailable");
                None
            }
        };

        let artifact = Artifact::new(subject_id, title, segments)
            .with_summary(summary)
            .with_language(self.language.clone());
        self.commit(&artifact).await;
        ReadState::from_artifact(artifact)
    }

    async fn commit(&self, artifact: &Artifact) {
        if let Err(e) = self.repo.commit(artifact).await {
            warn!(subject_id = %artifact.subject_id, error = %e, "failed to commit artifact");
            return;
        }
        if let Some(notifier) = &self.notifier
            && let Err(e) = notifier.send(ArtifactEvent::ready(artifact.clone())).await
        {
            warn!(error = %e, "failed to announce artifact");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
