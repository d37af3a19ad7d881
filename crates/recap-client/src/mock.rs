//! Scripted [`TranscriptService`] for tests.
//!
//! Responses are keyed by subject and every call is recorded, so tests can
//! assert exactly which network calls a component made.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use recap_core::{Segment, SubjectId, Summary};

use crate::errors::{FetchError, Result};
use crate::service::TranscriptService;

/// Which remote operation a recorded call hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchOp {
    /// `GET /transcript/{id}`
    Transcript,
    /// `GET /summary/{id}`
    Summary,
}

/// Canned outcome of one operation.
#[derive(Clone, Debug)]
pub enum Scripted<T> {
    /// Service returned data.
    Data(T),
    /// Service answered with no data.
    Empty,
    /// Request timed out.
    Timeout,
    /// Connection failed.
    Down,
    /// Service answered with a body that is not its envelope.
    Malformed,
}

impl<T: Clone> Scripted<T> {
    fn resolve(&self, op: &'static str) -> Result<Option<T>> {
        match self {
            Self::Data(v) => Ok(Some(v.clone())),
            Self::Empty => Ok(None),
            Self::Timeout => Err(FetchError::Timeout {
                op,
                after: Duration::from_secs(10),
            }),
            Self::Down => Err(FetchError::Transport {
                op,
                message: "connection refused".into(),
            }),
            Self::Malformed => Err(FetchError::Malformed {
                op,
                message: "HTTP 502: expected value at line 1 column 1".into(),
            }),
        }
    }
}

#[derive(Default)]
struct Script {
    transcripts: HashMap<SubjectId, Scripted<Vec<Segment>>>,
    summaries: HashMap<SubjectId, Scripted<Summary>>,
    calls: Vec<(FetchOp, SubjectId)>,
}

/// Mock service with per-subject scripted answers.
///
/// Unscripted subjects answer `Empty`. An optional latency is applied with
/// `tokio::time::sleep` so tests running on paused time can interleave
/// calls deterministically.
#[derive(Default)]
pub struct MockTranscriptService {
    script: Mutex<Script>,
    latency: Mutex<Option<Duration>>,
}

impl MockTranscriptService {
    /// Create a mock where every subject answers `Empty`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the transcript outcome for a subject.
    pub fn set_transcript(&self, id: &SubjectId, outcome: Scripted<Vec<Segment>>) {
        let _ = self.script.lock().transcripts.insert(id.clone(), outcome);
    }

    /// Script the summary outcome for a subject.
    pub fn set_summary(&self, id: &SubjectId, outcome: Scripted<Summary>) {
        let _ = self.script.lock().summaries.insert(id.clone(), outcome);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<(FetchOp, SubjectId)> {
        self.script.lock().calls.clone()
    }

    /// Number of calls of `op` made so far.
    pub fn count(&self, op: FetchOp) -> usize {
        self.script.lock().calls.iter().filter(|(o, _)| *o == op).count()
    }

    async fn delay(&self) {
        let latency = *self.latency.lock();
        if let Some(d) = latency {
            tokio::time::sleep(d).await;
        }
    }
}

#[async_trait]
impl TranscriptService for MockTranscriptService {
    async fn transcript(&self, subject_id: &SubjectId) -> Result<Option<Vec<Segment>>> {
        self.script
            .lock()
            .calls
            .push((FetchOp::Transcript, subject_id.clone()));
        self.delay().await;
        let outcome = self.script.lock().transcripts.get(subject_id).cloned();
        outcome.unwrap_or(Scripted::Empty).resolve("transcript")
    }

    async fn summary(&self, subject_id: &SubjectId) -> Result<Option<Summary>> {
        self.script
            .lock()
            .calls
            .push((FetchOp::Summary, subject_id.clone()));
        self.delay().await;
        let outcome = self.script.lock().summaries.get(subject_id).cloned();
        outcome.unwrap_or(Scripted::Empty).resolve("summary")
    }
}
