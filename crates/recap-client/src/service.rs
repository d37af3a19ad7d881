//! Remote fetch trait and wire envelopes.

use async_trait::async_trait;
use recap_core::{Segment, SubjectId, Summary};
use serde::Deserialize;

use crate::errors::Result;

/// Read-only access to the transcript/summary service.
///
/// Each call is a single bounded attempt. `Ok(None)` means the service
/// answered but has nothing for the subject; `Err` means the answer never
/// arrived or could not be understood.
#[async_trait]
pub trait TranscriptService: Send + Sync {
    /// Fetch the timed transcript for a subject.
    async fn transcript(&self, subject_id: &SubjectId) -> Result<Option<Vec<Segment>>>;

    /// Fetch the generated summary for a subject.
    async fn summary(&self, subject_id: &SubjectId) -> Result<Option<Summary>>;
}

/// `GET /transcript/{id}` response body.
#[derive(Debug, Deserialize)]
pub struct TranscriptEnvelope {
    /// Whether the service produced a transcript.
    pub success: bool,
    /// Transcript lines, when successful.
    #[serde(default)]
    pub transcript: Option<Vec<Segment>>,
}

impl TranscriptEnvelope {
    /// Collapse the envelope into "data or no data".
    pub fn into_segments(self) -> Option<Vec<Segment>> {
        if self.success { self.transcript } else { None }
    }
}

/// `GET /summary/{id}` response body.
#[derive(Debug, Deserialize)]
pub struct SummaryEnvelope {
    /// Whether the service produced a summary.
    pub success: bool,
    /// The summary, when successful.
    #[serde(default)]
    pub summary: Option<Summary>,
}

impl SummaryEnvelope {
    /// Collapse the envelope into "data or no data".
    pub fn into_summary(self) -> Option<Summary> {
        if self.success { self.summary } else { None }
    }
}
