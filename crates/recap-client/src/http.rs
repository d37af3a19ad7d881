//! `reqwest`-backed [`TranscriptService`].

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use recap_core::{Segment, SubjectId, Summary};
use recap_settings::ApiSettings;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::errors::{FetchError, Result};
use crate::service::{SummaryEnvelope, TranscriptEnvelope, TranscriptService};

/// HTTP client for the transcript/summary service.
///
/// Every request carries its own timeout so one slow endpoint cannot
/// hold up the other. No retries: an absent result is a valid outcome.
#[derive(Clone)]
pub struct HttpTranscriptService {
    client: reqwest::Client,
    api: ApiSettings,
    timeout: Duration,
}

impl HttpTranscriptService {
    /// Create a client for the configured service.
    pub fn new(api: ApiSettings) -> Self {
        Self::with_client(api, reqwest::Client::new())
    }

    /// Create a client reusing an existing `reqwest::Client`.
    pub fn with_client(api: ApiSettings, client: reqwest::Client) -> Self {
        let timeout = Duration::from_millis(api.timeout_ms);
        Self {
            client,
            api,
            timeout,
        }
    }

    /// Configured per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe `GET /health`.
    ///
    /// `Ok(true)` only when the service answers 2xx with `status: "healthy"`.
    /// Any answer that is not a health document counts as unhealthy.
    #[tracing::instrument(skip_all)]
    pub async fn health(&self) -> Result<bool> {
        #[derive(Deserialize)]
        struct Health {
            #[serde(default)]
            status: String,
        }

        match self.get_json::<Health>("health", &self.api.health_url()).await {
            Ok(body) => Ok(body.is_some_and(|h| h.status == "healthy")),
            Err(FetchError::Malformed { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Issue a bounded GET and decode the body.
    ///
    /// A 2xx body decodes to `Some`. A non-2xx answer must still carry the
    /// service's own JSON envelope, in which case it maps to `Ok(None)`.
    /// Anything else (gateway pages, empty bodies) is `Malformed`.
    async fn get_json<T: DeserializeOwned>(&self, op: &'static str, url: &str) -> Result<Option<T>> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.fail(op, &e))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.fail(op, &e))?;
        match serde_json::from_slice::<T>(&bytes) {
            Ok(body) if status.is_success() => Ok(Some(body)),
            Ok(_) => {
                debug!(op, status = status.as_u16(), "service reported failure");
                Ok(None)
            }
            Err(e) => {
                counter!("recap_fetch_total", "op" => op, "outcome" => "malformed").increment(1);
                warn!(op, status = status.as_u16(), error = %e, "undecodable response body");
                Err(FetchError::Malformed {
                    op,
                    message: format!("HTTP {}: {e}", status.as_u16()),
                })
            }
        }
    }

    fn fail(&self, op: &'static str, err: &reqwest::Error) -> FetchError {
        let error = FetchError::from_reqwest(op, self.timeout, err);
        let outcome = if error.is_timeout() { "timeout" } else { "transport" };
        counter!("recap_fetch_total", "op" => op, "outcome" => outcome).increment(1);
        warn!(op, error = %error, "request failed");
        error
    }
}

#[async_trait]
impl TranscriptService for HttpTranscriptService {
    #[tracing::instrument(skip_all, fields(subject_id = %subject_id))]
    async fn transcript(&self, subject_id: &SubjectId) -> Result<Option<Vec<Segment>>> {
        let url = self.api.transcript_url(subject_id.as_str());
        let segments = self
            .get_json::<TranscriptEnvelope>("transcript", &url)
            .await?
            .and_then(TranscriptEnvelope::into_segments);
        let outcome = if segments.is_some() { "ok" } else { "empty" };
        counter!("recap_fetch_total", "op" => "transcript", "outcome" => outcome).increment(1);
        debug!(count = segments.as_ref().map_or(0, Vec::len), "transcript fetched");
        Ok(segments)
    }

    #[tracing::instrument(skip_all, fields(subject_id = %subject_id))]
    async fn summary(&self, subject_id: &SubjectId) -> Result<Option<Summary>> {
        let url = self.api.summary_url(subject_id.as_str());
        let summary = self
            .get_json::<SummaryEnvelope>("summary", &url)
            .await?
            .and_then(SummaryEnvelope::into_summary);
        let outcome = if summary.is_some() { "ok" } else { "empty" };
        counter!("recap_fetch_total", "op" => "summary", "outcome" => outcome).increment(1);
        Ok(summary)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
