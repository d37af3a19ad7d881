//! Remote service settings.

use serde::{Deserialize, Serialize};

/// Where the transcript/summary service lives and how long to wait for it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiSettings {
    /// Scheme and host, without port (e.g. `http://localhost`).
    pub base_url: String,
    /// TCP port the service listens on.
    pub port: u16,
    /// Path prefix of the transcript endpoint.
    pub transcript_path: String,
    /// Path prefix of the summary endpoint.
    pub summary_path: String,
    /// Path of the health endpoint.
    pub health_path: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            port: 5123,
            transcript_path: "/transcript".to_string(),
            summary_path: "/summary".to_string(),
            health_path: "/health".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl ApiSettings {
    /// Service root, `base_url:port`.
    pub fn api_url(&self) -> String {
        format!("{}:{}", self.base_url.trim_end_matches('/'), self.port)
    }

    /// Full transcript URL for a subject.
    pub fn transcript_url(&self, subject_id: &str) -> String {
        format!("{}{}/{subject_id}", self.api_url(), self.transcript_path)
    }

    /// Full summary URL for a subject.
    pub fn summary_url(&self, subject_id: &str) -> String {
        format!("{}{}/{subject_id}", self.api_url(), self.summary_path)
    }

    /// Full health-check URL.
    pub fn health_url(&self) -> String {
        format!("{}{}", self.api_url(), self.health_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_urls() {
        let api = ApiSettings::default();
        assert_eq!(api.api_url(), "http://localhost:5123");
        assert_eq!(
            api.transcript_url("abc12345678"),
            "http://localhost:5123/transcript/abc12345678"
        );
        assert_eq!(
            api.summary_url("abc12345678"),
            "http://localhost:5123/summary/abc12345678"
        );
        assert_eq!(api.health_url(), "http://localhost:5123/health");
    }

    #[test]
    fn trailing_slash_on_base_is_ignored() {
        let api = ApiSettings {
            base_url: "http://example.com/".into(),
            port: 80,
            ..ApiSettings::default()
        };
        assert_eq!(api.api_url(), "http://example.com:80");
    }

    #[test]
    fn camel_case_fields() {
        let json = serde_json::to_value(ApiSettings::default()).unwrap();
        assert!(json.get("baseUrl").is_some());
        assert!(json.get("timeoutMs").is_some());
        assert!(json.get("transcriptPath").is_some());
    }
}
