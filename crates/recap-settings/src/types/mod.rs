//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` and implement
//! [`Default`] with production values. Every struct is `#[serde(default)]`
//! so partial JSON files only need to name the fields they change.

mod api;

pub use api::*;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root settings type.
///
/// # JSON Format
///
/// ```json
/// {
///   "api": { "port": 8000, "timeoutMs": 5000 },
///   "watcher": { "settleDelayMs": 1500 },
///   "logging": { "level": "debug" }
/// }
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecapSettings {
    /// Remote service location and timeout.
    pub api: ApiSettings,
    /// Navigation watcher timing.
    pub watcher: WatcherSettings,
    /// Shared artifact store location.
    pub store: StoreSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Locale tag stamped on every artifact.
    pub language: String,
}

impl Default for RecapSettings {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            watcher: WatcherSettings::default(),
            store: StoreSettings::default(),
            logging: LoggingSettings::default(),
            language: "en".to_string(),
        }
    }
}

impl RecapSettings {
    /// Correct values that would wedge the pipeline.
    ///
    /// Called automatically during loading. A zero timeout would fail every
    /// fetch instantly and a zero poll interval would spin, so both are
    /// reset to their defaults with a warning.
    pub fn validate(&mut self) {
        if self.api.timeout_ms == 0 {
            let fallback = ApiSettings::default().timeout_ms;
            tracing::warn!("api timeout_ms is 0, using {fallback}");
            self.api.timeout_ms = fallback;
        }
        if self.watcher.player_poll_interval_ms == 0 {
            let fallback = WatcherSettings::default().player_poll_interval_ms;
            tracing::warn!("watcher player_poll_interval_ms is 0, using {fallback}");
            self.watcher.player_poll_interval_ms = fallback;
        }
        if self.language.trim().is_empty() {
            tracing::warn!("empty language tag, using \"en\"");
            self.language = "en".to_string();
        }
    }

    /// Remote request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.timeout_ms)
    }
}

/// Timing of the navigation watcher.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatcherSettings {
    /// Wait after each navigation signal before resolving the subject.
    pub settle_delay_ms: u64,
    /// Wait after activation before the first resolution.
    pub initial_delay_ms: u64,
    /// Interval between checks for the media player element.
    pub player_poll_interval_ms: u64,
    /// Wait after activation before the first player check.
    pub player_poll_start_ms: u64,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: 2000,
            initial_delay_ms: 2000,
            player_poll_interval_ms: 1000,
            player_poll_start_ms: 1000,
        }
    }
}

/// Location of the persisted artifact store.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// JSON file backing the shared store.
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            path: crate::loader::recap_home().join("artifacts.json"),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
