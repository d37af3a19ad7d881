//! # recap-settings
//!
//! Configuration management with layered sources for the Recap pipeline.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`RecapSettings::default()`]
//! 2. **User file**: `~/.recap/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `RECAP_*` overrides (highest priority)
//!
//! The global snapshot is replaceable: [`init_settings`] and
//! [`reload_settings_from_path`] swap the cached value so every later
//! [`get_settings`] call sees the new one.
//!
//! # Usage
//!
//! ```no_run
//! use recap_settings::get_settings;
//!
//! let settings = get_settings();
//! println!("transcript endpoint: {}", settings.api.transcript_url("abc12345678"));
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, load_settings, load_settings_from_path, recap_home,
    settings_path,
};
pub use types::*;

use std::path::Path;
use std::sync::{Arc, RwLock};

/// Global settings snapshot.
static SETTINGS: RwLock<Option<Arc<RecapSettings>>> = RwLock::new(None);

/// Get the global settings instance.
///
/// On first call, loads from `~/.recap/settings.json` with env overrides.
/// If loading fails, compiled defaults are cached instead.
pub fn get_settings() -> Arc<RecapSettings> {
    {
        let guard = SETTINGS.read().expect("settings lock poisoned");
        if let Some(ref s) = *guard {
            return Arc::clone(s);
        }
    }

    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    // Another thread may have initialized while we waited for the write lock
    if let Some(ref s) = *guard {
        return Arc::clone(s);
    }

    let settings = Arc::new(match load_settings() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            RecapSettings::default()
        }
    });
    *guard = Some(Arc::clone(&settings));
    settings
}

/// Replace the global settings with a specific value.
pub fn init_settings(settings: RecapSettings) {
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    *guard = Some(Arc::new(settings));
}

/// Reload settings from `path` and swap the global snapshot.
///
/// Falls back to defaults (not the previous value) when the file is
/// unreadable.
pub fn reload_settings_from_path(path: &Path) -> Arc<RecapSettings> {
    let new = Arc::new(match load_settings_from_path(path) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, ?path, "failed to reload settings, falling back to defaults");
            RecapSettings::default()
        }
    });
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    *guard = Some(Arc::clone(&new));
    tracing::info!(?path, "settings reloaded");
    new
}

#[cfg(test)]
pub(crate) fn reset_settings() {
    let mut guard = SETTINGS.write().expect("settings lock poisoned");
    *guard = None;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
