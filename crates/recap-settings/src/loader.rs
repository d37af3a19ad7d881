//! Layered settings loading.
//!
//! Compiled defaults, then the JSON file deep-merged on top, then
//! `RECAP_*` environment overrides.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::errors::{Result, SettingsError};
use crate::types::RecapSettings;

/// Directory holding settings and the default artifact store.
///
/// `$RECAP_HOME` when set, else `$HOME/.recap`, else `./.recap`.
pub fn recap_home() -> PathBuf {
    if let Ok(dir) = std::env::var("RECAP_HOME") {
        return PathBuf::from(dir);
    }
    std::env::var("HOME").map_or_else(|_| PathBuf::from(".recap"), |h| PathBuf::from(h).join(".recap"))
}

/// Default settings file location.
pub fn settings_path() -> PathBuf {
    recap_home().join("settings.json")
}

/// Recursively merge `overlay` into `base`.
///
/// Objects merge key by key; any other value in `overlay` replaces the
/// value in `base`. `null` in the overlay is ignored so a file can leave a
/// key unset explicitly.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                let _ = base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}

/// Load settings from the default path with env overrides.
pub fn load_settings() -> Result<RecapSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path` with env overrides.
///
/// A missing file is not an error: defaults plus env overrides are used.
pub fn load_settings_from_path(path: &Path) -> Result<RecapSettings> {
    let defaults = serde_json::to_value(RecapSettings::default())?;
    let merged = match std::fs::read_to_string(path) {
        Ok(raw) => {
            let user: Value = serde_json::from_str(&raw)?;
            deep_merge(defaults, user)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(?path, "no settings file, using defaults");
            defaults
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.display().to_string(),
                source,
            });
        }
    };
    let mut settings: RecapSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    settings.validate();
    Ok(settings)
}

/// Apply `RECAP_*` overrides read through `lookup`.
///
/// Takes a lookup function rather than reading the process environment
/// directly so tests can supply values without mutating global state.
pub fn apply_env_overrides(
    settings: &mut RecapSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(v) = lookup("RECAP_API_BASE_URL") {
        settings.api.base_url = v;
    }
    if let Some(v) = lookup("RECAP_API_PORT") {
        settings.api.port = parse_env("RECAP_API_PORT", v)?;
    }
    if let Some(v) = lookup("RECAP_API_TIMEOUT_MS") {
        settings.api.timeout_ms = parse_env("RECAP_API_TIMEOUT_MS", v)?;
    }
    if let Some(v) = lookup("RECAP_SETTLE_DELAY_MS") {
        settings.watcher.settle_delay_ms = parse_env("RECAP_SETTLE_DELAY_MS", v)?;
    }
    if let Some(v) = lookup("RECAP_STORE_PATH") {
        settings.store.path = PathBuf::from(v);
    }
    if let Some(v) = lookup("RECAP_LOG_LEVEL") {
        settings.logging.level = v;
    }
    Ok(())
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::Env { var, value })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
