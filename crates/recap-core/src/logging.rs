//! Tracing subscriber bootstrap.
//!
//! Binaries call [`init_logging`] once at startup. `RUST_LOG` takes
//! precedence over the configured level so a single run can be made
//! noisier without editing settings.

use std::sync::Once;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

/// Output format for log lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

static INIT: Once = Once::new();

/// Build the filter for a configured level, honoring `RUST_LOG` when set.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber. Later calls are no-ops.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
pub fn init_logging(level: &str, format: LogFormat) {
    INIT.call_once(|| {
        let filter = build_filter(level);
        let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);
        let result = match format {
            LogFormat::Pretty => builder.with_target(false).try_init(),
            LogFormat::Json => builder.json().try_init(),
        };
        if let Err(e) = result {
            eprintln!("tracing subscriber already installed: {e}");
        }
    });
}
