//! Fetch errors.
//!
//! Only transport-level failures are errors. A well-formed response that
//! reports no data is `Ok(None)` at the call site, never a variant here.

use std::time::Duration;

/// Transport-level failure of a remote fetch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout.
    #[error("{op} request timed out after {}ms", after.as_millis())]
    Timeout {
        /// Operation name (`transcript`, `summary`, `health`).
        op: &'static str,
        /// Configured bound.
        after: Duration,
    },

    /// Connection refused, DNS failure, reset, or similar.
    #[error("{op} request failed: {message}")]
    Transport {
        /// Operation name.
        op: &'static str,
        /// Underlying error text.
        message: String,
    },

    /// The service answered 2xx with a body that does not decode.
    #[error("malformed {op} response: {message}")]
    Malformed {
        /// Operation name.
        op: &'static str,
        /// Decoder error text.
        message: String,
    },
}

impl FetchError {
    /// Whether this failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Classify a `reqwest` error for `op`.
    pub(crate) fn from_reqwest(op: &'static str, after: Duration, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { op, after }
        } else if err.is_decode() {
            Self::Malformed {
                op,
                message: err.to_string(),
            }
        } else {
            Self::Transport {
                op,
                message: err.to_string(),
            }
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, FetchError>;
