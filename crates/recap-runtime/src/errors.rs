//! Runtime errors.

/// Failure of a host-page operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HostError {
    /// No playable media element exists on the page.
    #[error("video player not found")]
    MediaNotFound,

    /// The page context is gone (closed, reloaded, or never attached).
    #[error("page context unavailable: {0}")]
    Detached(String),

    /// A DOM query could not be evaluated.
    #[error("invalid query {selector:?}: {message}")]
    Query {
        /// The selector that failed.
        selector: String,
        /// Why it failed.
        message: String,
    },
}

/// Misuse of the read-path state machine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    /// Retry was requested from a state other than `failed`.
    #[error("retry is only available from the failed state (current: {state})")]
    RetryNotAvailable {
        /// Name of the state at the time of the request.
        state: &'static str,
    },
}
