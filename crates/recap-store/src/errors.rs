//! Store and notifier errors.

/// Errors raised by a key/value backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backing file could not be read or written.
    #[error("store I/O error at {path}: {source}")]
    Io {
        /// Backing file.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A value could not be encoded.
    #[error("store serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// The backing file exists but is not a JSON object.
    #[error("store file {path} is corrupt: {message}")]
    Corrupt {
        /// Backing file.
        path: String,
        /// What was wrong.
        message: String,
    },
}

/// Errors raised when broadcasting to other contexts.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The channel has been shut down.
    #[error("notifier channel closed")]
    Closed,
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, StoreError>;
