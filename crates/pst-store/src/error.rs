use std::path::PathBuf;

/// Errors from table store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding the in-memory tables was poisoned by a panic.
    #[error("store lock poisoned: {0}")]
    LockPoisoned(String),

    /// The write-ahead log could not be opened at the given path.
    #[error("write-ahead log unavailable at {path}: {reason}")]
    LogUnavailable { path: PathBuf, reason: String },
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
