use depot_types::RepoPath;

/// Errors from storage backend operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend cannot accept writes.
    #[error("store is read-only")]
    ReadOnly,

    /// Declared size disagrees with the content handed to the backend.
    #[error("size mismatch for {path}: declared {declared}, received {received}")]
    SizeMismatch {
        path: RepoPath,
        declared: u64,
        received: u64,
    },

    /// Stored data could not be decoded.
    #[error("corrupt entry {path}: {reason}")]
    Corrupt { path: RepoPath, reason: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
