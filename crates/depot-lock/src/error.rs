use std::time::Duration;

use depot_types::RepoPath;

use crate::table::LockMode;

/// Errors from lock acquisition.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    /// The lock stayed contended for the whole wait budget.
    #[error("timed out after {waited:?} waiting for {mode} lock on {path}")]
    Timeout {
        path: RepoPath,
        mode: LockMode,
        waited: Duration,
    },
}

/// Result alias for lock operations.
pub type LockResult<T> = Result<T, LockError>;
