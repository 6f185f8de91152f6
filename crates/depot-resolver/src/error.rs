use depot_lock::LockError;
use depot_repo::RepoError;
use depot_store::StoreError;
use depot_types::RepoPath;

/// Coarse classification of a [`ResolveError`], for front ends that map
/// outcomes to transport status codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    PathRejected,
    NotFound,
    RemoteTransient,
    RejectedByPolicy,
    Configuration,
    Storage,
    Timeout,
}

/// Errors from resolution, retrieval and deploys.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No repository is registered under the key.
    #[error("unknown repository: {0}")]
    UnknownRepository(String),

    /// The repository's include/exclude filter refused the path.
    #[error("path rejected by repository filter: {0}")]
    PathRejected(RepoPath),

    /// The repository does not accept deployments.
    #[error("repository {0} is not deployable")]
    NotDeployable(String),

    /// The artifact does not exist.
    #[error("not found: {0}")]
    NotFound(RepoPath),

    /// The origin failed transiently (now, or within the error TTL).
    #[error("remote failure for {path}: {message}")]
    RemoteTransient { path: RepoPath, message: String },

    /// A checksum policy refused the content.
    #[error("checksum policy rejected {path}: {reason}")]
    RejectedByPolicy { path: RepoPath, reason: String },

    /// Invalid repository configuration.
    #[error(transparent)]
    Configuration(#[from] RepoError),

    /// The storage backend failed. Never cached as a retrieval outcome.
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// A contended path lock was not granted in time.
    #[error(transparent)]
    LockTimeout(#[from] LockError),

    /// A cache listener failed after commit.
    #[error("listener failed: {0}")]
    Listener(String),
}

impl ResolveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownRepository(_) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::PathRejected(_) | Self::NotDeployable(_) => ErrorKind::PathRejected,
            Self::RemoteTransient { .. } => ErrorKind::RemoteTransient,
            Self::RejectedByPolicy { .. } => ErrorKind::RejectedByPolicy,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Storage(_) | Self::Listener(_) => ErrorKind::Storage,
            Self::LockTimeout(_) => ErrorKind::Timeout,
        }
    }

    /// Negative results a virtual repository moves past to its next member.
    pub(crate) fn is_member_miss(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NotFound
                | ErrorKind::PathRejected
                | ErrorKind::RemoteTransient
                | ErrorKind::RejectedByPolicy
        )
    }
}

/// Result alias for resolver operations.
pub type ResolveResult<T> = Result<T, ResolveError>;
