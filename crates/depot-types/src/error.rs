use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid repository path: {0}")]
    InvalidRepoPath(String),

    #[error("invalid repository key: {0:?}")]
    InvalidRepoKey(String),

    #[error("unknown checksum algorithm: {0}")]
    UnknownChecksumType(String),

    #[error("invalid {algorithm} checksum: {value:?}")]
    InvalidChecksum { algorithm: String, value: String },
}
