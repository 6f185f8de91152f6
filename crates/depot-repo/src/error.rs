use depot_remote::RemoteError;
use depot_types::TypeError;

/// Configuration errors. Any of them keeps the affected configuration from
/// becoming active.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Two repositories share a key.
    #[error("duplicate repository key: {0}")]
    DuplicateKey(String),

    /// A key is malformed.
    #[error(transparent)]
    InvalidKey(#[from] TypeError),

    /// A virtual repository names a repository that does not exist.
    #[error("virtual repository {virtual_key} references unknown repository {member}")]
    UnknownMember { virtual_key: String, member: String },

    /// A descriptor field is missing or invalid.
    #[error("invalid configuration for {key}: {reason}")]
    Invalid { key: String, reason: String },

    /// The configuration file could not be parsed.
    #[error("configuration parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The origin client of a remote repository could not be built.
    #[error("remote client error: {0}")]
    Remote(#[from] RemoteError),
}

/// Result alias for repository configuration operations.
pub type RepoResult<T> = Result<T, RepoError>;
