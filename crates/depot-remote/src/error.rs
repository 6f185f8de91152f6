use std::time::Duration;

/// Transient failures talking to a remote origin.
///
/// Confirmed absence is not an error; it is reported as
/// [`FetchOutcome::NotFound`](crate::FetchOutcome::NotFound).
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The origin did not answer in time.
    #[error("request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },

    /// The origin answered with a status that is neither success nor absence.
    #[error("origin answered {status} for {url}")]
    Status { url: String, status: u16 },

    /// Connection refused, reset, DNS failure and the like.
    #[error("connection to {url} failed: {reason}")]
    Connection { url: String, reason: String },

    /// The response body could not be read completely.
    #[error("failed reading body of {url}: {reason}")]
    Body { url: String, reason: String },

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Result alias for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;
