use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use depot_types::ChecksumType;

use crate::error::RemoteResult;

/// Content and metadata returned by an origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteArtifact {
    pub content: Bytes,
    pub size: u64,
    /// Last modification, milliseconds since the UNIX epoch.
    pub last_modified: i64,
    /// Checksums declared by the origin, keyed by algorithm.
    pub checksums: BTreeMap<ChecksumType, String>,
}

impl RemoteArtifact {
    pub fn new(content: impl Into<Bytes>, last_modified: i64) -> Self {
        let content = content.into();
        Self {
            size: content.len() as u64,
            content,
            last_modified,
            checksums: BTreeMap::new(),
        }
    }

    pub fn with_checksum(mut self, checksum_type: ChecksumType, value: impl Into<String>) -> Self {
        self.checksums.insert(checksum_type, value.into());
        self
    }
}

/// Answer of one origin fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Found(RemoteArtifact),
    /// The conditional fetch found the origin copy unchanged.
    NotModified,
    /// The origin confirmed the resource does not exist.
    NotFound,
}

/// Client of a remote origin.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Fetch `url`. With `if_modified_since` (whole seconds since the epoch)
    /// the origin may answer [`FetchOutcome::NotModified`].
    async fn fetch(&self, url: &str, if_modified_since: Option<i64>) -> RemoteResult<FetchOutcome>;
}
