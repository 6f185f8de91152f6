use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::checksum::{ChecksumType, ChecksumsInfo};
use crate::path::RepoPath;

/// Metadata about a resolved artifact.
///
/// A resource never carries the binary content itself; content is handed out
/// separately as a scoped stream handle by the storage backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoResource {
    /// Where the resource physically lives.
    pub repo_path: RepoPath,
    /// Content length in bytes.
    pub size: u64,
    /// Last modification, milliseconds since the UNIX epoch.
    pub last_modified: i64,
    pub checksums: ChecksumsInfo,
    pub exists: bool,
}

impl RepoResource {
    /// An existing resource with no checksum information yet.
    pub fn new(repo_path: RepoPath, size: u64, last_modified: i64) -> Self {
        Self {
            repo_path,
            size,
            last_modified,
            checksums: ChecksumsInfo::new(),
            exists: true,
        }
    }

    /// Placeholder for a path that does not exist.
    pub fn not_found(repo_path: RepoPath) -> Self {
        Self {
            repo_path,
            size: 0,
            last_modified: 0,
            checksums: ChecksumsInfo::new(),
            exists: false,
        }
    }

    pub fn with_checksums(mut self, checksums: ChecksumsInfo) -> Self {
        self.checksums = checksums;
        self
    }

    /// Last modification rounded down to whole seconds, as used by HTTP
    /// conditional requests.
    pub fn last_modified_secs(&self) -> i64 {
        self.last_modified.div_euclid(1000)
    }

    /// Last modification as a UTC timestamp.
    pub fn last_modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.last_modified)
    }

    /// Returns `true` if the resource changed after `since_secs` (whole
    /// seconds since the epoch).
    pub fn is_modified_since(&self, since_secs: i64) -> bool {
        self.last_modified_secs() > since_secs
    }

    /// Same metadata relocated to another path.
    pub fn relocated(&self, repo_path: RepoPath) -> Self {
        Self {
            repo_path,
            ..self.clone()
        }
    }

    /// Server-computed checksum for an algorithm, if known.
    pub fn actual_checksum(&self, checksum_type: ChecksumType) -> Option<&str> {
        self.checksums.actual(checksum_type)
    }
}

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
