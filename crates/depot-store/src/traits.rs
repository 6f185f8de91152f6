use bytes::Bytes;
use depot_types::{RepoPath, RepoResource};

use crate::error::StoreResult;
use crate::handle::ContentHandle;

/// Persistent store for repository content.
///
/// All implementations must satisfy these invariants:
/// - `put` is all-or-nothing: on error nothing is visible at `path`.
/// - A handle returned by `get` keeps serving the bytes that were current
///   when it was opened, even if the path is overwritten meanwhile.
/// - Backend faults are returned as errors and are never reported as
///   "not found".
pub trait StorageBackend: Send + Sync {
    /// Open the content at `path`.
    ///
    /// Returns `Ok(None)` if nothing is stored there.
    fn get(&self, path: &RepoPath) -> StoreResult<Option<ContentHandle>>;

    /// Store `content` at `path` with the given metadata and return the
    /// metadata as persisted.
    fn put(&self, path: &RepoPath, content: Bytes, resource: RepoResource)
        -> StoreResult<RepoResource>;

    /// Remove the content at `path`. Returns `true` if something was removed.
    fn delete(&self, path: &RepoPath) -> StoreResult<bool>;

    /// Metadata of the content at `path`, without reading it.
    ///
    /// Default implementation opens and immediately releases a handle.
    /// Backends should override it when metadata is cheaper to reach.
    fn get_resource(&self, path: &RepoPath) -> StoreResult<Option<RepoResource>> {
        Ok(self.get(path)?.map(|handle| handle.resource().clone()))
    }

    /// Check whether anything is stored at `path`.
    fn exists(&self, path: &RepoPath) -> StoreResult<bool> {
        Ok(self.get_resource(path)?.is_some())
    }
}
