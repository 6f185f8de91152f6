use std::fmt;
use std::sync::Arc;

use depot_cache::RetrievalCache;
use depot_lock::LockTable;
use depot_policy::{PathFilter, RemoteChecksumPolicy};
use depot_remote::RemoteClient;
use depot_store::StorageBackend;
use depot_types::{RemoteRepoDescriptor, RepoPath};

use crate::inflight::ContentSlots;
use crate::local::LocalRepo;

/// Proxy of an upstream origin.
///
/// Owns everything that is per-remote mutable state: the retrieval cache,
/// the path lock table, the in-flight content slots and the local cache
/// companion. All of it is created
/// fresh with the repository and discarded with it.
pub struct RemoteRepo {
    descriptor: RemoteRepoDescriptor,
    filter: PathFilter,
    policy: RemoteChecksumPolicy,
    cache: Arc<LocalRepo>,
    retrieval: RetrievalCache,
    locks: LockTable,
    slots: ContentSlots,
    client: Arc<dyn RemoteClient>,
}

impl RemoteRepo {
    pub fn new(
        descriptor: RemoteRepoDescriptor,
        storage: Arc<dyn StorageBackend>,
        client: Arc<dyn RemoteClient>,
    ) -> Self {
        let filter = PathFilter::new(&descriptor.includes, &descriptor.excludes);
        let cache = Arc::new(LocalRepo::cache_for(&descriptor, storage));
        Self {
            filter,
            policy: RemoteChecksumPolicy::new(descriptor.checksum_policy),
            cache,
            retrieval: RetrievalCache::for_descriptor(&descriptor),
            locks: LockTable::new(),
            slots: ContentSlots::new(),
            client,
            descriptor,
        }
    }

    pub fn key(&self) -> &str {
        &self.descriptor.key
    }

    pub fn descriptor(&self) -> &RemoteRepoDescriptor {
        &self.descriptor
    }

    /// The local cache companion (`<key>-cache`).
    pub fn cache(&self) -> &Arc<LocalRepo> {
        &self.cache
    }

    pub fn retrieval(&self) -> &RetrievalCache {
        &self.retrieval
    }

    pub fn locks(&self) -> &LockTable {
        &self.locks
    }

    /// Content shared by concurrent requests while nothing is stored locally.
    pub fn content_slots(&self) -> &ContentSlots {
        &self.slots
    }

    pub fn checksum_policy(&self) -> &RemoteChecksumPolicy {
        &self.policy
    }

    pub fn client(&self) -> &Arc<dyn RemoteClient> {
        &self.client
    }

    pub fn is_offline(&self) -> bool {
        self.descriptor.offline
    }

    pub fn is_hard_fail(&self) -> bool {
        self.descriptor.hard_fail
    }

    pub fn stores_locally(&self) -> bool {
        self.descriptor.store_artifacts_locally
    }

    pub fn accepts(&self, path: &str) -> bool {
        self.filter.accepts_artifact(path)
    }

    /// Origin URL of a path.
    pub fn url_for(&self, path: &str) -> String {
        self.descriptor.url_for(path)
    }

    /// Key used for retrieval caching and locking of a path. Both are keyed
    /// by the remote's own key, whichever alias the caller used.
    pub fn retrieval_path(&self, path: &str) -> RepoPath {
        RepoPath::new(self.key(), path)
    }
}

impl fmt::Debug for RemoteRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteRepo")
            .field("key", &self.descriptor.key)
            .field("url", &self.descriptor.url)
            .field("offline", &self.descriptor.offline)
            .field("hard_fail", &self.descriptor.hard_fail)
            .finish()
    }
}
