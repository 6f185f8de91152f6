use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use depot_policy::{ChecksumPolicy, LocalChecksumPolicy, PathFilter, RemoteChecksumPolicy};
use depot_store::{ContentHandle, StorageBackend, StoreResult};
use depot_types::{
    ChecksumType, LocalChecksumPolicyType, LocalRepoDescriptor, RemoteRepoDescriptor, RepoPath,
    RepoResource,
};

/// A repository whose content lives in the storage backend under its own key.
///
/// Plain local repositories hold deployed content. The cache companion of a
/// remote repository is a `LocalRepo` too, keyed `<remote>-cache`, that
/// applies the remote's checksum policy instead of the local one.
pub struct LocalRepo {
    descriptor: LocalRepoDescriptor,
    cache_of: Option<String>,
    filter: PathFilter,
    policy: Arc<dyn ChecksumPolicy>,
    storage: Arc<dyn StorageBackend>,
}

impl LocalRepo {
    pub fn new(descriptor: LocalRepoDescriptor, storage: Arc<dyn StorageBackend>) -> Self {
        let filter = PathFilter::new(&descriptor.includes, &descriptor.excludes);
        let policy = Arc::new(LocalChecksumPolicy::new(descriptor.checksum_policy));
        Self {
            descriptor,
            cache_of: None,
            filter,
            policy,
            storage,
        }
    }

    /// The cache companion of a remote repository.
    pub fn cache_for(remote: &RemoteRepoDescriptor, storage: Arc<dyn StorageBackend>) -> Self {
        let descriptor = LocalRepoDescriptor {
            key: remote.cache_key(),
            description: format!("local cache of {}", remote.key),
            includes: remote.includes.clone(),
            excludes: remote.excludes.clone(),
            checksum_policy: LocalChecksumPolicyType::Server,
        };
        let filter = PathFilter::new(&descriptor.includes, &descriptor.excludes);
        Self {
            descriptor,
            cache_of: Some(remote.key.clone()),
            filter,
            policy: Arc::new(RemoteChecksumPolicy::new(remote.checksum_policy)),
            storage,
        }
    }

    pub fn key(&self) -> &str {
        &self.descriptor.key
    }

    pub fn descriptor(&self) -> &LocalRepoDescriptor {
        &self.descriptor
    }

    pub fn is_cache(&self) -> bool {
        self.cache_of.is_some()
    }

    /// Key of the remote repository this cache belongs to.
    pub fn cache_of(&self) -> Option<&str> {
        self.cache_of.as_deref()
    }

    pub fn checksum_policy(&self) -> &dyn ChecksumPolicy {
        self.policy.as_ref()
    }

    pub fn storage(&self) -> &Arc<dyn StorageBackend> {
        &self.storage
    }

    /// Storage identity of a path in this repository.
    pub fn repo_path(&self, path: &str) -> RepoPath {
        RepoPath::new(self.key(), path)
    }

    /// Whether this repository serves or stores `path`, default noise
    /// excludes included.
    pub fn accepts(&self, path: &str) -> bool {
        self.filter.accepts_artifact(path)
    }

    pub fn get_resource(&self, path: &str) -> StoreResult<Option<RepoResource>> {
        self.storage.get_resource(&self.repo_path(path))
    }

    pub fn get_content(&self, path: &str) -> StoreResult<Option<ContentHandle>> {
        self.storage.get(&self.repo_path(path))
    }

    pub fn put(&self, path: &str, content: Bytes, resource: RepoResource) -> StoreResult<RepoResource> {
        self.storage.put(&self.repo_path(path), content, resource)
    }

    pub fn delete(&self, path: &str) -> StoreResult<bool> {
        self.storage.delete(&self.repo_path(path))
    }

    /// The checksum this repository announces for a stored resource.
    pub fn checksum(&self, checksum_type: ChecksumType, resource: &RepoResource) -> Option<String> {
        self.policy
            .checksum(checksum_type, &resource.checksums, Some(&resource.repo_path))
    }
}

impl fmt::Debug for LocalRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalRepo")
            .field("key", &self.descriptor.key)
            .field("cache_of", &self.cache_of)
            .field("policy", &self.policy.name())
            .finish()
    }
}
