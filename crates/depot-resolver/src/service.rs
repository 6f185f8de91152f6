use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use depot_repo::{RemoteClientFactory, RepositoriesConfig, RepositoryRegistry};
use depot_store::{ContentHandle, StorageBackend};
use depot_types::{ChecksumType, RepoPath, RepoResource};
use tracing::{info, warn};

use crate::context::RequestContext;
use crate::error::ResolveResult;
use crate::events::CacheListener;
use crate::resolution::Resolution;
use crate::resolver::RepositoryResolver;

/// Long-lived entry point holding the active registry.
///
/// Every operation runs against the registry that was active when it
/// started; a concurrent [`reload`](Self::reload) never changes the
/// repositories an in-flight request sees.
pub struct RepositoryService {
    storage: Arc<dyn StorageBackend>,
    clients: Arc<dyn RemoteClientFactory>,
    registry: RwLock<Arc<RepositoryRegistry>>,
    listeners: RwLock<Vec<Arc<dyn CacheListener>>>,
}

impl RepositoryService {
    pub fn new(
        config: RepositoriesConfig,
        storage: Arc<dyn StorageBackend>,
        clients: Arc<dyn RemoteClientFactory>,
    ) -> ResolveResult<Self> {
        let registry = RepositoryRegistry::build(config, Arc::clone(&storage), clients.as_ref())?;
        Ok(Self {
            storage,
            clients,
            registry: RwLock::new(Arc::new(registry)),
            listeners: RwLock::new(Vec::new()),
        })
    }

    /// The active registry snapshot.
    pub fn registry(&self) -> Arc<RepositoryRegistry> {
        Arc::clone(&self.registry.read().expect("lock poisoned"))
    }

    /// A resolver bound to the active registry and the current listeners.
    pub fn resolver(&self) -> RepositoryResolver {
        let listeners = self.listeners.read().expect("lock poisoned").clone();
        RepositoryResolver::new(self.registry()).with_listeners(listeners)
    }

    pub fn add_listener(&self, listener: Arc<dyn CacheListener>) {
        self.listeners.write().expect("lock poisoned").push(listener);
    }

    /// Replace the registry with one built from `config`.
    ///
    /// Nothing changes unless the whole configuration is valid. On success
    /// the old registry's retrieval caches are emptied; in-flight requests
    /// still holding it finish against their snapshot.
    pub fn reload(&self, config: RepositoriesConfig) -> ResolveResult<()> {
        let fresh = match RepositoryRegistry::build(config, Arc::clone(&self.storage), self.clients.as_ref()) {
            Ok(registry) => Arc::new(registry),
            Err(e) => {
                warn!(error = %e, "configuration reload rejected, keeping active repositories");
                return Err(e.into());
            }
        };
        let previous = std::mem::replace(&mut *self.registry.write().expect("lock poisoned"), fresh);
        previous.clear_retrieval_caches();
        info!(repos = self.registry().keys().count(), "repository configuration reloaded");
        Ok(())
    }

    pub async fn resolve(&self, ctx: &RequestContext, path: &RepoPath) -> ResolveResult<Resolution> {
        self.resolver().resolve(ctx, path).await
    }

    pub async fn get_content(&self, ctx: &RequestContext, path: &RepoPath) -> ResolveResult<ContentHandle> {
        self.resolver().get_content(ctx, path).await
    }

    pub async fn resolve_checksum(&self, ctx: &RequestContext, path: &RepoPath) -> ResolveResult<String> {
        self.resolver().resolve_checksum(ctx, path).await
    }

    pub async fn save(
        &self,
        ctx: &RequestContext,
        path: &RepoPath,
        content: Bytes,
        declared: &BTreeMap<ChecksumType, String>,
    ) -> ResolveResult<RepoResource> {
        self.resolver().save(ctx, path, content, declared).await
    }

    pub fn unexpire(&self, path: &RepoPath) -> ResolveResult<usize> {
        self.resolver().unexpire(path)
    }

    pub fn zap(&self, path: &RepoPath) -> ResolveResult<usize> {
        self.resolver().zap(path)
    }
}
