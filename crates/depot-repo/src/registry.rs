use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use depot_remote::{HttpRemoteClient, RemoteClient};
use depot_store::StorageBackend;
use depot_types::{RemoteRepoDescriptor, VirtualRepoDescriptor, CACHE_KEY_SUFFIX};
use tracing::{debug, info};

use crate::config::{RepositoriesConfig, ResolverConfig};
use crate::error::{RepoError, RepoResult};
use crate::local::LocalRepo;
use crate::remote::RemoteRepo;
use crate::repo::Repo;
use crate::virtual_repo::VirtualRepo;

/// Key of the built-in virtual repository aggregating every local and remote
/// repository.
pub const GLOBAL_VIRTUAL_KEY: &str = "repo";

/// Builds the origin client of each remote repository.
pub trait RemoteClientFactory: Send + Sync {
    fn client_for(&self, descriptor: &RemoteRepoDescriptor) -> RepoResult<Arc<dyn RemoteClient>>;
}

impl<F> RemoteClientFactory for F
where
    F: Fn(&RemoteRepoDescriptor) -> RepoResult<Arc<dyn RemoteClient>> + Send + Sync,
{
    fn client_for(&self, descriptor: &RemoteRepoDescriptor) -> RepoResult<Arc<dyn RemoteClient>> {
        self(descriptor)
    }
}

/// One [`HttpRemoteClient`] per remote, bounded by its socket timeout.
#[derive(Clone, Copy, Debug, Default)]
pub struct HttpClientFactory;

impl RemoteClientFactory for HttpClientFactory {
    fn client_for(&self, descriptor: &RemoteRepoDescriptor) -> RepoResult<Arc<dyn RemoteClient>> {
        let client = HttpRemoteClient::with_timeout_secs(descriptor.socket_timeout_secs)?;
        Ok(Arc::new(client))
    }
}

/// Every live repository of one configuration snapshot.
///
/// Built in one go from a validated [`RepositoriesConfig`]; never modified
/// afterwards. Retrieval caches and lock tables are owned by the remote
/// repositories inside, so dropping the registry drops them too.
pub struct RepositoryRegistry {
    config: RepositoriesConfig,
    order: Vec<String>,
    repos: HashMap<String, Repo>,
    global: Arc<VirtualRepo>,
}

impl RepositoryRegistry {
    pub fn build(
        config: RepositoriesConfig,
        storage: Arc<dyn StorageBackend>,
        clients: &dyn RemoteClientFactory,
    ) -> RepoResult<Self> {
        config.validate()?;

        let mut order = Vec::new();
        let mut repos = HashMap::new();
        for descriptor in &config.local {
            let repo = Arc::new(LocalRepo::new(descriptor.clone(), Arc::clone(&storage)));
            order.push(descriptor.key.clone());
            repos.insert(descriptor.key.clone(), Repo::Local(repo));
        }
        for descriptor in &config.remote {
            let client = clients.client_for(descriptor)?;
            let repo = Arc::new(RemoteRepo::new(descriptor.clone(), Arc::clone(&storage), client));
            order.push(descriptor.key.clone());
            repos.insert(descriptor.key.clone(), Repo::RemoteCache(repo));
        }

        let storing: Vec<Repo> = order.iter().filter_map(|key| repos.get(key).cloned()).collect();
        let mut global = None;
        for descriptor in &config.virtuals {
            let members = descriptor
                .members
                .iter()
                .map(|member| {
                    config
                        .member_target(member)
                        .and_then(|target| repos.get(target).cloned())
                        .ok_or_else(|| RepoError::UnknownMember {
                            virtual_key: descriptor.key.clone(),
                            member: member.clone(),
                        })
                })
                .collect::<RepoResult<Vec<_>>>()?;
            let repo = Arc::new(VirtualRepo::new(descriptor.clone(), members)?);
            if descriptor.key == GLOBAL_VIRTUAL_KEY {
                global = Some(Arc::clone(&repo));
            }
            order.push(descriptor.key.clone());
            repos.insert(descriptor.key.clone(), Repo::Virtual(repo));
        }

        let global = match global {
            Some(defined) => defined,
            None => {
                let mut descriptor = VirtualRepoDescriptor::new(
                    GLOBAL_VIRTUAL_KEY,
                    storing.iter().map(|repo| repo.key().to_string()).collect(),
                );
                descriptor.description = "all local and remote repositories".to_string();
                let repo = Arc::new(VirtualRepo::new(descriptor, storing)?);
                if repos.contains_key(GLOBAL_VIRTUAL_KEY) {
                    debug!(key = GLOBAL_VIRTUAL_KEY, "global virtual repository shadowed by configured repository");
                } else {
                    order.push(GLOBAL_VIRTUAL_KEY.to_string());
                    repos.insert(GLOBAL_VIRTUAL_KEY.to_string(), Repo::Virtual(Arc::clone(&repo)));
                }
                repo
            }
        };

        info!(
            locals = config.local.len(),
            remotes = config.remote.len(),
            virtuals = config.virtuals.len(),
            "repository registry built"
        );
        Ok(Self {
            config,
            order,
            repos,
            global,
        })
    }

    pub fn config(&self) -> &RepositoriesConfig {
        &self.config
    }

    pub fn resolver_config(&self) -> &ResolverConfig {
        &self.config.resolver
    }

    /// Look up a repository by key. A remote's cache companion key
    /// (`<remote>-cache`) resolves to the remote.
    pub fn get(&self, key: &str) -> Option<&Repo> {
        self.repos.get(key).or_else(|| {
            let remote_key = key.strip_suffix(CACHE_KEY_SUFFIX)?;
            self.repos
                .get(remote_key)
                .filter(|repo| matches!(repo, Repo::RemoteCache(_)))
        })
    }

    pub fn local(&self, key: &str) -> Option<&Arc<LocalRepo>> {
        match self.repos.get(key)? {
            Repo::Local(repo) => Some(repo),
            _ => None,
        }
    }

    pub fn remote(&self, key: &str) -> Option<&Arc<RemoteRepo>> {
        match self.get(key)? {
            Repo::RemoteCache(repo) => Some(repo),
            _ => None,
        }
    }

    pub fn virtual_repo(&self, key: &str) -> Option<&Arc<VirtualRepo>> {
        match self.repos.get(key)? {
            Repo::Virtual(repo) => Some(repo),
            _ => None,
        }
    }

    /// The aggregation of every local and remote repository.
    pub fn global(&self) -> &Arc<VirtualRepo> {
        &self.global
    }

    /// Registered keys in configuration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Remote repositories in configuration order.
    pub fn remotes(&self) -> impl Iterator<Item = &Arc<RemoteRepo>> {
        self.order.iter().filter_map(|key| match self.repos.get(key) {
            Some(Repo::RemoteCache(repo)) => Some(repo),
            _ => None,
        })
    }

    /// Empty every retrieval cache.
    pub fn clear_retrieval_caches(&self) {
        for remote in self.remotes() {
            remote.retrieval().clear();
        }
    }
}

impl fmt::Debug for RepositoryRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryRegistry")
            .field("repos", &self.order)
            .finish()
    }
}
