use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use depot_policy::PathFilter;
use depot_types::{VirtualRepoDescriptor, CACHE_KEY_SUFFIX};

use crate::error::{RepoError, RepoResult};
use crate::local::LocalRepo;
use crate::remote::RemoteRepo;
use crate::repo::Repo;

/// Ordered aggregation of local and remote repositories.
///
/// Member order is search order. Lookups by key ignore order.
pub struct VirtualRepo {
    descriptor: VirtualRepoDescriptor,
    filter: PathFilter,
    members: Vec<Repo>,
    locals: HashMap<String, Arc<LocalRepo>>,
    remotes: HashMap<String, Arc<RemoteRepo>>,
}

impl VirtualRepo {
    /// Build from resolved members. Registering the same key twice, or a
    /// virtual repository as a member, is a configuration error.
    pub fn new(descriptor: VirtualRepoDescriptor, members: Vec<Repo>) -> RepoResult<Self> {
        let mut locals = HashMap::new();
        let mut remotes = HashMap::new();
        for member in &members {
            let key = member.key().to_string();
            if locals.contains_key(&key) || remotes.contains_key(&key) {
                return Err(RepoError::DuplicateKey(format!(
                    "{key} (member of {})",
                    descriptor.key
                )));
            }
            match member {
                Repo::Local(repo) => {
                    locals.insert(key, Arc::clone(repo));
                }
                Repo::RemoteCache(repo) => {
                    remotes.insert(key, Arc::clone(repo));
                }
                Repo::Virtual(nested) => {
                    return Err(RepoError::Invalid {
                        key: descriptor.key.clone(),
                        reason: format!("virtual repositories cannot nest ({})", nested.key()),
                    });
                }
            }
        }
        Ok(Self {
            filter: PathFilter::new(&descriptor.includes, &descriptor.excludes),
            descriptor,
            members,
            locals,
            remotes,
        })
    }

    pub fn key(&self) -> &str {
        &self.descriptor.key
    }

    pub fn descriptor(&self) -> &VirtualRepoDescriptor {
        &self.descriptor
    }

    pub fn accepts(&self, path: &str) -> bool {
        self.filter.accepts_artifact(path)
    }

    /// Members in configured order.
    pub fn members(&self) -> &[Repo] {
        &self.members
    }

    /// A local member by key.
    pub fn resolve_local(&self, key: &str) -> Option<&Arc<LocalRepo>> {
        self.locals.get(key)
    }

    /// The cache companion of a remote member, by the remote's key or by
    /// `<remote>-cache`. Both resolve to the same object.
    pub fn resolve_cache(&self, key: &str) -> Option<&Arc<LocalRepo>> {
        self.resolve_remote(key).map(|remote| remote.cache())
    }

    /// A remote member by its key or its cache companion's key.
    pub fn resolve_remote(&self, key: &str) -> Option<&Arc<RemoteRepo>> {
        self.remotes.get(key).or_else(|| {
            key.strip_suffix(CACHE_KEY_SUFFIX)
                .and_then(|remote_key| self.remotes.get(remote_key))
        })
    }

    /// Remote members in configured order.
    pub fn remote_members(&self) -> impl Iterator<Item = &Arc<RemoteRepo>> {
        self.members.iter().filter_map(|member| match member {
            Repo::RemoteCache(remote) => Some(remote),
            _ => None,
        })
    }
}

impl fmt::Debug for VirtualRepo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let members: Vec<&str> = self.members.iter().map(Repo::key).collect();
        f.debug_struct("VirtualRepo")
            .field("key", &self.descriptor.key)
            .field("members", &members)
            .finish()
    }
}
