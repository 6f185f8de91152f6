use std::sync::Arc;

use crate::local::LocalRepo;
use crate::remote::RemoteRepo;
use crate::virtual_repo::VirtualRepo;

/// A live repository of any kind.
///
/// A remote repository is reachable under its own key and under its cache
/// companion's key; both resolve to `RemoteCache`.
#[derive(Clone, Debug)]
pub enum Repo {
    Local(Arc<LocalRepo>),
    RemoteCache(Arc<RemoteRepo>),
    Virtual(Arc<VirtualRepo>),
}

impl Repo {
    /// The canonical key: the remote's own key for `RemoteCache`.
    pub fn key(&self) -> &str {
        match self {
            Self::Local(repo) => repo.key(),
            Self::RemoteCache(repo) => repo.key(),
            Self::Virtual(repo) => repo.key(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Local(_) => "local",
            Self::RemoteCache(_) => "remote",
            Self::Virtual(_) => "virtual",
        }
    }

    /// Whether the repository serves `path` at all.
    pub fn accepts(&self, path: &str) -> bool {
        match self {
            Self::Local(repo) => repo.accepts(path),
            Self::RemoteCache(repo) => repo.accepts(path),
            Self::Virtual(repo) => repo.accepts(path),
        }
    }

    /// The storage-backed repository of this entry, if it has one.
    pub fn storing_repo(&self) -> Option<&Arc<LocalRepo>> {
        match self {
            Self::Local(repo) => Some(repo),
            Self::RemoteCache(repo) => Some(repo.cache()),
            Self::Virtual(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_remote::InMemoryRemote;
    use depot_store::InMemoryStorage;
    use depot_types::{LocalRepoDescriptor, RemoteRepoDescriptor};

    #[test]
    fn dispatch_by_kind() {
        let storage = Arc::new(InMemoryStorage::new());
        let local = Repo::Local(Arc::new(LocalRepo::new(
            LocalRepoDescriptor::new("libs"),
            storage.clone(),
        )));
        let remote = Repo::RemoteCache(Arc::new(RemoteRepo::new(
            RemoteRepoDescriptor::new("repo1", "http://origin"),
            storage,
            Arc::new(InMemoryRemote::new()),
        )));

        assert_eq!(local.kind(), "local");
        assert_eq!(remote.kind(), "remote");
        assert_eq!(remote.key(), "repo1");
        assert_eq!(remote.storing_repo().map(|r| r.key()), Some("repo1-cache"));
        assert_eq!(local.storing_repo().map(|r| r.key()), Some("libs"));
    }
}
