use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use depot_types::{
    validate_repo_key, LocalRepoDescriptor, RemoteRepoDescriptor, RepoDescriptor,
    VirtualRepoDescriptor, CACHE_KEY_SUFFIX,
};
use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

/// Resolver tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// How long a request waits for a contended path lock.
    #[serde(default = "default_lock_timeout")]
    pub lock_timeout_secs: u64,
    /// Upper bound on one origin fetch, on top of the client's own timeout.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl ResolverConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            lock_timeout_secs: default_lock_timeout(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

fn default_lock_timeout() -> u64 {
    60
}

fn default_fetch_timeout() -> u64 {
    60
}

/// Immutable snapshot of every repository definition.
///
/// ```toml
/// [[local]]
/// key = "libs-release-local"
///
/// [[remote]]
/// key = "repo1"
/// url = "https://repo1.maven.org/maven2"
/// missed_retrieval_cache_period_secs = 3600
///
/// [[virtual]]
/// key = "libs"
/// members = ["libs-release-local", "repo1"]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoriesConfig {
    #[serde(default)]
    pub local: Vec<LocalRepoDescriptor>,
    #[serde(default)]
    pub remote: Vec<RemoteRepoDescriptor>,
    #[serde(default, rename = "virtual")]
    pub virtuals: Vec<VirtualRepoDescriptor>,
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl RepositoriesConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> RepoResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> RepoResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Every descriptor, locals first, then remotes, then virtuals, each in
    /// configured order.
    pub fn descriptors(&self) -> impl Iterator<Item = RepoDescriptor> + '_ {
        self.local
            .iter()
            .cloned()
            .map(RepoDescriptor::Local)
            .chain(self.remote.iter().cloned().map(RepoDescriptor::Remote))
            .chain(self.virtuals.iter().cloned().map(RepoDescriptor::Virtual))
    }

    /// Check the whole snapshot. The first problem found is returned.
    pub fn validate(&self) -> RepoResult<()> {
        let mut keys = HashSet::new();
        for descriptor in self.descriptors() {
            let key = descriptor.key();
            validate_repo_key(key)?;
            if !keys.insert(key.to_string()) {
                return Err(RepoError::DuplicateKey(key.to_string()));
            }
        }
        for remote in &self.remote {
            if keys.contains(&remote.cache_key()) {
                return Err(RepoError::DuplicateKey(remote.cache_key()));
            }
            if !(remote.url.starts_with("http://") || remote.url.starts_with("https://")) {
                return Err(RepoError::Invalid {
                    key: remote.key.clone(),
                    reason: format!("url must be http(s), got {:?}", remote.url),
                });
            }
        }
        for virtual_repo in &self.virtuals {
            let mut seen = HashSet::new();
            for member in &virtual_repo.members {
                let resolved = self.member_target(member).ok_or_else(|| RepoError::UnknownMember {
                    virtual_key: virtual_repo.key.clone(),
                    member: member.clone(),
                })?;
                if !seen.insert(resolved) {
                    return Err(RepoError::DuplicateKey(format!(
                        "{} (member of {})",
                        member, virtual_repo.key
                    )));
                }
            }
        }
        Ok(())
    }

    /// The local or remote key a virtual member name refers to. Cache
    /// companion keys resolve to their remote.
    pub(crate) fn member_target<'a>(&'a self, member: &'a str) -> Option<&'a str> {
        if self.local.iter().any(|d| d.key == member) || self.remote.iter().any(|d| d.key == member)
        {
            return Some(member);
        }
        let remote_key = member.strip_suffix(CACHE_KEY_SUFFIX)?;
        self.remote
            .iter()
            .find(|d| d.key == remote_key)
            .map(|d| d.key.as_str())
    }
}
