//! Immutable configuration snapshots of repositories.
//!
//! A live repository object is rebuilt from its descriptor whenever the
//! configuration is reloaded; descriptors themselves are never mutated.

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Suffix naming the local cache companion of a remote repository.
pub const CACHE_KEY_SUFFIX: &str = "-cache";

/// Default TTL of the HIT retrieval table (12 hours).
pub const DEFAULT_RETRIEVAL_CACHE_PERIOD_SECS: u64 = 43_200;
/// Default TTL of the ERROR retrieval table.
pub const DEFAULT_FAILED_RETRIEVAL_CACHE_PERIOD_SECS: u64 = 30;
/// Default TTL of the MISS retrieval table (12 hours).
pub const DEFAULT_MISSED_RETRIEVAL_CACHE_PERIOD_SECS: u64 = 43_200;
/// Default remote socket timeout.
pub const DEFAULT_SOCKET_TIMEOUT_SECS: u64 = 15;

/// Characters that are forbidden anywhere in a repository key.
const FORBIDDEN_KEY_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', ' ', '\t'];

/// Validate a repository key.
///
/// Keys must be non-empty, must not start with `.` and must not contain path
/// separators, whitespace or glob characters.
pub fn validate_repo_key(key: &str) -> Result<(), TypeError> {
    if key.is_empty() || key.starts_with('.') || key.contains(FORBIDDEN_KEY_CHARS) {
        return Err(TypeError::InvalidRepoKey(key.to_string()));
    }
    Ok(())
}

/// Which checksum a local repository treats as authoritative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocalChecksumPolicyType {
    /// Trust the checksum declared by the deploying client.
    #[default]
    Client,
    /// Trust the checksum computed by the server.
    Server,
}

/// How a remote repository treats checksums declared by its origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RemoteChecksumPolicyType {
    /// Accept only when at least one declared checksum verifies.
    Verify,
    /// Generate a checksum on the server when the origin supplied none.
    #[default]
    GenerateIfAbsent,
    /// Reject the artifact outright when any declared checksum mismatches.
    Fail,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRepoDescriptor {
    pub key: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub checksum_policy: LocalChecksumPolicyType,
}

impl LocalRepoDescriptor {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: String::new(),
            includes: Vec::new(),
            excludes: Vec::new(),
            checksum_policy: LocalChecksumPolicyType::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRepoDescriptor {
    pub key: String,
    #[serde(default)]
    pub description: String,
    /// Base URL of the remote origin.
    pub url: String,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    /// Propagate transient failures instead of serving a stale cached copy.
    #[serde(default)]
    pub hard_fail: bool,
    /// Never contact the origin; serve only what is already cached.
    #[serde(default)]
    pub offline: bool,
    #[serde(default = "default_true")]
    pub store_artifacts_locally: bool,
    #[serde(default = "default_retrieval_period")]
    pub retrieval_cache_period_secs: u64,
    #[serde(default = "default_failed_period")]
    pub failed_retrieval_cache_period_secs: u64,
    #[serde(default = "default_missed_period")]
    pub missed_retrieval_cache_period_secs: u64,
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout_secs: u64,
    #[serde(default)]
    pub checksum_policy: RemoteChecksumPolicyType,
}

impl RemoteRepoDescriptor {
    pub fn new(key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: String::new(),
            url: url.into(),
            includes: Vec::new(),
            excludes: Vec::new(),
            hard_fail: false,
            offline: false,
            store_artifacts_locally: true,
            retrieval_cache_period_secs: DEFAULT_RETRIEVAL_CACHE_PERIOD_SECS,
            failed_retrieval_cache_period_secs: DEFAULT_FAILED_RETRIEVAL_CACHE_PERIOD_SECS,
            missed_retrieval_cache_period_secs: DEFAULT_MISSED_RETRIEVAL_CACHE_PERIOD_SECS,
            socket_timeout_secs: DEFAULT_SOCKET_TIMEOUT_SECS,
            checksum_policy: RemoteChecksumPolicyType::default(),
        }
    }

    /// Key of the local cache companion (`<key>-cache`).
    pub fn cache_key(&self) -> String {
        format!("{}{}", self.key, CACHE_KEY_SUFFIX)
    }

    /// Origin URL for a path inside this repository.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), path)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualRepoDescriptor {
    pub key: String,
    #[serde(default)]
    pub description: String,
    /// Member keys in search order.
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl VirtualRepoDescriptor {
    pub fn new(key: impl Into<String>, members: Vec<String>) -> Self {
        Self {
            key: key.into(),
            description: String::new(),
            members,
            includes: Vec::new(),
            excludes: Vec::new(),
        }
    }
}

/// Any repository descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepoDescriptor {
    Local(LocalRepoDescriptor),
    Remote(RemoteRepoDescriptor),
    Virtual(VirtualRepoDescriptor),
}

impl RepoDescriptor {
    pub fn key(&self) -> &str {
        match self {
            Self::Local(d) => &d.key,
            Self::Remote(d) => &d.key,
            Self::Virtual(d) => &d.key,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_retrieval_period() -> u64 {
    DEFAULT_RETRIEVAL_CACHE_PERIOD_SECS
}

fn default_failed_period() -> u64 {
    DEFAULT_FAILED_RETRIEVAL_CACHE_PERIOD_SECS
}

fn default_missed_period() -> u64 {
    DEFAULT_MISSED_RETRIEVAL_CACHE_PERIOD_SECS
}

fn default_socket_timeout() -> u64 {
    DEFAULT_SOCKET_TIMEOUT_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_defaults() {
        let d = RemoteRepoDescriptor::new("repo1", "https://repo.example.org/maven2");
        assert_eq!(d.retrieval_cache_period_secs, 43_200);
        assert_eq!(d.failed_retrieval_cache_period_secs, 30);
        assert_eq!(d.missed_retrieval_cache_period_secs, 43_200);
        assert!(d.store_artifacts_locally);
        assert!(!d.hard_fail);
        assert!(!d.offline);
        assert_eq!(d.checksum_policy, RemoteChecksumPolicyType::GenerateIfAbsent);
    }

    #[test]
    fn serde_defaults_match_constructor() {
        let parsed: RemoteRepoDescriptor =
            toml::from_str("key = \"repo1\"\nurl = \"https://repo.example.org/maven2\"").unwrap();
        assert_eq!(
            parsed,
            RemoteRepoDescriptor::new("repo1", "https://repo.example.org/maven2")
        );
    }

    #[test]
    fn policy_names_are_kebab_case() {
        let parsed: RemoteRepoDescriptor = toml::from_str(
            "key = \"r\"\nurl = \"http://x\"\nchecksum_policy = \"generate-if-absent\"",
        )
        .unwrap();
        assert_eq!(parsed.checksum_policy, RemoteChecksumPolicyType::GenerateIfAbsent);

        let local: LocalRepoDescriptor =
            toml::from_str("key = \"l\"\nchecksum_policy = \"server\"").unwrap();
        assert_eq!(local.checksum_policy, LocalChecksumPolicyType::Server);
    }

    #[test]
    fn cache_key_and_urls() {
        let d = RemoteRepoDescriptor::new("repo1", "https://repo.example.org/maven2/");
        assert_eq!(d.cache_key(), "repo1-cache");
        assert_eq!(
            d.url_for("org/acme/lib.jar"),
            "https://repo.example.org/maven2/org/acme/lib.jar"
        );
    }

    #[test]
    fn key_validation() {
        assert!(validate_repo_key("libs-release-local").is_ok());
        assert!(validate_repo_key("").is_err());
        assert!(validate_repo_key(".hidden").is_err());
        assert!(validate_repo_key("a/b").is_err());
        assert!(validate_repo_key("a b").is_err());
        assert!(validate_repo_key("a:b").is_err());
    }

    #[test]
    fn descriptor_key_dispatch() {
        let v = RepoDescriptor::Virtual(VirtualRepoDescriptor::new("all", vec!["a".into()]));
        assert_eq!(v.key(), "all");
        let l = RepoDescriptor::Local(LocalRepoDescriptor::new("libs"));
        assert_eq!(l.key(), "libs");
    }
}
