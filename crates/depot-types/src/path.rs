use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Separator between the repository key and the path in the textual form.
const KEY_SEPARATOR: char = ':';

/// Identity of an artifact: a repository key plus a path inside it.
///
/// `RepoPath` is the universal cache and lock key. The path is stored
/// `/`-separated without leading or trailing slashes; the repository root is
/// the empty path.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoPath {
    repo_key: String,
    path: String,
}

impl RepoPath {
    /// Create a path, normalising leading, trailing and doubled slashes.
    pub fn new(repo_key: impl Into<String>, path: impl AsRef<str>) -> Self {
        Self {
            repo_key: repo_key.into(),
            path: normalize(path.as_ref()),
        }
    }

    /// The root of a repository.
    pub fn root(repo_key: impl Into<String>) -> Self {
        Self {
            repo_key: repo_key.into(),
            path: String::new(),
        }
    }

    /// The repository key.
    pub fn repo_key(&self) -> &str {
        &self.repo_key
    }

    /// The path inside the repository (no leading slash).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns `true` for the repository root.
    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// Last path segment, or the empty string for the root.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Parent folder, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }
        let parent = match self.path.rfind('/') {
            Some(idx) => &self.path[..idx],
            None => "",
        };
        Some(Self {
            repo_key: self.repo_key.clone(),
            path: parent.to_string(),
        })
    }

    /// Same path in another repository.
    pub fn with_repo_key(&self, repo_key: impl Into<String>) -> Self {
        Self {
            repo_key: repo_key.into(),
            path: self.path.clone(),
        }
    }

    /// Child path with `suffix` appended to the file name (e.g. `.sha1`).
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            repo_key: self.repo_key.clone(),
            path: format!("{}{}", self.path, suffix),
        }
    }

    /// Returns `true` if any path segment names a `-SNAPSHOT` version folder.
    pub fn is_in_snapshot_folder(&self) -> bool {
        self.path
            .split('/')
            .rev()
            .skip(1)
            .any(|segment| segment.ends_with("-SNAPSHOT"))
    }
}

fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

impl fmt::Debug for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RepoPath({self})")
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.repo_key, KEY_SEPARATOR, self.path)
    }
}

impl FromStr for RepoPath {
    type Err = TypeError;

    /// Parse the `key:path` form produced by [`Display`](fmt::Display).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, path) = s
            .split_once(KEY_SEPARATOR)
            .ok_or_else(|| TypeError::InvalidRepoPath(s.to_string()))?;
        if key.trim().is_empty() {
            return Err(TypeError::InvalidRepoKey(key.to_string()));
        }
        Ok(Self::new(key, path))
    }
}
