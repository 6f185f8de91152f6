use crate::ant::AntPattern;

/// Noise files excluded from artifact requests in every repository: editor
/// backups, VCS metadata and OS metadata files.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "**/*~",
    "**/#*#",
    "**/.#*",
    "**/%*%",
    "**/._*",
    "**/CVS",
    "**/CVS/**",
    "**/.cvsignore",
    "**/SCCS",
    "**/SCCS/**",
    "**/vssver.scc",
    "**/.svn",
    "**/.svn/**",
    "**/.DS_Store",
    "**/Thumbs.db",
    "**/.git",
    "**/.git/**",
    "**/.gitattributes",
    "**/.gitignore",
    "**/.gitmodules",
    "**/.hg",
    "**/.hg/**",
    "**/.hgignore",
    "**/.hgsub",
    "**/.hgsubstate",
    "**/.hgtags",
    "**/.bzr",
    "**/.bzr/**",
    "**/.bzrignore",
];

/// Include/exclude path filter of one repository.
#[derive(Clone, Debug, Default)]
pub struct PathFilter {
    includes: Vec<AntPattern>,
    excludes: Vec<AntPattern>,
    defaults: Vec<AntPattern>,
}

impl PathFilter {
    pub fn new(includes: &[String], excludes: &[String]) -> Self {
        Self {
            includes: includes.iter().map(|p| AntPattern::new(p)).collect(),
            excludes: excludes.iter().map(|p| AntPattern::new(p)).collect(),
            defaults: DEFAULT_EXCLUDES.iter().map(|p| AntPattern::new(p)).collect(),
        }
    }

    /// A filter accepting everything except the default excludes.
    pub fn accept_all() -> Self {
        Self::new(&[], &[])
    }

    /// Decide whether a path is visible through this repository.
    ///
    /// 1. The repository root is always accepted.
    /// 2. Any matching exclude rejects.
    /// 3. No includes means everything is included.
    /// 4. Otherwise the path must match an include, or be a literal folder
    ///    prefix of one (`org/acme` for `org/acme/lib/**`), so folders
    ///    holding only included children can be browsed.
    pub fn accepts(&self, path: &str) -> bool {
        evaluate(path, &self.includes, self.excludes.iter())
    }

    /// Same as [`accepts`](Self::accepts), with [`DEFAULT_EXCLUDES`] unioned
    /// into the excludes. Used for artifact requests.
    pub fn accepts_artifact(&self, path: &str) -> bool {
        evaluate(path, &self.includes, self.excludes.iter().chain(&self.defaults))
    }
}

/// Stateless form of [`PathFilter::accepts`].
pub fn accepts(path: &str, includes: &[String], excludes: &[String]) -> bool {
    PathFilter::new(includes, excludes).accepts(path)
}

fn evaluate<'a>(
    path: &str,
    includes: &[AntPattern],
    mut excludes: impl Iterator<Item = &'a AntPattern>,
) -> bool {
    if is_root(path) {
        return true;
    }
    if excludes.any(|pattern| pattern.matches(path)) {
        return false;
    }
    if includes.is_empty() {
        return true;
    }
    includes
        .iter()
        .any(|pattern| pattern.matches(path) || pattern.has_literal_prefix(path))
}

fn is_root(path: &str) -> bool {
    path.trim_matches('/').is_empty()
}
