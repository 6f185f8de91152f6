use depot_types::RepoResource;

/// How a resolution was answered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Served from storage without contacting any origin.
    LocalHit,
    /// Fetched (or revalidated) from the origin and cached.
    Cached,
    /// A stale cached copy served because the origin failed.
    Degraded { warning: String },
}

/// Successful answer to a resolve request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    /// Metadata of the serving copy; its path names the repository that
    /// holds it (a remote's cache companion for remote content).
    pub resource: RepoResource,
    pub source: ResolutionSource,
}

impl Resolution {
    pub fn is_degraded(&self) -> bool {
        matches!(self.source, ResolutionSource::Degraded { .. })
    }

    /// Warning annotation of a degraded answer.
    pub fn warning(&self) -> Option<&str> {
        match &self.source {
            ResolutionSource::Degraded { warning } => Some(warning),
            _ => None,
        }
    }
}
