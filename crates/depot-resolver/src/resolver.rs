use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use depot_cache::CacheLookup;
use depot_crypto::ChecksumCalculator;
use depot_policy::{is_metadata, ChecksumDecision, ChecksumPolicy};
use depot_remote::FetchOutcome;
use depot_repo::{LocalRepo, RemoteRepo, Repo, RepositoryRegistry, SlotTicket, VirtualRepo};
use depot_store::ContentHandle;
use depot_types::{
    now_millis, ChecksumInfo, ChecksumType, ChecksumsInfo, RepoPath, RepoResource,
    TRUSTED_FILE_MARKER,
};
use tracing::{debug, info, warn};

use crate::context::RequestContext;
use crate::error::{ResolveError, ResolveResult};
use crate::events::{CacheEvent, CacheListener, UnitOfWork};
use crate::resolution::{Resolution, ResolutionSource};

/// Internal answer: the resolution plus where its bytes can be read.
struct Resolved {
    resource: RepoResource,
    source: ResolutionSource,
    repo: Arc<LocalRepo>,
    /// Content fetched but not persisted (`store_artifacts_locally = false`).
    content: Option<Bytes>,
    /// Events of a cache write, dispatched once the path lock is released.
    events: Option<UnitOfWork>,
}

impl Resolved {
    fn stored(resource: RepoResource, source: ResolutionSource, repo: &Arc<LocalRepo>) -> Self {
        Self {
            resource,
            source,
            repo: Arc::clone(repo),
            content: None,
            events: None,
        }
    }

    fn in_memory(resource: RepoResource, repo: &Arc<LocalRepo>, content: Bytes) -> Self {
        Self {
            content: Some(content),
            ..Self::stored(resource, ResolutionSource::Cached, repo)
        }
    }

    fn into_resolution(self) -> Resolution {
        Resolution {
            resource: self.resource,
            source: self.source,
        }
    }
}

/// Resolution engine bound to one registry snapshot.
#[derive(Clone)]
pub struct RepositoryResolver {
    registry: Arc<RepositoryRegistry>,
    listeners: Vec<Arc<dyn CacheListener>>,
}

impl RepositoryResolver {
    pub fn new(registry: Arc<RepositoryRegistry>) -> Self {
        Self {
            registry,
            listeners: Vec::new(),
        }
    }

    pub fn with_listeners(mut self, listeners: Vec<Arc<dyn CacheListener>>) -> Self {
        self.listeners = listeners;
        self
    }

    pub fn registry(&self) -> &Arc<RepositoryRegistry> {
        &self.registry
    }

    /// Resolve the metadata of an artifact.
    pub async fn resolve(&self, ctx: &RequestContext, path: &RepoPath) -> ResolveResult<Resolution> {
        let repo = self.lookup(path.repo_key())?;
        self.resolve_in(ctx, repo, path.path(), false)
            .await
            .map(Resolved::into_resolution)
    }

    /// Resolve an artifact and open its content. The handle releases its
    /// storage lease when dropped.
    ///
    /// A remote that does not store artifacts keeps no bytes between
    /// requests: requests queued behind an in-flight fetch share its
    /// content, later ones fetch again.
    pub async fn get_content(&self, ctx: &RequestContext, path: &RepoPath) -> ResolveResult<ContentHandle> {
        let repo = self.lookup(path.repo_key())?;
        let resolved = self.resolve_in(ctx, repo, path.path(), true).await?;
        if let Some(content) = resolved.content {
            return Ok(ContentHandle::new(resolved.resource, content));
        }
        resolved
            .repo
            .get_content(path.path())?
            .ok_or_else(|| ResolveError::NotFound(path.clone()))
    }

    /// The checksum announced for a sidecar path such as `lib.jar.sha1`,
    /// selected by the checksum policy of the repository serving `lib.jar`.
    pub async fn resolve_checksum(&self, ctx: &RequestContext, path: &RepoPath) -> ResolveResult<String> {
        let (checksum_type, target) = ChecksumType::from_path(path.path())
            .ok_or_else(|| ResolveError::PathRejected(path.clone()))?;
        let repo = self.lookup(path.repo_key())?;
        let resolved = self.resolve_in(ctx, repo, target, false).await?;
        resolved
            .repo
            .checksum(checksum_type, &resolved.resource)
            .ok_or_else(|| ResolveError::NotFound(path.clone()))
    }

    /// Deploy content to a local repository.
    ///
    /// Declared checksums become the originals; algorithms without a
    /// declaration are marked trusted. Deploying a checksum sidecar of an
    /// existing artifact records the value as that artifact's original
    /// checksum instead of storing a file.
    pub async fn save(
        &self,
        ctx: &RequestContext,
        path: &RepoPath,
        content: Bytes,
        declared: &BTreeMap<ChecksumType, String>,
    ) -> ResolveResult<RepoResource> {
        let local = match self.lookup(path.repo_key())? {
            Repo::Local(local) => Arc::clone(local),
            other => return Err(ResolveError::NotDeployable(other.key().to_string())),
        };
        if !local.accepts(path.path()) {
            return Err(ResolveError::PathRejected(path.clone()));
        }
        if let Some(updated) = self.save_sidecar(&local, path, &content)? {
            return Ok(updated);
        }

        let actuals = ChecksumCalculator::compute(&content);
        let checksums: ChecksumsInfo = ChecksumType::ALL
            .iter()
            .map(|ty| {
                let original = declared
                    .get(ty)
                    .map(|value| value.trim().to_ascii_lowercase())
                    .unwrap_or_else(|| TRUSTED_FILE_MARKER.to_string());
                ChecksumInfo::new(*ty, Some(original), actuals.get(ty).cloned())
            })
            .collect();
        if let ChecksumDecision::Reject { reason } = local.checksum_policy().decide(&checksums) {
            warn!(path = %path, reason = %reason, "deploy rejected by checksum policy");
            return Err(ResolveError::RejectedByPolicy {
                path: path.clone(),
                reason,
            });
        }

        let mut uow = UnitOfWork::new(ctx.id);
        let resource = RepoResource::new(local.repo_path(path.path()), content.len() as u64, now_millis())
            .with_checksums(checksums);
        let stored = local.put(path.path(), content, resource)?;
        uow.defer(CacheEvent::Deployed(stored.clone()));
        uow.commit(&self.listeners).await;
        info!(path = %path, size = stored.size, "artifact deployed");
        Ok(stored)
    }

    fn save_sidecar(
        &self,
        local: &LocalRepo,
        path: &RepoPath,
        content: &Bytes,
    ) -> ResolveResult<Option<RepoResource>> {
        let Some((checksum_type, target)) = ChecksumType::from_path(path.path()) else {
            return Ok(None);
        };
        let Some(mut handle) = local.get_content(target)? else {
            return Ok(None);
        };
        let value = String::from_utf8_lossy(content)
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        if !checksum_type.is_valid(&value) {
            return Ok(None);
        }
        let mut resource = handle.resource().clone();
        let target_content = handle.read_remaining();
        drop(handle);

        let incoming = ChecksumInfo::new(checksum_type, Some(value), None);
        match resource.checksums.get(checksum_type).cloned() {
            Some(mut existing) => {
                existing.merge(&incoming);
                resource.checksums.add(existing);
            }
            None => resource.checksums.add(incoming),
        }
        let stored = local.put(target, target_content, resource)?;
        debug!(path = %path, "checksum sidecar recorded on target");
        Ok(Some(stored))
    }

    /// Drop MISS and ERROR rows for a path. On a virtual repository this
    /// applies to every remote member. Returns the number of rows dropped.
    pub fn unexpire(&self, path: &RepoPath) -> ResolveResult<usize> {
        self.for_each_remote(path, |remote, p| remote.retrieval().unexpire(p))
    }

    /// Drop HIT rows for a path, forcing the next request for a snapshot or
    /// metadata file to revalidate against the origin.
    pub fn zap(&self, path: &RepoPath) -> ResolveResult<usize> {
        self.for_each_remote(path, |remote, p| remote.retrieval().zap(p))
    }

    fn for_each_remote(
        &self,
        path: &RepoPath,
        op: impl Fn(&RemoteRepo, &RepoPath) -> bool,
    ) -> ResolveResult<usize> {
        let apply = |remote: &Arc<RemoteRepo>| op(remote.as_ref(), &remote.retrieval_path(path.path()));
        let count = match self.lookup(path.repo_key())? {
            Repo::Local(_) => 0,
            Repo::RemoteCache(remote) => usize::from(apply(remote)),
            Repo::Virtual(virtual_repo) => virtual_repo
                .remote_members()
                .map(apply)
                .filter(|dropped| *dropped)
                .count(),
        };
        Ok(count)
    }

    fn lookup(&self, key: &str) -> ResolveResult<&Repo> {
        self.registry
            .get(key)
            .ok_or_else(|| ResolveError::UnknownRepository(key.to_string()))
    }

    fn lock_timeout(&self, ctx: &RequestContext) -> Duration {
        ctx.lock_timeout
            .unwrap_or_else(|| self.registry.resolver_config().lock_timeout())
    }

    async fn resolve_in(
        &self,
        ctx: &RequestContext,
        repo: &Repo,
        path: &str,
        want_content: bool,
    ) -> ResolveResult<Resolved> {
        match repo {
            Repo::Local(local) => resolve_local(local, path),
            Repo::RemoteCache(remote) => self.resolve_remote(ctx, remote, path, want_content).await,
            Repo::Virtual(virtual_repo) => {
                self.resolve_virtual(ctx, virtual_repo, path, want_content)
                    .await
            }
        }
    }

    async fn resolve_virtual(
        &self,
        ctx: &RequestContext,
        virtual_repo: &VirtualRepo,
        path: &str,
        want_content: bool,
    ) -> ResolveResult<Resolved> {
        if !virtual_repo.accepts(path) {
            return Err(ResolveError::PathRejected(RepoPath::new(virtual_repo.key(), path)));
        }
        for member in virtual_repo.members() {
            let attempt = match member {
                Repo::Local(local) => resolve_local(local, path),
                Repo::RemoteCache(remote) => self.resolve_remote(ctx, remote, path, want_content).await,
                Repo::Virtual(_) => continue,
            };
            match attempt {
                Ok(resolved) => return Ok(resolved),
                Err(e) if e.is_member_miss() => {
                    if matches!(
                        e,
                        ResolveError::RemoteTransient { .. } | ResolveError::RejectedByPolicy { .. }
                    ) {
                        warn!(repo = virtual_repo.key(), member = member.key(), error = %e, "skipping failed member");
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(ResolveError::NotFound(RepoPath::new(virtual_repo.key(), path)))
    }

    async fn resolve_remote(
        &self,
        ctx: &RequestContext,
        remote: &RemoteRepo,
        path: &str,
        want_content: bool,
    ) -> ResolveResult<Resolved> {
        if !remote.accepts(path) {
            return Err(ResolveError::PathRejected(RepoPath::new(remote.key(), path)));
        }
        let key = remote.retrieval_path(path);

        if let Some(answer) = answer_from_cache(remote, &key, path, want_content)? {
            return answer;
        }

        // Content that is never stored is handed to queued requests through a slot.
        let shared = (!remote.stores_locally()).then(|| remote.content_slots().join(&key));
        let guard = remote
            .locks()
            .write(&key, ctx.id, self.lock_timeout(ctx))
            .await?;
        if let Some(resolved) = shared.as_ref().and_then(|ticket| take_shared(remote, ticket)) {
            return Ok(resolved);
        }
        // Another holder may have populated the caches while we waited.
        if let Some(answer) = answer_from_cache(remote, &key, path, want_content)? {
            return answer;
        }

        let mut resolved = self.fetch_and_cache(ctx, remote, &key, path).await?;
        if let (Some(ticket), Some(content)) = (&shared, &resolved.content) {
            ticket.fill(resolved.resource.clone(), content.clone());
        }
        drop(guard);
        if let Some(uow) = resolved.events.take() {
            uow.commit(&self.listeners).await;
        }
        Ok(resolved)
    }

    async fn fetch_and_cache(
        &self,
        ctx: &RequestContext,
        remote: &RemoteRepo,
        key: &RepoPath,
        path: &str,
    ) -> ResolveResult<Resolved> {
        let cache = remote.cache();
        let stale = cache.get_resource(path)?;
        let if_modified_since = stale.as_ref().map(RepoResource::last_modified_secs);
        let url = remote.url_for(path);
        let fetch_timeout = self.registry.resolver_config().fetch_timeout();

        debug!(repo = remote.key(), url = %url, ?if_modified_since, "remote fetch started");
        let fetched = tokio::time::timeout(fetch_timeout, remote.client().fetch(&url, if_modified_since)).await;
        let outcome = match fetched {
            Err(_) => {
                let message = format!("fetch exceeded {fetch_timeout:?}");
                return failed(remote, key, stale, cache, message, true);
            }
            Ok(Err(e)) => return failed(remote, key, stale, cache, e.to_string(), true),
            Ok(Ok(outcome)) => outcome,
        };
        debug!(repo = remote.key(), url = %url, "remote fetch finished");

        match outcome {
            FetchOutcome::NotFound => {
                remote.retrieval().record_miss(key);
                debug!(repo = remote.key(), path, "origin reports not found");
                Err(ResolveError::NotFound(key.clone()))
            }
            FetchOutcome::NotModified => match stale {
                Some(resource) => {
                    remote.retrieval().record_hit(key, resource.clone());
                    debug!(repo = remote.key(), path, "cached copy revalidated");
                    Ok(Resolved::stored(resource, ResolutionSource::Cached, cache))
                }
                None => failed(remote, key, None, cache, "unexpected not-modified answer".into(), true),
            },
            FetchOutcome::Found(artifact) => {
                let actuals = ChecksumCalculator::compute(&artifact.content);
                let checksums = ChecksumsInfo::from_parts(&artifact.checksums, &actuals);
                if let ChecksumDecision::Reject { reason } =
                    remote.checksum_policy().decide(&checksums)
                {
                    warn!(repo = remote.key(), path, reason = %reason, "fetched content rejected by checksum policy");
                    remote.retrieval().record_error(key, reason.clone());
                    return match stale {
                        Some(resource) if !remote.is_hard_fail() => {
                            Ok(degraded(remote, resource, cache, &reason))
                        }
                        _ => Err(ResolveError::RejectedByPolicy {
                            path: key.clone(),
                            reason,
                        }),
                    };
                }

                let resource = RepoResource::new(cache.repo_path(path), artifact.size, artifact.last_modified)
                    .with_checksums(checksums);
                if !remote.stores_locally() {
                    remote.retrieval().record_hit(key, resource.clone());
                    return Ok(Resolved::in_memory(resource, cache, artifact.content));
                }

                let mut uow = UnitOfWork::new(ctx.id);
                let stored = cache.put(path, artifact.content, resource)?;
                remote.retrieval().record_hit(key, stored.clone());
                uow.defer(CacheEvent::Cached(stored.clone()));
                info!(repo = remote.key(), path, size = stored.size, "artifact cached");
                Ok(Resolved {
                    events: Some(uow),
                    ..Resolved::stored(stored, ResolutionSource::Cached, cache)
                })
            }
        }
    }
}

fn resolve_local(local: &Arc<LocalRepo>, path: &str) -> ResolveResult<Resolved> {
    if !local.accepts(path) {
        return Err(ResolveError::PathRejected(local.repo_path(path)));
    }
    match local.get_resource(path)? {
        Some(resource) => Ok(Resolved::stored(resource, ResolutionSource::LocalHit, local)),
        None => Err(ResolveError::NotFound(local.repo_path(path))),
    }
}

/// Snapshot versions and metadata files change in place at the origin and
/// are only trusted while their HIT row lives. Releases never change.
fn is_volatile(key: &RepoPath) -> bool {
    is_metadata(key) || key.is_in_snapshot_folder()
}

/// Answer from the cache companion and the retrieval cache alone, or
/// `None` when the origin has to be asked.
fn answer_from_cache(
    remote: &RemoteRepo,
    key: &RepoPath,
    path: &str,
    want_content: bool,
) -> ResolveResult<Option<ResolveResult<Resolved>>> {
    let cache = remote.cache();
    let cached = cache.get_resource(path)?;

    if let Some(resource) = &cached {
        if !is_volatile(key) || remote.retrieval().hit(key).is_some() {
            return Ok(Some(Ok(Resolved::stored(
                resource.clone(),
                ResolutionSource::LocalHit,
                cache,
            ))));
        }
        if remote.is_offline() {
            return Ok(Some(Ok(degraded(remote, resource.clone(), cache, "repository is offline"))));
        }
    }
    if remote.is_offline() {
        return Ok(Some(Err(ResolveError::NotFound(key.clone()))));
    }

    let answer = match remote.retrieval().lookup(key) {
        CacheLookup::Error(message) => Some(failed(remote, key, cached, cache, message, false)),
        CacheLookup::Miss => Some(Err(ResolveError::NotFound(key.clone()))),
        CacheLookup::Hit(resource) if !remote.stores_locally() && !want_content => Some(Ok(
            Resolved::stored(resource, ResolutionSource::Cached, cache),
        )),
        CacheLookup::Hit(_) | CacheLookup::Absent => None,
    };
    Ok(answer)
}

/// Content left in the slot by the request that fetched while we queued.
fn take_shared(remote: &RemoteRepo, ticket: &SlotTicket) -> Option<Resolved> {
    let (resource, content) = ticket.content()?;
    debug!(repo = remote.key(), path = %ticket.path(), "content shared with concurrent fetch");
    Some(Resolved::in_memory(resource, remote.cache(), content))
}

/// Classify a transient failure: remember it (unless it is being replayed
/// from the ERROR table), then fall back to a stale copy when allowed.
fn failed(
    remote: &RemoteRepo,
    key: &RepoPath,
    stale: Option<RepoResource>,
    cache: &Arc<LocalRepo>,
    message: String,
    record: bool,
) -> ResolveResult<Resolved> {
    if record {
        remote.retrieval().record_error(key, message.clone());
    }
    match stale {
        Some(resource) if !remote.is_hard_fail() => Ok(degraded(remote, resource, cache, &message)),
        _ => Err(ResolveError::RemoteTransient {
            path: key.clone(),
            message,
        }),
    }
}

fn degraded(remote: &RemoteRepo, resource: RepoResource, cache: &Arc<LocalRepo>, reason: &str) -> Resolved {
    let warning = format!("serving stale copy from {}: {reason}", cache.key());
    warn!(repo = remote.key(), path = %resource.repo_path, reason, "serving stale cached copy");
    Resolved::stored(resource, ResolutionSource::Degraded { warning }, cache)
}
