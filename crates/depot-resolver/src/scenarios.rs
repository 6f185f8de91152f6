//! End-to-end resolution scenarios against an in-memory origin and store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use depot_crypto::ChecksumCalculator;
use depot_lock::LockMode;
use depot_remote::{InMemoryRemote, RemoteArtifact, RemoteClient};
use depot_repo::{RemoteRepo, RepoResult, RepositoriesConfig};
use depot_store::{InMemoryStorage, StorageBackend};
use depot_types::{ChecksumType, ContextId, RemoteRepoDescriptor, RepoPath};

use crate::context::RequestContext;
use crate::error::{ErrorKind, ResolveError, ResolveResult};
use crate::events::tests::RecordingListener;
use crate::events::{CacheEvent, CacheListener};
use crate::resolution::{Resolution, ResolutionSource};
use crate::service::RepositoryService;

const ORIGIN: &str = "http://origin/maven2";
const RELEASE: &str = "org/acme/lib/1.0/lib-1.0.jar";
const SNAPSHOT: &str = "org/acme/lib/1.0-SNAPSHOT/lib-1.0-SNAPSHOT.jar";
const METADATA: &str = "org/acme/lib/maven-metadata.xml";

struct Harness {
    storage: Arc<InMemoryStorage>,
    origin: Arc<InMemoryRemote>,
    recorder: Arc<RecordingListener>,
    service: Arc<RepositoryService>,
}

impl Harness {
    fn new(config: &str) -> Self {
        let storage = Arc::new(InMemoryStorage::new());
        let origin = Arc::new(InMemoryRemote::new());
        let shared = Arc::clone(&origin);
        let clients = move |_: &RemoteRepoDescriptor| -> RepoResult<Arc<dyn RemoteClient>> {
            Ok(Arc::clone(&shared) as Arc<dyn RemoteClient>)
        };
        let service = RepositoryService::new(
            RepositoriesConfig::from_toml_str(config).unwrap(),
            Arc::clone(&storage) as Arc<dyn StorageBackend>,
            Arc::new(clients),
        )
        .unwrap();
        let recorder = Arc::new(RecordingListener::default());
        service.add_listener(recorder.clone());
        Self {
            storage,
            origin,
            recorder,
            service: Arc::new(service),
        }
    }

    fn serve(&self, path: &str, content: &'static [u8], last_modified: i64) -> RemoteArtifact {
        let artifact = RemoteArtifact::new(content, last_modified);
        self.origin.put_artifact(url(path), artifact.clone());
        artifact
    }

    async fn resolve(&self, key: &str, path: &str) -> ResolveResult<Resolution> {
        self.service
            .resolve(&RequestContext::new(), &RepoPath::new(key, path))
            .await
    }

    fn events(&self) -> Vec<CacheEvent> {
        self.recorder.events.lock().unwrap().clone()
    }
}

fn url(path: &str) -> String {
    format!("{ORIGIN}/{path}")
}

fn remote_config(extra: &str) -> String {
    format!("[[remote]]\nkey = \"repo1\"\nurl = \"{ORIGIN}\"\n{extra}\n")
}

fn sha1(content: &[u8]) -> String {
    ChecksumCalculator::compute_one(ChecksumType::Sha1, content)
}

fn no_declared() -> BTreeMap<ChecksumType, String> {
    BTreeMap::new()
}

#[tokio::test(start_paused = true)]
async fn concurrent_requests_fetch_once() {
    let h = Harness::new(&remote_config(""));
    h.serve(RELEASE, b"jar", 5_000);
    h.origin.set_delay(Some(Duration::from_millis(200)));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&h.service);
            tokio::spawn(async move {
                service
                    .resolve(&RequestContext::new(), &RepoPath::new("repo1", RELEASE))
                    .await
            })
        })
        .collect();
    for task in tasks {
        let resolution = task.await.unwrap().unwrap();
        assert_eq!(resolution.resource.size, 3);
    }

    assert_eq!(h.origin.calls_for(&url(RELEASE)), 1);
    assert_eq!(h.storage.write_count(), 1);
    assert_eq!(h.events().len(), 1);
    let remote = h.service.registry().remote("repo1").unwrap().clone();
    assert!(remote.locks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn missed_retrieval_is_remembered() {
    let h = Harness::new(&remote_config("missed_retrieval_cache_period_secs = 3600"));

    let err = h.resolve("repo1", RELEASE).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    h.serve(RELEASE, b"jar", 5_000);
    let err = h.resolve("repo1", RELEASE).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(h.origin.calls(), 1);

    tokio::time::advance(Duration::from_secs(3601)).await;
    let resolution = h.resolve("repo1", RELEASE).await.unwrap();
    assert_eq!(resolution.source, ResolutionSource::Cached);
    assert_eq!(h.origin.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn zero_miss_ttl_disables_miss_caching() {
    let h = Harness::new(&remote_config("missed_retrieval_cache_period_secs = 0"));
    assert!(h.resolve("repo1", RELEASE).await.is_err());
    assert!(h.resolve("repo1", RELEASE).await.is_err());
    assert_eq!(h.origin.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn cached_release_is_served_without_origin() {
    let h = Harness::new(&remote_config(""));
    h.serve(RELEASE, b"jar", 5_000);

    let first = h.resolve("repo1", RELEASE).await.unwrap();
    assert_eq!(first.source, ResolutionSource::Cached);
    assert_eq!(first.resource.repo_path, RepoPath::new("repo1-cache", RELEASE));

    tokio::time::advance(Duration::from_secs(100_000)).await;
    let second = h.resolve("repo1-cache", RELEASE).await.unwrap();
    assert_eq!(second.source, ResolutionSource::LocalHit);
    assert_eq!(h.origin.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_failure_serves_stale_copy() {
    let h = Harness::new(&remote_config("retrieval_cache_period_secs = 60"));
    h.serve(SNAPSHOT, b"snap", 5_000);
    h.resolve("repo1", SNAPSHOT).await.unwrap();

    tokio::time::advance(Duration::from_secs(61)).await;
    h.origin.fail(url(SNAPSHOT), "connection reset");
    let resolution = h.resolve("repo1", SNAPSHOT).await.unwrap();
    assert!(resolution.is_degraded());
    assert!(resolution.warning().unwrap().contains("connection reset"));
    assert_eq!(h.origin.calls(), 2);

    // Within the error TTL the failure is replayed without a fetch.
    let again = h.resolve("repo1", SNAPSHOT).await.unwrap();
    assert!(again.is_degraded());
    assert_eq!(h.origin.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn hard_fail_surfaces_transient_failure() {
    let h = Harness::new(&remote_config("retrieval_cache_period_secs = 60\nhard_fail = true"));
    h.serve(SNAPSHOT, b"snap", 5_000);
    h.resolve("repo1", SNAPSHOT).await.unwrap();

    tokio::time::advance(Duration::from_secs(61)).await;
    h.origin.fail(url(SNAPSHOT), "connection reset");
    let err = h.resolve("repo1", SNAPSHOT).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteTransient);
}

#[tokio::test(start_paused = true)]
async fn transient_failure_without_copy_fails() {
    let h = Harness::new(&remote_config(""));
    h.origin.fail(url(RELEASE), "503");
    let err = h.resolve("repo1", RELEASE).await.unwrap_err();
    assert!(matches!(err, ResolveError::RemoteTransient { .. }));

    tokio::time::advance(Duration::from_secs(31)).await;
    h.serve(RELEASE, b"jar", 5_000);
    assert!(h.resolve("repo1", RELEASE).await.is_ok());
    assert_eq!(h.origin.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn reject_policy_writes_nothing() {
    let h = Harness::new(&remote_config("checksum_policy = \"fail\""));
    let artifact = RemoteArtifact::new(&b"jar"[..], 5_000).with_checksum(ChecksumType::Sha1, "0".repeat(40));
    h.origin.put_artifact(url(RELEASE), artifact);

    let err = h.resolve("repo1", RELEASE).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RejectedByPolicy);
    assert_eq!(h.storage.write_count(), 0);
    assert!(h.events().is_empty());

    // The rejection is remembered as a failed retrieval.
    let err = h.resolve("repo1", RELEASE).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteTransient);
    assert_eq!(h.origin.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn verify_policy_accepts_any_matching_algorithm() {
    let h = Harness::new(&remote_config("checksum_policy = \"verify\""));
    let artifact = RemoteArtifact::new(&b"jar"[..], 5_000)
        .with_checksum(ChecksumType::Md5, "0".repeat(32))
        .with_checksum(ChecksumType::Sha1, sha1(b"jar"));
    h.origin.put_artifact(url(RELEASE), artifact.clone());
    assert!(h.resolve("repo1", RELEASE).await.is_ok());

    // The same artifact under the fail policy is refused for its md5.
    let strict = Harness::new(&remote_config("checksum_policy = \"fail\""));
    strict.origin.put_artifact(url(RELEASE), artifact);
    let err = strict.resolve("repo1", RELEASE).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RejectedByPolicy);
}

#[tokio::test(start_paused = true)]
async fn generated_checksum_is_served_for_sidecar() {
    let h = Harness::new(&remote_config(""));
    h.serve(RELEASE, b"jar", 5_000);

    let sidecar = RepoPath::new("repo1", format!("{RELEASE}.sha1"));
    let value = h
        .service
        .resolve_checksum(&RequestContext::new(), &sidecar)
        .await
        .unwrap();
    assert_eq!(value, sha1(b"jar"));
}

#[tokio::test(start_paused = true)]
async fn verify_policy_rejects_undeclared_checksums() {
    let h = Harness::new(&remote_config("checksum_policy = \"verify\""));
    h.serve(RELEASE, b"jar", 5_000);

    let err = h.resolve("repo1", RELEASE).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RejectedByPolicy);
}

#[tokio::test(start_paused = true)]
async fn expired_snapshot_revalidates_without_download() {
    let h = Harness::new(&remote_config("retrieval_cache_period_secs = 60"));
    h.serve(SNAPSHOT, b"snap", 5_000);
    h.resolve("repo1", SNAPSHOT).await.unwrap();

    let fresh = h.resolve("repo1", SNAPSHOT).await.unwrap();
    assert_eq!(fresh.source, ResolutionSource::LocalHit);
    assert_eq!(h.origin.calls(), 1);

    tokio::time::advance(Duration::from_secs(61)).await;
    let revalidated = h.resolve("repo1", SNAPSHOT).await.unwrap();
    assert_eq!(revalidated.source, ResolutionSource::Cached);
    assert_eq!(h.origin.calls(), 2);
    assert_eq!(h.storage.write_count(), 1);
    assert_eq!(h.events().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn changed_metadata_is_downloaded_again() {
    let h = Harness::new(&remote_config("retrieval_cache_period_secs = 60"));
    h.serve(METADATA, b"<metadata/>", 5_000);
    h.resolve("repo1", METADATA).await.unwrap();

    h.serve(METADATA, b"<metadata>v2</metadata>", 90_000);
    let stale = h.resolve("repo1", METADATA).await.unwrap();
    assert_eq!(stale.resource.size, 11);

    let zapped = h.service.zap(&RepoPath::new("repo1", METADATA)).unwrap();
    assert_eq!(zapped, 1);
    let updated = h.resolve("repo1", METADATA).await.unwrap();
    assert_eq!(updated.resource.size, 23);
    assert_eq!(h.storage.write_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn unexpire_forgets_miss() {
    let h = Harness::new(&format!(
        "{}\n[[virtual]]\nkey = \"all\"\nmembers = [\"repo1\"]\n",
        remote_config("")
    ));
    assert!(h.resolve("repo1", RELEASE).await.is_err());
    h.serve(RELEASE, b"jar", 5_000);
    assert!(h.resolve("repo1", RELEASE).await.is_err());

    let dropped = h.service.unexpire(&RepoPath::new("all", RELEASE)).unwrap();
    assert_eq!(dropped, 1);
    assert!(h.resolve("all", RELEASE).await.is_ok());
    assert_eq!(h.origin.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn offline_remote_never_fetches() {
    let h = Harness::new(&remote_config("offline = true"));
    h.serve(RELEASE, b"jar", 5_000);
    let err = h.resolve("repo1", RELEASE).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(h.origin.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn offline_remote_serves_stale_snapshot() {
    let h = Harness::new(&remote_config("retrieval_cache_period_secs = 60"));
    h.serve(SNAPSHOT, b"snap", 5_000);
    h.resolve("repo1", SNAPSHOT).await.unwrap();

    let offline = remote_config("retrieval_cache_period_secs = 60\noffline = true");
    h.service
        .reload(RepositoriesConfig::from_toml_str(&offline).unwrap())
        .unwrap();
    let resolution = h.resolve("repo1", SNAPSHOT).await.unwrap();
    assert!(resolution.is_degraded());
    assert_eq!(h.origin.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn filter_rejects_before_origin() {
    let h = Harness::new(&remote_config("includes = [\"org/**\"]"));
    let err = h.resolve("repo1", "com/other/x.jar").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PathRejected);
    assert_eq!(h.origin.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn double_star_include_refuses_other_files() {
    let h = Harness::new(&remote_config("includes = [\"**/*.jar\"]"));
    h.serve("org/acme/lib/1.0/lib-1.0.pom", b"pom", 5_000);
    h.serve(RELEASE, b"jar", 5_000);

    let err = h.resolve("repo1", "org/acme/lib/1.0/lib-1.0.pom").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PathRejected);
    assert_eq!(h.origin.calls(), 0);

    assert!(h.resolve("repo1", RELEASE).await.is_ok());
    assert_eq!(h.origin.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn virtual_follows_member_order() {
    let config = format!(
        "[[local]]\nkey = \"libs\"\n\n{}\n[[virtual]]\nkey = \"local-first\"\nmembers = [\"libs\", \"repo1\"]\n\n[[virtual]]\nkey = \"remote-first\"\nmembers = [\"repo1-cache\", \"libs\"]\n",
        remote_config("")
    );
    let h = Harness::new(&config);
    h.serve(RELEASE, b"remote", 5_000);
    h.service
        .save(&RequestContext::new(), &RepoPath::new("libs", RELEASE), Bytes::from_static(b"local"), &no_declared())
        .await
        .unwrap();

    let local = h.resolve("local-first", RELEASE).await.unwrap();
    assert_eq!(local.resource.repo_path.repo_key(), "libs");
    assert_eq!(h.origin.calls(), 0);

    let remote = h.resolve("remote-first", RELEASE).await.unwrap();
    assert_eq!(remote.resource.repo_path.repo_key(), "repo1-cache");
    assert_eq!(h.origin.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn virtual_skips_failing_member() {
    let config = format!(
        "{}\n[[local]]\nkey = \"libs\"\n\n[[virtual]]\nkey = \"all\"\nmembers = [\"repo1\", \"libs\"]\n",
        remote_config("")
    );
    let h = Harness::new(&config);
    h.origin.fail(url(RELEASE), "503");
    h.service
        .save(&RequestContext::new(), &RepoPath::new("libs", RELEASE), Bytes::from_static(b"local"), &no_declared())
        .await
        .unwrap();

    let resolution = h.resolve("all", RELEASE).await.unwrap();
    assert_eq!(resolution.source, ResolutionSource::LocalHit);
    let err = h.resolve("all", "org/acme/none.jar").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test(start_paused = true)]
async fn global_virtual_sees_everything() {
    let h = Harness::new(&format!("[[local]]\nkey = \"libs\"\n\n{}", remote_config("")));
    h.serve(RELEASE, b"jar", 5_000);
    let resolution = h.resolve("repo", RELEASE).await.unwrap();
    assert_eq!(resolution.resource.repo_path.repo_key(), "repo1-cache");
}

#[tokio::test(start_paused = true)]
async fn storage_fault_is_not_cached() {
    let h = Harness::new(&remote_config(""));
    h.serve(RELEASE, b"jar", 5_000);
    h.storage.set_read_only(true);
    let err = h.resolve("repo1", RELEASE).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(h.events().is_empty());

    h.storage.set_read_only(false);
    assert!(h.resolve("repo1", RELEASE).await.is_ok());
    assert_eq!(h.origin.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn non_storing_remote_serves_from_memory() {
    let h = Harness::new(&remote_config("store_artifacts_locally = false"));
    h.serve(RELEASE, b"jar", 5_000);

    let resolution = h.resolve("repo1", RELEASE).await.unwrap();
    assert_eq!(resolution.source, ResolutionSource::Cached);
    assert!(h.resolve("repo1", RELEASE).await.is_ok());
    assert_eq!(h.origin.calls(), 1);

    let mut handle = h
        .service
        .get_content(&RequestContext::new(), &RepoPath::new("repo1", RELEASE))
        .await
        .unwrap();
    assert_eq!(handle.read_remaining(), Bytes::from_static(b"jar"));
    assert_eq!(h.storage.write_count(), 0);
    assert!(h.events().is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_content_requests_share_one_fetch() {
    let h = Harness::new(&remote_config("store_artifacts_locally = false"));
    h.serve(RELEASE, b"jar", 5_000);
    h.origin.set_delay(Some(Duration::from_millis(200)));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&h.service);
            tokio::spawn(async move {
                service
                    .get_content(&RequestContext::new(), &RepoPath::new("repo1", RELEASE))
                    .await
            })
        })
        .collect();
    for task in tasks {
        let mut handle = task.await.unwrap().unwrap();
        assert_eq!(handle.read_remaining(), Bytes::from_static(b"jar"));
    }

    assert_eq!(h.origin.calls_for(&url(RELEASE)), 1);
    assert_eq!(h.storage.write_count(), 0);
    let remote = h.service.registry().remote("repo1").unwrap().clone();
    assert!(remote.content_slots().is_empty());

    // Once the burst is over the bytes are gone; the next reader refetches.
    h.service
        .get_content(&RequestContext::new(), &RepoPath::new("repo1", RELEASE))
        .await
        .unwrap();
    assert_eq!(h.origin.calls_for(&url(RELEASE)), 2);
}

/// Slow listener noting whether another context could lock the path it
/// is told about.
struct LockStateListener {
    remote: Arc<RemoteRepo>,
    lockable: Mutex<Vec<bool>>,
}

#[async_trait]
impl CacheListener for LockStateListener {
    async fn on_commit(&self, event: &CacheEvent) -> ResolveResult<()> {
        let key = self.remote.retrieval_path(event.resource().repo_path.path());
        let guard = self.remote.locks().try_acquire(&key, ContextId::new(), LockMode::Write);
        self.lockable.lock().unwrap().push(guard.is_some());
        drop(guard);
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn listeners_run_after_path_lock_is_released() {
    let h = Harness::new(&remote_config(""));
    h.serve(RELEASE, b"jar", 5_000);
    let remote = h.service.registry().remote("repo1").unwrap().clone();
    let listener = Arc::new(LockStateListener {
        remote: Arc::clone(&remote),
        lockable: Mutex::new(Vec::new()),
    });
    h.service.add_listener(listener.clone());

    let service = Arc::clone(&h.service);
    let first = tokio::spawn(async move {
        service
            .resolve(&RequestContext::new(), &RepoPath::new("repo1", RELEASE))
            .await
    });
    tokio::time::sleep(Duration::from_secs(1)).await;

    // The first request is still inside its slow listener.
    assert!(!first.is_finished());
    let waiter = remote
        .locks()
        .write(&remote.retrieval_path(RELEASE), ContextId::new(), Duration::from_secs(2))
        .await;
    assert!(waiter.is_ok());
    drop(waiter);

    first.await.unwrap().unwrap();
    assert_eq!(*listener.lockable.lock().unwrap(), vec![true]);
    assert_eq!(h.events().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn content_handles_are_released() {
    let h = Harness::new(&remote_config(""));
    h.serve(RELEASE, b"jar", 5_000);
    let path = RepoPath::new("repo1", RELEASE);

    let mut handle = h.service.get_content(&RequestContext::new(), &path).await.unwrap();
    assert_eq!(h.storage.open_handles(), 1);
    assert_eq!(handle.read_remaining(), Bytes::from_static(b"jar"));
    drop(handle);
    assert_eq!(h.storage.open_handles(), 0);

    let missing = RepoPath::new("repo1", "org/acme/none.jar");
    assert!(h.service.get_content(&RequestContext::new(), &missing).await.is_err());
    assert_eq!(h.storage.open_handles(), 0);
}

#[tokio::test(start_paused = true)]
async fn contended_lock_times_out() {
    let h = Harness::new(&remote_config(""));
    h.serve(RELEASE, b"jar", 5_000);
    let registry = h.service.registry();
    let remote = registry.remote("repo1").unwrap();
    let held = remote
        .locks()
        .write(&remote.retrieval_path(RELEASE), ContextId::new(), Duration::from_secs(1))
        .await
        .unwrap();

    let ctx = RequestContext::new().with_lock_timeout(Duration::from_secs(2));
    let err = h
        .service
        .resolve(&ctx, &RepoPath::new("repo1", RELEASE))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(h.origin.calls(), 0);

    // The holder's own context re-enters the lock.
    let owner = RequestContext::with_id(held.context());
    assert!(h.service.resolve(&owner, &RepoPath::new("repo1", RELEASE)).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn slow_origin_is_a_transient_failure() {
    let h = Harness::new(&format!("{}\n[resolver]\nfetch_timeout_secs = 5\n", remote_config("")));
    h.serve(RELEASE, b"jar", 5_000);
    h.origin.set_delay(Some(Duration::from_secs(120)));

    let err = h.resolve("repo1", RELEASE).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RemoteTransient);
    assert_eq!(h.storage.write_count(), 0);
}

#[tokio::test]
async fn client_trust_deploy_checks_declared_checksum() {
    let h = Harness::new("[[local]]\nkey = \"libs\"\n");
    let path = RepoPath::new("libs", RELEASE);
    let ctx = RequestContext::new();

    let mut wrong = BTreeMap::new();
    wrong.insert(ChecksumType::Sha1, "0".repeat(40));
    let err = h
        .service
        .save(&ctx, &path, Bytes::from_static(b"jar"), &wrong)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RejectedByPolicy);
    assert_eq!(h.storage.write_count(), 0);

    let mut right = BTreeMap::new();
    right.insert(ChecksumType::Sha1, sha1(b"jar").to_uppercase());
    let stored = h
        .service
        .save(&ctx, &path, Bytes::from_static(b"jar"), &right)
        .await
        .unwrap();
    assert_eq!(stored.checksums.original(ChecksumType::Sha1), Some(sha1(b"jar").as_str()));
    assert_eq!(h.events(), vec![CacheEvent::Deployed(stored)]);
}

#[tokio::test]
async fn server_trust_deploy_ignores_declared_checksum() {
    let h = Harness::new("[[local]]\nkey = \"libs\"\nchecksum_policy = \"server\"\n");
    let path = RepoPath::new("libs", RELEASE);
    let ctx = RequestContext::new();

    let mut wrong = BTreeMap::new();
    wrong.insert(ChecksumType::Sha1, "0".repeat(40));
    h.service
        .save(&ctx, &path, Bytes::from_static(b"jar"), &wrong)
        .await
        .unwrap();

    let sidecar = RepoPath::new("libs", format!("{RELEASE}.sha1"));
    assert_eq!(h.service.resolve_checksum(&ctx, &sidecar).await.unwrap(), sha1(b"jar"));
}

#[tokio::test]
async fn deployed_sidecar_becomes_original_checksum() {
    let h = Harness::new("[[local]]\nkey = \"libs\"\n");
    let ctx = RequestContext::new();
    h.service
        .save(&ctx, &RepoPath::new("libs", RELEASE), Bytes::from_static(b"jar"), &no_declared())
        .await
        .unwrap();

    let sidecar = RepoPath::new("libs", format!("{RELEASE}.sha1"));
    let body = format!("{}  lib-1.0.jar\n", sha1(b"jar"));
    let updated = h
        .service
        .save(&ctx, &sidecar, Bytes::from(body), &no_declared())
        .await
        .unwrap();

    assert_eq!(updated.repo_path, RepoPath::new("libs", RELEASE));
    assert_eq!(updated.checksums.original(ChecksumType::Sha1), Some(sha1(b"jar").as_str()));
    assert!(h.storage.content(&sidecar).is_none());
    assert_eq!(h.service.resolve_checksum(&ctx, &sidecar).await.unwrap(), sha1(b"jar"));
}

#[tokio::test]
async fn remote_is_not_deployable() {
    let h = Harness::new(&remote_config(""));
    let err = h
        .service
        .save(&RequestContext::new(), &RepoPath::new("repo1", RELEASE), Bytes::from_static(b"jar"), &no_declared())
        .await
        .unwrap_err();
    assert!(matches!(err, ResolveError::NotDeployable(key) if key == "repo1"));
}

#[tokio::test]
async fn unknown_repository() {
    let h = Harness::new(&remote_config(""));
    let err = h.resolve("nope", RELEASE).await.unwrap_err();
    assert!(matches!(err, ResolveError::UnknownRepository(_)));
}
