use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use std::time::Duration;

use depot_types::{RemoteRepoDescriptor, RepoPath, RepoResource};
use tokio::time::Instant;
use tracing::{debug, warn};

/// Which retrieval table holds a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheClass {
    Hit,
    Miss,
    Error,
}

impl fmt::Display for CacheClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hit => f.write_str("HIT"),
            Self::Miss => f.write_str("MISS"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

/// Result of consulting the retrieval cache before contacting an origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheLookup {
    /// A recent transient failure; the message describes it.
    Error(String),
    /// The origin recently confirmed the path does not exist.
    Miss,
    /// The path was recently fetched; the payload is its metadata.
    Hit(RepoResource),
    /// Nothing unexpired is known; the origin must be asked.
    Absent,
}

impl CacheLookup {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    pub fn class(&self) -> Option<CacheClass> {
        match self {
            Self::Error(_) => Some(CacheClass::Error),
            Self::Miss => Some(CacheClass::Miss),
            Self::Hit(_) => Some(CacheClass::Hit),
            Self::Absent => None,
        }
    }
}

/// Time-to-live of each table. A zero TTL disables the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetrievalTtls {
    pub hit: Duration,
    pub miss: Duration,
    pub error: Duration,
}

impl RetrievalTtls {
    pub fn from_descriptor(descriptor: &RemoteRepoDescriptor) -> Self {
        Self {
            hit: Duration::from_secs(descriptor.retrieval_cache_period_secs),
            miss: Duration::from_secs(descriptor.missed_retrieval_cache_period_secs),
            error: Duration::from_secs(descriptor.failed_retrieval_cache_period_secs),
        }
    }

    fn for_class(&self, class: CacheClass) -> Duration {
        match class {
            CacheClass::Hit => self.hit,
            CacheClass::Miss => self.miss,
            CacheClass::Error => self.error,
        }
    }
}

#[derive(Clone, Debug)]
struct Timed<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Timed<T> {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Default)]
struct Tables {
    hits: HashMap<RepoPath, Timed<RepoResource>>,
    misses: HashMap<RepoPath, Timed<()>>,
    errors: HashMap<RepoPath, Timed<String>>,
}

impl Tables {
    fn evict(&mut self, path: &RepoPath) {
        self.hits.remove(path);
        self.misses.remove(path);
        self.errors.remove(path);
    }
}

/// Per-repository HIT / MISS / ERROR tables.
///
/// All three tables sit behind one lock so that classifying a path is a
/// single atomic step: insert into one table, evict from the other two.
/// Expired rows are purged lazily when looked up, or in bulk through
/// [`purge_expired`](Self::purge_expired).
pub struct RetrievalCache {
    repo_key: String,
    ttls: RetrievalTtls,
    tables: RwLock<Tables>,
}

impl RetrievalCache {
    pub fn new(repo_key: impl Into<String>, ttls: RetrievalTtls) -> Self {
        Self {
            repo_key: repo_key.into(),
            ttls,
            tables: RwLock::new(Tables::default()),
        }
    }

    pub fn for_descriptor(descriptor: &RemoteRepoDescriptor) -> Self {
        Self::new(descriptor.key.clone(), RetrievalTtls::from_descriptor(descriptor))
    }

    pub fn ttls(&self) -> RetrievalTtls {
        self.ttls
    }

    /// Consult the tables in ERROR, MISS, HIT order.
    pub fn lookup(&self, path: &RepoPath) -> CacheLookup {
        let now = Instant::now();
        {
            let tables = self.tables.read().expect("lock poisoned");
            if let Some(entry) = tables.errors.get(path).filter(|e| e.is_live(now)) {
                return CacheLookup::Error(entry.value.clone());
            }
            if tables.misses.get(path).is_some_and(|e| e.is_live(now)) {
                return CacheLookup::Miss;
            }
            if let Some(entry) = tables.hits.get(path).filter(|e| e.is_live(now)) {
                return CacheLookup::Hit(entry.value.clone());
            }
            let stale = tables.errors.contains_key(path)
                || tables.misses.contains_key(path)
                || tables.hits.contains_key(path);
            if !stale {
                return CacheLookup::Absent;
            }
        }
        let mut tables = self.tables.write().expect("lock poisoned");
        purge_path(&mut tables, path, now);
        CacheLookup::Absent
    }

    /// Unexpired HIT payload for a path, ignoring the other tables.
    pub fn hit(&self, path: &RepoPath) -> Option<RepoResource> {
        let now = Instant::now();
        let tables = self.tables.read().expect("lock poisoned");
        tables
            .hits
            .get(path)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone())
    }

    /// Remember a successful fetch.
    pub fn record_hit(&self, path: &RepoPath, resource: RepoResource) {
        self.record(path, CacheClass::Hit, |tables, expires_at| {
            tables.hits.insert(
                path.clone(),
                Timed {
                    value: resource,
                    expires_at,
                },
            );
        });
    }

    /// Remember a confirmed absence at the origin.
    pub fn record_miss(&self, path: &RepoPath) {
        self.record(path, CacheClass::Miss, |tables, expires_at| {
            tables.misses.insert(
                path.clone(),
                Timed {
                    value: (),
                    expires_at,
                },
            );
        });
    }

    /// Remember a transient origin failure.
    pub fn record_error(&self, path: &RepoPath, message: impl Into<String>) {
        let message = message.into();
        warn!(repo = %self.repo_key, path = %path, error = %message, "caching remote failure");
        self.record(path, CacheClass::Error, |tables, expires_at| {
            tables.errors.insert(
                path.clone(),
                Timed {
                    value: message,
                    expires_at,
                },
            );
        });
    }

    fn record(
        &self,
        path: &RepoPath,
        class: CacheClass,
        insert: impl FnOnce(&mut Tables, Instant),
    ) {
        let ttl = self.ttls.for_class(class);
        let mut tables = self.tables.write().expect("lock poisoned");
        tables.evict(path);
        if ttl.is_zero() {
            return;
        }
        insert(&mut tables, Instant::now() + ttl);
        debug!(repo = %self.repo_key, path = %path, class = %class, ttl_secs = ttl.as_secs(), "retrieval cached");
    }

    /// Drop MISS and ERROR rows for a path so the next lookup asks the
    /// origin again. HIT rows are kept.
    pub fn unexpire(&self, path: &RepoPath) -> bool {
        let mut tables = self.tables.write().expect("lock poisoned");
        let miss = tables.misses.remove(path).is_some();
        let error = tables.errors.remove(path).is_some();
        miss || error
    }

    /// Drop the HIT row for a path, forcing revalidation of cached content.
    pub fn zap(&self, path: &RepoPath) -> bool {
        let mut tables = self.tables.write().expect("lock poisoned");
        tables.hits.remove(path).is_some()
    }

    /// Discard every row in every table.
    pub fn clear(&self) {
        let mut tables = self.tables.write().expect("lock poisoned");
        *tables = Tables::default();
    }

    /// Remove every expired row, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut tables = self.tables.write().expect("lock poisoned");
        let before = tables.hits.len() + tables.misses.len() + tables.errors.len();
        tables.hits.retain(|_, e| e.is_live(now));
        tables.misses.retain(|_, e| e.is_live(now));
        tables.errors.retain(|_, e| e.is_live(now));
        before - (tables.hits.len() + tables.misses.len() + tables.errors.len())
    }

    /// Number of rows, expired or not, across all tables.
    pub fn len(&self) -> usize {
        let tables = self.tables.read().expect("lock poisoned");
        tables.hits.len() + tables.misses.len() + tables.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn purge_path(tables: &mut Tables, path: &RepoPath, now: Instant) {
    if tables.hits.get(path).is_some_and(|e| !e.is_live(now)) {
        tables.hits.remove(path);
    }
    if tables.misses.get(path).is_some_and(|e| !e.is_live(now)) {
        tables.misses.remove(path);
    }
    if tables.errors.get(path).is_some_and(|e| !e.is_live(now)) {
        tables.errors.remove(path);
    }
}

impl fmt::Debug for RetrievalCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetrievalCache")
            .field("repo_key", &self.repo_key)
            .field("ttls", &self.ttls)
            .field("rows", &self.len())
            .finish()
    }
}
