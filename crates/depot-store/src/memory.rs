use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use depot_types::{RepoPath, RepoResource};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::handle::ContentHandle;
use crate::traits::StorageBackend;

#[derive(Clone)]
struct Entry {
    resource: RepoResource,
    content: Bytes,
}

/// In-memory, HashMap-based storage backend.
///
/// Intended for tests and embedding. Entries live behind a `RwLock`; content
/// is shared through reference-counted [`Bytes`], so open handles keep
/// serving the bytes they were opened on even if the path is overwritten.
///
/// The store counts open handles and successful writes so callers can
/// assert that handles are released and that rejected content never lands.
pub struct InMemoryStorage {
    entries: RwLock<HashMap<RepoPath, Entry>>,
    open_handles: Arc<AtomicUsize>,
    writes: AtomicU64,
    read_only: AtomicBool,
}

impl InMemoryStorage {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            open_handles: Arc::new(AtomicUsize::new(0)),
            writes: AtomicU64::new(0),
            read_only: AtomicBool::new(false),
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Number of content handles not yet dropped.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    /// Number of successful `put` calls since creation.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make every subsequent `put` and `delete` fail with
    /// [`StoreError::ReadOnly`].
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Raw stored bytes, bypassing handle accounting.
    pub fn content(&self, path: &RepoPath) -> Option<Bytes> {
        let map = self.entries.read().expect("lock poisoned");
        map.get(path).map(|entry| entry.content.clone())
    }

    /// Sorted list of every stored path.
    pub fn all_paths(&self) -> Vec<RepoPath> {
        let map = self.entries.read().expect("lock poisoned");
        let mut paths: Vec<RepoPath> = map.keys().cloned().collect();
        paths.sort();
        paths
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageBackend for InMemoryStorage {
    fn get(&self, path: &RepoPath) -> StoreResult<Option<ContentHandle>> {
        let entry = {
            let map = self.entries.read().expect("lock poisoned");
            match map.get(path) {
                Some(entry) => entry.clone(),
                None => return Ok(None),
            }
        };
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        let counter = Arc::clone(&self.open_handles);
        Ok(Some(ContentHandle::with_release(
            entry.resource,
            entry.content,
            move || {
                counter.fetch_sub(1, Ordering::SeqCst);
            },
        )))
    }

    fn put(
        &self,
        path: &RepoPath,
        content: Bytes,
        resource: RepoResource,
    ) -> StoreResult<RepoResource> {
        self.check_writable()?;
        let received = content.len() as u64;
        if resource.size != received {
            return Err(StoreError::SizeMismatch {
                path: path.clone(),
                declared: resource.size,
                received,
            });
        }
        let stored = RepoResource {
            exists: true,
            ..resource.relocated(path.clone())
        };
        let mut map = self.entries.write().expect("lock poisoned");
        map.insert(
            path.clone(),
            Entry {
                resource: stored.clone(),
                content,
            },
        );
        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!(path = %path, size = received, "stored content");
        Ok(stored)
    }

    fn delete(&self, path: &RepoPath) -> StoreResult<bool> {
        self.check_writable()?;
        let mut map = self.entries.write().expect("lock poisoned");
        Ok(map.remove(path).is_some())
    }

    fn get_resource(&self, path: &RepoPath) -> StoreResult<Option<RepoResource>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.get(path).map(|entry| entry.resource.clone()))
    }
}

impl std::fmt::Debug for InMemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStorage")
            .field("entry_count", &self.len())
            .field("open_handles", &self.open_handles())
            .finish()
    }
}
