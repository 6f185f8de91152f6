use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use depot_types::{ContextId, RepoPath};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::error::{LockError, LockResult};

/// Lock flavour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LockMode {
    Read,
    Write,
}

impl fmt::Display for LockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

#[derive(Debug, Default)]
struct LockState {
    writer: Option<(ContextId, usize)>,
    readers: HashMap<ContextId, usize>,
    waiting_writers: usize,
}

impl LockState {
    fn try_read(&mut self, ctx: ContextId) -> bool {
        let reentrant = self.readers.contains_key(&ctx)
            || self.writer.is_some_and(|(owner, _)| owner == ctx);
        if reentrant || (self.writer.is_none() && self.waiting_writers == 0) {
            *self.readers.entry(ctx).or_insert(0) += 1;
            return true;
        }
        false
    }

    fn try_write(&mut self, ctx: ContextId) -> bool {
        if let Some((owner, count)) = &mut self.writer {
            if *owner != ctx {
                return false;
            }
            *count += 1;
            return true;
        }
        // A context may upgrade its own read hold when it is the only reader.
        if self.readers.keys().all(|reader| *reader == ctx) {
            self.writer = Some((ctx, 1));
            return true;
        }
        false
    }

    fn release(&mut self, ctx: ContextId, mode: LockMode) {
        match mode {
            LockMode::Read => {
                if let Some(count) = self.readers.get_mut(&ctx) {
                    *count -= 1;
                    if *count == 0 {
                        self.readers.remove(&ctx);
                    }
                }
            }
            LockMode::Write => {
                if let Some((_, count)) = &mut self.writer {
                    *count -= 1;
                    if *count == 0 {
                        self.writer = None;
                    }
                }
            }
        }
    }

    fn is_idle(&self) -> bool {
        self.writer.is_none() && self.readers.is_empty() && self.waiting_writers == 0
    }
}

#[derive(Debug, Default)]
struct PathLock {
    state: Mutex<LockState>,
    released: Notify,
}

type LockMap = Mutex<HashMap<RepoPath, Arc<PathLock>>>;

/// Table of per-path locks owned by one repository.
///
/// Entries are created on first acquisition and removed once nobody holds
/// or waits for them.
#[derive(Default)]
pub struct LockTable {
    locks: Arc<LockMap>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire a shared lock, waiting at most `timeout`.
    pub async fn read(
        &self,
        path: &RepoPath,
        ctx: ContextId,
        timeout: Duration,
    ) -> LockResult<LockGuard> {
        self.acquire(path, ctx, LockMode::Read, timeout).await
    }

    /// Acquire an exclusive lock, waiting at most `timeout`.
    pub async fn write(
        &self,
        path: &RepoPath,
        ctx: ContextId,
        timeout: Duration,
    ) -> LockResult<LockGuard> {
        self.acquire(path, ctx, LockMode::Write, timeout).await
    }

    /// Acquire without waiting.
    pub fn try_acquire(&self, path: &RepoPath, ctx: ContextId, mode: LockMode) -> Option<LockGuard> {
        let lock = self.entry(path);
        let acquired = {
            let mut state = lock.state.lock().expect("lock poisoned");
            match mode {
                LockMode::Read => state.try_read(ctx),
                LockMode::Write => state.try_write(ctx),
            }
        };
        if acquired {
            Some(self.guard(path, ctx, mode, lock))
        } else {
            prune(&self.locks, path, &lock);
            None
        }
    }

    async fn acquire(
        &self,
        path: &RepoPath,
        ctx: ContextId,
        mode: LockMode,
        timeout: Duration,
    ) -> LockResult<LockGuard> {
        let lock = self.entry(path);
        let waited = tokio::time::timeout(timeout, wait_for(&lock, ctx, mode)).await;
        match waited {
            Ok(()) => Ok(self.guard(path, ctx, mode, lock)),
            Err(_) => {
                warn!(path = %path, ctx = %ctx, mode = %mode, ?timeout, "lock wait timed out");
                prune(&self.locks, path, &lock);
                Err(LockError::Timeout {
                    path: path.clone(),
                    mode,
                    waited: timeout,
                })
            }
        }
    }

    fn entry(&self, path: &RepoPath) -> Arc<PathLock> {
        let mut locks = self.locks.lock().expect("lock poisoned");
        Arc::clone(locks.entry(path.clone()).or_default())
    }

    fn guard(&self, path: &RepoPath, ctx: ContextId, mode: LockMode, lock: Arc<PathLock>) -> LockGuard {
        debug!(path = %path, ctx = %ctx, mode = %mode, "lock acquired");
        LockGuard {
            locks: Arc::clone(&self.locks),
            path: path.clone(),
            ctx,
            mode,
            lock,
        }
    }

    /// Number of paths with an active entry.
    pub fn len(&self) -> usize {
        self.locks.lock().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if any context holds a lock on `path`.
    pub fn is_locked(&self, path: &RepoPath) -> bool {
        let locks = self.locks.lock().expect("lock poisoned");
        locks.get(path).is_some_and(|lock| {
            let state = lock.state.lock().expect("lock poisoned");
            state.writer.is_some() || !state.readers.is_empty()
        })
    }
}

impl fmt::Debug for LockTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockTable").field("entries", &self.len()).finish()
    }
}

/// Registers a waiting writer for as long as it lives, so readers queue
/// behind it; dropping it (acquired, timed out or cancelled) unregisters.
struct WriterTicket<'a> {
    lock: &'a PathLock,
}

impl<'a> WriterTicket<'a> {
    fn new(lock: &'a PathLock) -> Self {
        lock.state.lock().expect("lock poisoned").waiting_writers += 1;
        Self { lock }
    }
}

impl Drop for WriterTicket<'_> {
    fn drop(&mut self) {
        self.lock.state.lock().expect("lock poisoned").waiting_writers -= 1;
        self.lock.released.notify_waiters();
    }
}

async fn wait_for(lock: &PathLock, ctx: ContextId, mode: LockMode) {
    let _ticket = (mode == LockMode::Write).then(|| WriterTicket::new(lock));
    loop {
        let notified = lock.released.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        {
            let mut state = lock.state.lock().expect("lock poisoned");
            let acquired = match mode {
                LockMode::Read => state.try_read(ctx),
                LockMode::Write => state.try_write(ctx),
            };
            if acquired {
                return;
            }
        }
        notified.await;
    }
}

fn prune(locks: &LockMap, path: &RepoPath, lock: &Arc<PathLock>) {
    let mut map = locks.lock().expect("lock poisoned");
    // One reference in the map, one held by the caller.
    if Arc::strong_count(lock) <= 2 && lock.state.lock().expect("lock poisoned").is_idle() {
        map.remove(path);
    }
}

/// A held lock on one path. Released when dropped.
pub struct LockGuard {
    locks: Arc<LockMap>,
    path: RepoPath,
    ctx: ContextId,
    mode: LockMode,
    lock: Arc<PathLock>,
}

impl LockGuard {
    pub fn path(&self) -> &RepoPath {
        &self.path
    }

    pub fn context(&self) -> ContextId {
        self.ctx
    }

    pub fn mode(&self) -> LockMode {
        self.mode
    }

    /// Turn a write hold into a read hold in one step. No other writer can
    /// slip in between; readers of other contexts may now join.
    pub fn downgrade(mut self) -> LockGuard {
        if self.mode == LockMode::Read {
            return self;
        }
        {
            let mut state = self.lock.state.lock().expect("lock poisoned");
            *state.readers.entry(self.ctx).or_insert(0) += 1;
            state.release(self.ctx, LockMode::Write);
        }
        self.mode = LockMode::Read;
        self.lock.released.notify_waiters();
        debug!(path = %self.path, ctx = %self.ctx, "lock downgraded");
        self
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.lock
            .state
            .lock()
            .expect("lock poisoned")
            .release(self.ctx, self.mode);
        self.lock.released.notify_waiters();
        prune(&self.locks, &self.path, &self.lock);
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard")
            .field("path", &self.path)
            .field("ctx", &self.ctx)
            .field("mode", &self.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(5);

    fn path() -> RepoPath {
        RepoPath::new("repo1", "org/acme/lib.jar")
    }

    #[tokio::test]
    async fn write_is_reentrant_per_context() {
        let table = LockTable::new();
        let ctx = ContextId::new();
        let outer = table.write(&path(), ctx, WAIT).await.unwrap();
        let inner = table.write(&path(), ctx, WAIT).await.unwrap();
        let read = table.read(&path(), ctx, WAIT).await.unwrap();

        assert!(table.try_acquire(&path(), ContextId::new(), LockMode::Read).is_none());
        drop(inner);
        drop(read);
        assert!(table.is_locked(&path()));
        drop(outer);
        assert!(!table.is_locked(&path()));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn readers_share() {
        let table = LockTable::new();
        let a = table.read(&path(), ContextId::new(), WAIT).await.unwrap();
        let b = table.read(&path(), ContextId::new(), WAIT).await.unwrap();
        assert!(table.try_acquire(&path(), ContextId::new(), LockMode::Write).is_none());
        drop(a);
        drop(b);
        assert!(table
            .try_acquire(&path(), ContextId::new(), LockMode::Write)
            .is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn contended_write_times_out() {
        let table = LockTable::new();
        let _held = table.write(&path(), ContextId::new(), WAIT).await.unwrap();
        let err = table
            .write(&path(), ContextId::new(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LockError::Timeout { mode: LockMode::Write, .. }));
        assert_eq!(table.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_writer_unblocks_readers() {
        let table = LockTable::new();
        let reader = table.read(&path(), ContextId::new(), WAIT).await.unwrap();
        let _ = table.write(&path(), ContextId::new(), Duration::from_secs(1)).await;
        assert!(table
            .try_acquire(&path(), ContextId::new(), LockMode::Read)
            .is_some());
        drop(reader);
    }

    #[tokio::test]
    async fn waiting_writer_blocks_new_readers() {
        let table = Arc::new(LockTable::new());
        let first = table.read(&path(), ContextId::new(), WAIT).await.unwrap();

        let writer_table = Arc::clone(&table);
        let writer = tokio::spawn(async move {
            let guard = writer_table.write(&path(), ContextId::new(), WAIT).await.unwrap();
            guard.mode()
        });
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }

        assert!(
            table.try_acquire(&path(), ContextId::new(), LockMode::Read).is_none(),
            "reader must queue behind waiting writer"
        );
        drop(first);
        assert_eq!(writer.await.unwrap(), LockMode::Write);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn downgrade_keeps_writers_out() {
        let table = LockTable::new();
        let ctx = ContextId::new();
        let guard = table.write(&path(), ctx, WAIT).await.unwrap().downgrade();
        assert_eq!(guard.mode(), LockMode::Read);
        assert!(table.try_acquire(&path(), ContextId::new(), LockMode::Write).is_none());
        let other_reader = table.try_acquire(&path(), ContextId::new(), LockMode::Read);
        assert!(other_reader.is_some());
        drop(other_reader);
        drop(guard);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn waiter_wakes_on_release() {
        let table = Arc::new(LockTable::new());
        let holder = table.write(&path(), ContextId::new(), WAIT).await.unwrap();
        let waiter_table = Arc::clone(&table);
        let waiter = tokio::spawn(async move {
            waiter_table
                .write(&path(), ContextId::new(), WAIT)
                .await
                .map(|guard| guard.context())
        });
        tokio::task::yield_now().await;
        drop(holder);
        assert!(waiter.await.unwrap().is_ok());
    }

    #[test]
    fn distinct_paths_do_not_contend() {
        let table = LockTable::new();
        let a = table.try_acquire(&RepoPath::new("r", "a"), ContextId::new(), LockMode::Write);
        let b = table.try_acquire(&RepoPath::new("r", "b"), ContextId::new(), LockMode::Write);
        assert!(a.is_some() && b.is_some());
        assert_eq!(table.len(), 2);
    }
}
