use std::sync::Arc;

use async_trait::async_trait;
use depot_types::{ContextId, RepoResource};
use tracing::{debug, warn};

use crate::error::ResolveResult;

/// Side effect of a committed storage write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheEvent {
    /// Remote content was fetched and stored in a cache companion.
    Cached(RepoResource),
    /// Content was deployed to a local repository.
    Deployed(RepoResource),
}

impl CacheEvent {
    pub fn resource(&self) -> &RepoResource {
        match self {
            Self::Cached(resource) | Self::Deployed(resource) => resource,
        }
    }
}

/// Receives events after the write they describe has committed.
#[async_trait]
pub trait CacheListener: Send + Sync {
    async fn on_commit(&self, event: &CacheEvent) -> ResolveResult<()>;
}

/// Listener that ignores every event.
pub struct NoOpListener;

#[async_trait]
impl CacheListener for NoOpListener {
    async fn on_commit(&self, _event: &CacheEvent) -> ResolveResult<()> {
        Ok(())
    }
}

/// Deferred events of one operation.
///
/// Events are queued with [`defer`](Self::defer) while the operation runs and
/// dispatched in enqueue order by [`commit`](Self::commit), which the
/// operation calls only once its storage write succeeded. A unit of work
/// dropped without commit discards its queue.
pub struct UnitOfWork {
    context: ContextId,
    pending: Vec<CacheEvent>,
}

impl UnitOfWork {
    pub fn new(context: ContextId) -> Self {
        Self {
            context,
            pending: Vec::new(),
        }
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    pub fn defer(&mut self, event: CacheEvent) {
        self.pending.push(event);
    }

    pub fn pending(&self) -> &[CacheEvent] {
        &self.pending
    }

    /// Dispatch every queued event to every listener. A failing listener is
    /// logged and does not stop the others. Returns the number of events
    /// dispatched.
    pub async fn commit(mut self, listeners: &[Arc<dyn CacheListener>]) -> usize {
        let events = std::mem::take(&mut self.pending);
        for event in &events {
            for listener in listeners {
                if let Err(e) = listener.on_commit(event).await {
                    warn!(ctx = %self.context, path = %event.resource().repo_path, error = %e, "cache listener failed");
                }
            }
        }
        events.len()
    }

    /// Discard the queue explicitly.
    pub fn rollback(mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        if !self.pending.is_empty() {
            debug!(ctx = %self.context, discarded = self.pending.len(), "rolling back deferred events");
            self.pending.clear();
        }
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        self.discard();
    }
}
