use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::client::{FetchOutcome, RemoteArtifact, RemoteClient};
use crate::error::{RemoteError, RemoteResult};

#[derive(Clone, Debug)]
enum Scripted {
    Artifact(RemoteArtifact),
    Failure(String),
}

/// Scripted origin keyed by URL.
///
/// Unknown URLs answer [`FetchOutcome::NotFound`]. Every call is counted,
/// per URL and in total, so callers can assert how often the origin was
/// contacted. An optional delay keeps fetches in flight long enough to
/// overlap concurrent callers.
#[derive(Default)]
pub struct InMemoryRemote {
    responses: RwLock<HashMap<String, Scripted>>,
    calls: AtomicUsize,
    calls_by_url: RwLock<HashMap<String, usize>>,
    delay: RwLock<Option<Duration>>,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `artifact` at `url` from now on.
    pub fn put_artifact(&self, url: impl Into<String>, artifact: RemoteArtifact) {
        let mut map = self.responses.write().expect("lock poisoned");
        map.insert(url.into(), Scripted::Artifact(artifact));
    }

    /// Fail every fetch of `url` with a connection error.
    pub fn fail(&self, url: impl Into<String>, reason: impl Into<String>) {
        let mut map = self.responses.write().expect("lock poisoned");
        map.insert(url.into(), Scripted::Failure(reason.into()));
    }

    /// Forget `url`; subsequent fetches answer not found.
    pub fn remove(&self, url: &str) {
        self.responses.write().expect("lock poisoned").remove(url);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().expect("lock poisoned") = delay;
    }

    /// Total number of fetches.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of fetches of one URL.
    pub fn calls_for(&self, url: &str) -> usize {
        let map = self.calls_by_url.read().expect("lock poisoned");
        map.get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl RemoteClient for InMemoryRemote {
    async fn fetch(&self, url: &str, if_modified_since: Option<i64>) -> RemoteResult<FetchOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls_by_url
            .write()
            .expect("lock poisoned")
            .entry(url.to_string())
            .or_insert(0) += 1;

        let delay = *self.delay.read().expect("lock poisoned");
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.responses.read().expect("lock poisoned").get(url).cloned();
        match scripted {
            None => Ok(FetchOutcome::NotFound),
            Some(Scripted::Failure(reason)) => Err(RemoteError::Connection {
                url: url.to_string(),
                reason,
            }),
            Some(Scripted::Artifact(artifact)) => {
                let unchanged = if_modified_since
                    .is_some_and(|since| artifact.last_modified.div_euclid(1000) <= since);
                if unchanged {
                    Ok(FetchOutcome::NotModified)
                } else {
                    Ok(FetchOutcome::Found(artifact))
                }
            }
        }
    }
}

impl std::fmt::Debug for InMemoryRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRemote")
            .field("calls", &self.calls())
            .finish()
    }
}
