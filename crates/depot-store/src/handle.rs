use std::fmt;
use std::io::{self, Read};

use bytes::{Buf, Bytes};
use depot_types::RepoResource;

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// Scoped handle on stored content.
///
/// The handle owns a lease on the backend; the lease is released exactly once
/// when the handle is dropped, whichever way the caller leaves its scope.
pub struct ContentHandle {
    resource: RepoResource,
    remaining: Bytes,
    on_release: Option<ReleaseHook>,
}

impl ContentHandle {
    /// A handle with no lease to release.
    pub fn new(resource: RepoResource, content: Bytes) -> Self {
        Self {
            resource,
            remaining: content,
            on_release: None,
        }
    }

    /// A handle that runs `on_release` when dropped.
    pub fn with_release(
        resource: RepoResource,
        content: Bytes,
        on_release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            resource,
            remaining: content,
            on_release: Some(Box::new(on_release)),
        }
    }

    /// Metadata of the content behind this handle.
    pub fn resource(&self) -> &RepoResource {
        &self.resource
    }

    /// Bytes not yet consumed through [`Read`].
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Consume the rest of the content at once.
    ///
    /// The lease is still released when the handle drops.
    pub fn read_remaining(&mut self) -> Bytes {
        std::mem::take(&mut self.remaining)
    }
}

impl Read for ContentHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.remaining.len());
        self.remaining.copy_to_slice(&mut buf[..n]);
        Ok(n)
    }
}

impl Drop for ContentHandle {
    fn drop(&mut self) {
        if let Some(release) = self.on_release.take() {
            release();
        }
    }
}

impl fmt::Debug for ContentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentHandle")
            .field("repo_path", &self.resource.repo_path)
            .field("remaining", &self.remaining.len())
            .finish()
    }
}
