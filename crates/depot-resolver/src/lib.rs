//! Resolution engine for depot.
//!
//! [`RepositoryResolver`] answers `resolve`, `get_content` and `save`
//! requests against one registry snapshot:
//!
//! 1. Local repositories are served straight from storage.
//! 2. Remote repositories are served from their cache companion while the
//!    cached copy is fresh; otherwise the retrieval cache decides whether the
//!    origin must be asked, and a per-path write lock makes sure only one
//!    request does so (check, lock, check again).
//! 3. Fetched content is verified by the remote checksum policy before it is
//!    cached. Transient failures degrade to a stale copy unless the
//!    repository is configured to hard-fail.
//! 4. Virtual repositories try their members in order.
//!
//! Side effects that must not run before a storage write commits are queued
//! on a [`UnitOfWork`] and dispatched to [`CacheListener`]s afterwards.
//!
//! [`RepositoryService`] owns the current registry and swaps it atomically
//! on reload.

pub mod context;
pub mod error;
pub mod events;
pub mod resolution;
pub mod resolver;
pub mod service;

#[cfg(test)]
mod scenarios;

pub use context::RequestContext;
pub use error::{ErrorKind, ResolveError, ResolveResult};
pub use events::{CacheEvent, CacheListener, NoOpListener, UnitOfWork};
pub use resolution::{Resolution, ResolutionSource};
pub use resolver::RepositoryResolver;
pub use service::RepositoryService;
