//! Per-path locking for depot.
//!
//! A [`LockTable`] hands out read and write locks scoped to one
//! [`RepoPath`](depot_types::RepoPath). Locks are reentrant per
//! [`ContextId`](depot_types::ContextId): a context that already holds a lock
//! on a path acquires it again immediately and only bumps a hold count.
//! Writers are preferred: once a writer waits, readers from other contexts
//! queue behind it.
//!
//! Guards release on drop, so every exit path releases what it acquired.

pub mod error;
pub mod table;

pub use error::{LockError, LockResult};
pub use table::{LockGuard, LockMode, LockTable};
