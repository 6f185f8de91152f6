//! Storage backend contract for depot.
//!
//! The physical binary store is an external collaborator: this crate only
//! defines the interface the resolution engine consumes, plus an in-memory
//! backend for tests and embedding.
//!
//! # Storage Backends
//!
//! All backends implement the [`StorageBackend`] trait:
//!
//! - [`InMemoryStorage`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. The backend is the source of truth for already-cached and local content.
//! 2. Content is handed out as a [`ContentHandle`] that releases its lease when
//!    dropped, on every exit path.
//! 3. A failed write leaves no partial entry behind.
//! 4. All backend faults are propagated, never silently ignored.

pub mod error;
pub mod handle;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use handle::ContentHandle;
pub use memory::InMemoryStorage;
pub use traits::StorageBackend;
