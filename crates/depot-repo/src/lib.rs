//! Repository kinds for depot.
//!
//! A configuration snapshot ([`RepositoriesConfig`]) is turned into a
//! [`RepositoryRegistry`] holding one live object per repository:
//!
//! - [`LocalRepo`]: content deployed directly to this server
//! - [`RemoteRepo`]: a proxy of an upstream origin, with its own retrieval
//!   cache, lock table, in-flight content slots and local cache companion
//!   (`<key>-cache`)
//! - [`VirtualRepo`]: an ordered aggregation of local and remote repositories
//!
//! Lookups by key return the closed [`Repo`] variant. Registries are never
//! patched; a reload builds a new one.

pub mod config;
pub mod error;
pub mod inflight;
pub mod local;
pub mod registry;
pub mod remote;
pub mod repo;
pub mod virtual_repo;

pub use config::{RepositoriesConfig, ResolverConfig};
pub use error::{RepoError, RepoResult};
pub use inflight::{ContentSlots, SlotTicket};
pub use local::LocalRepo;
pub use registry::{HttpClientFactory, RemoteClientFactory, RepositoryRegistry, GLOBAL_VIRTUAL_KEY};
pub use remote::RemoteRepo;
pub use repo::Repo;
pub use virtual_repo::VirtualRepo;
