//! Foundation types for depot, the artifact repository engine.
//!
//! This crate provides the value types shared by every other depot crate.
//! They are cheap to clone and carry no behaviour beyond validation and
//! formatting.
//!
//! # Key Types
//!
//! - [`RepoPath`]: identity of an artifact: repository key plus path
//! - [`RepoResource`]: metadata about a resolved artifact (size, timestamps, checksums)
//! - [`ChecksumType`]: supported digest algorithms
//! - [`ChecksumInfo`] / [`ChecksumsInfo`]: declared vs computed checksum values
//! - [`ContextId`]: caller-supplied unit-of-work token used for lock reentrancy
//! - [`RepoDescriptor`]: immutable configuration snapshots of local, remote and
//!   virtual repositories

pub mod checksum;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod path;
pub mod resource;

pub use checksum::{ChecksumInfo, ChecksumType, ChecksumsInfo, TRUSTED_FILE_MARKER};
pub use context::ContextId;
pub use descriptor::{
    validate_repo_key, LocalChecksumPolicyType, LocalRepoDescriptor, RemoteChecksumPolicyType,
    RemoteRepoDescriptor, RepoDescriptor, VirtualRepoDescriptor, CACHE_KEY_SUFFIX,
    DEFAULT_FAILED_RETRIEVAL_CACHE_PERIOD_SECS, DEFAULT_MISSED_RETRIEVAL_CACHE_PERIOD_SECS,
    DEFAULT_RETRIEVAL_CACHE_PERIOD_SECS, DEFAULT_SOCKET_TIMEOUT_SECS,
};
pub use error::TypeError;
pub use path::RepoPath;
pub use resource::{now_millis, RepoResource};
