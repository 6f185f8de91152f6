//! Acceptance policies for depot.
//!
//! Every repository decides two things about a path before content is served
//! or stored: whether the path is accepted at all ([`PathFilter`]), and which
//! checksum is authoritative for the content ([`ChecksumPolicy`]).
//!
//! # Modules
//!
//! - [`ant`]: Ant-style glob matcher (`*`, `?`, `**`)
//! - [`filter`]: include/exclude filtering with a default noise-exclude set
//! - [`checksum`]: the checksum policy family for local and remote repositories
//!
//! # Quick Start
//!
//! ```rust
//! use depot_policy::PathFilter;
//!
//! let filter = PathFilter::new(&["org/acme/**".to_string()], &["**/*-sources.jar".to_string()]);
//! assert!(filter.accepts("org/acme/lib/1.0/lib-1.0.jar"));
//! assert!(!filter.accepts("org/acme/lib/1.0/lib-1.0-sources.jar"));
//! assert!(filter.accepts("org")); // browsing towards an include
//! assert!(filter.accepts(""));    // the root is always visible
//! ```

pub mod ant;
pub mod checksum;
pub mod filter;

pub use ant::AntPattern;
pub use checksum::local::LocalChecksumPolicy;
pub use checksum::remote::RemoteChecksumPolicy;
pub use checksum::{any_match, is_metadata, ChecksumDecision, ChecksumPolicy};
pub use filter::{accepts, PathFilter, DEFAULT_EXCLUDES};
