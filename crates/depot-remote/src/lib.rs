//! Remote origin clients for depot.
//!
//! A remote repository proxies an upstream origin through the
//! [`RemoteClient`] contract: one conditional fetch per call, answering
//! found, not modified, or not found. Everything else is a transient
//! [`RemoteError`] that the caller records in its ERROR table.
//!
//! [`HttpRemoteClient`] talks to real HTTP origins; [`InMemoryRemote`] is a
//! scripted origin that counts calls, for tests and embedding.

pub mod client;
pub mod error;
pub mod http;
pub mod memory;

pub use client::{FetchOutcome, RemoteArtifact, RemoteClient};
pub use error::{RemoteError, RemoteResult};
pub use http::{format_http_date, parse_http_date, HttpRemoteClient};
pub use memory::InMemoryRemote;
