//! Retrieval cache for depot remote repositories.
//!
//! Every remote repository remembers the outcome of its recent origin
//! lookups in three TTL tables:
//!
//! - HIT: the artifact was fetched successfully (long TTL)
//! - MISS: the origin confirmed the artifact does not exist (long TTL)
//! - ERROR: the origin failed transiently (short TTL)
//!
//! A path is held by at most one table at a time; recording an outcome
//! evicts the path from the other two.

pub mod retrieval;

pub use retrieval::{CacheClass, CacheLookup, RetrievalCache, RetrievalTtls};
