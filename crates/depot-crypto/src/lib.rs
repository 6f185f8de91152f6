//! Checksum computation for depot.
//!
//! The server never trusts a declared checksum on its own: every byte that
//! enters a repository is digested here, and the resulting "actual" values
//! are compared against the declared "original" ones by the checksum
//! policies. All digests wrap established RustCrypto implementations.

pub mod hasher;

pub use hasher::{ChecksumCalculator, MultiHasher};
