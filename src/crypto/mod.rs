//! Hashing utilities
//!
//! SHA-256 helpers used for custody addresses and transaction digests.

pub mod hash;

pub use hash::{double_sha256, sha256, sha256_hex};
