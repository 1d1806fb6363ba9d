//! Datastore protocol core.
//!
//! Everything in this crate must be byte-exact: the canonical hash
//! framing, the signing envelope, the stable serialization of device
//! roots and descriptors. Any deviation produces signatures that peers
//! reject. The crate is pure - no I/O, no network - so every artifact
//! can be unit-tested against fixed vectors.

#![warn(missing_docs)]

pub mod crypto;
pub mod descriptor;
pub mod envelope;
pub mod error;
pub mod policy;
pub mod root;
pub mod tombstone;

pub use error::RootError;

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
