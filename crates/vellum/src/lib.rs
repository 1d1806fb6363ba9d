//! # Vellum
//!
//! A client for a content-addressed, multi-device personal datastore
//! served by a remote storage gateway. A datastore belongs to a
//! secp256k1 keypair; its contents are a flat namespace of named files
//! whose authoritative metadata lives in per-device root pages, with the
//! bulk bytes replicated through gateway-side storage drivers.
//!
//! The crates split the work the obvious way:
//! - `vellum-root` produces the byte-exact signed artifacts the gateway
//!   accepts (envelopes, tombstones, root pages, descriptors) and the
//!   replication-strategy driver selection,
//! - `vellum-api` types every gateway endpoint,
//! - `vellum-common` carries the HTTP abstraction, error taxonomy, and
//!   durable session storage,
//! - this crate drives the multi-round-trip protocol: mount, lifecycle,
//!   discovery, and the file API.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vellum::client::DatastoreClient;
//! use vellum_common::storage::MemoryBlobStore;
//!
//! #[tokio::main]
//! async fn main() -> miette::Result<()> {
//!     let base = url::Url::parse("http://localhost:6270").expect("valid url");
//!     let store = Arc::new(MemoryBlobStore::default());
//!     let session_token = std::env::var("VELLUM_SESSION").expect("session token");
//!
//!     let client = DatastoreClient::new(reqwest::Client::new(), base, session_token, store)
//!         .map_err(|e| miette::miette!("{e}"))?;
//!
//!     // mounts (creating on first use), writes, reads back
//!     client.put_file("/file1", b"hello world").await.map_err(|e| miette::miette!("{e}"))?;
//!     let bytes = client.get_file("/file1").await.map_err(|e| miette::miette!("{e}"))?;
//!     assert_eq!(&bytes[..], b"hello world");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod client;

pub use client::{DatastoreClient, MountContext, MountOptions, StoreError, StoreErrorKind};
pub use vellum_api as api;
pub use vellum_common as common;
pub use vellum_root as root;
