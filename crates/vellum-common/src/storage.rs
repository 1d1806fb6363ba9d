//! Durable storage for the client's per-user state.
//!
//! The protocol keeps all client-side durable state in one JSON blob
//! under a single well-known name (the browser/Node local-storage
//! model). The store therefore has exactly one slot: `load` returns the
//! whole blob or nothing, `store` replaces it. Read-modify-write cycles
//! belong to the caller, which is also what guarantees a single writer:
//! the client only touches the slot between the suspension points of one
//! call chain.

use crate::error::BoxError;
use serde_json::Value;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Errors emitted by blob stores.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum StorageError {
    /// Filesystem or I/O failure
    #[error("durable storage I/O failed: {0}")]
    #[diagnostic(code(vellum::storage::io))]
    Io(#[from] std::io::Error),

    /// The blob did not encode, or the stored blob did not parse
    #[error("user-data blob is corrupt: {0}")]
    #[diagnostic(
        code(vellum::storage::corrupt),
        help("delete the stored blob to reset the client state")
    )]
    Corrupt(#[from] serde_json::Error),

    /// Any other error from a backend implementation
    #[error(transparent)]
    #[diagnostic(code(vellum::storage::backend))]
    Backend(BoxError),
}

/// A one-slot durable store for the user-data blob.
#[cfg_attr(not(target_arch = "wasm32"), trait_variant::make(Send))]
pub trait BlobStore {
    /// Read the whole blob, or `None` when nothing was ever stored.
    fn load(&self) -> impl Future<Output = Result<Option<Value>, StorageError>>;

    /// Replace the whole blob.
    fn store(&self, blob: Value) -> impl Future<Output = Result<(), StorageError>>;
}

/// In-memory slot suitable for short-lived sessions and tests.
#[derive(Clone, Default)]
pub struct MemoryBlobStore(Arc<RwLock<Option<Value>>>);

impl BlobStore for MemoryBlobStore {
    async fn load(&self) -> Result<Option<Value>, StorageError> {
        Ok(self.0.read().await.clone())
    }

    async fn store(&self, blob: Value) -> Result<(), StorageError> {
        *self.0.write().await = Some(blob);
        Ok(())
    }
}

/// File-backed slot: the whole file is the blob.
///
/// NOT secure (the blob can carry a writer key); suitable for
/// development and CLI use.
#[derive(Clone, Debug)]
pub struct FileBlobStore {
    /// Path of the blob file.
    pub path: PathBuf,
}

impl FileBlobStore {
    /// Open a blob slot at the given path, creating parent directories.
    /// The file itself is created on first `store`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path: path.as_ref().to_path_buf(),
        })
    }
}

impl BlobStore for FileBlobStore {
    async fn load(&self) -> Result<Option<Value>, StorageError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    async fn store(&self, blob: Value) -> Result<(), StorageError> {
        std::fs::write(&self.path, serde_json::to_vec_pretty(&blob)?)?;
        Ok(())
    }
}
