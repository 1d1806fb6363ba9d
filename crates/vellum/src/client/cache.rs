//! Persistent per-user state: the mount cache and the partial-create
//! flag, stored as one blob in a single durable slot.
//!
//! Every mutation is a read-modify-write of the whole blob, matching the
//! browser/Node local-storage model the state originally lived in. The
//! protocol forbids two concurrent writers of the blob; within one
//! process the cache is only touched between the await points of a
//! single call chain.

use crate::client::context::MountContext;
use crate::client::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::sync::Arc;
use vellum_common::storage::{BlobStore, StorageError};
use vellum_common::types::AppName;

/// The persistent state layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    /// Gateway session token, when persisted for resume
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "coreSessionToken")]
    pub core_session_token: Option<SmolStr>,
    /// Application private key (hex), when persisted
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "appPrivateKey")]
    pub app_private_key: Option<String>,
    /// `owner/app` → cached mount context
    #[serde(default)]
    pub datastore_contexts: BTreeMap<String, MountContext>,
    /// `owner/app` → ambiguous-create marker
    #[serde(default)]
    pub partial_create_failures: BTreeMap<String, bool>,
}

fn context_key(owner: &str, app: &AppName) -> String {
    format!("{owner}/{app}")
}

/// Read-modify-write operations over the user-data blob.
pub struct MountCache<S> {
    store: Arc<S>,
}

impl<S> Clone for MountCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S> MountCache<S>
where
    S: BlobStore,
{
    /// Wrap a blob slot.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn load(&self) -> Result<UserData> {
        match self.store.load().await? {
            Some(blob) => Ok(serde_json::from_value(blob).map_err(StorageError::Corrupt)?),
            None => Ok(UserData::default()),
        }
    }

    async fn save(&self, data: UserData) -> Result<()> {
        let blob: Value = serde_json::to_value(&data).map_err(StorageError::Corrupt)?;
        self.store.store(blob).await?;
        Ok(())
    }

    /// The cached mount context for `(owner, app)`, if any.
    pub async fn context(&self, owner: &str, app: &AppName) -> Result<Option<MountContext>> {
        Ok(self
            .load()
            .await?
            .datastore_contexts
            .remove(&context_key(owner, app)))
    }

    /// Cache a mount context under `(owner, app)`.
    pub async fn put_context(
        &self,
        owner: &str,
        app: &AppName,
        ctx: MountContext,
    ) -> Result<()> {
        let mut data = self.load().await?;
        data.datastore_contexts.insert(context_key(owner, app), ctx);
        self.save(data).await
    }

    /// Drop the cached mount context for `(owner, app)`.
    pub async fn clear_context(&self, owner: &str, app: &AppName) -> Result<()> {
        let mut data = self.load().await?;
        data.datastore_contexts.remove(&context_key(owner, app));
        self.save(data).await
    }

    /// Whether a create for `(owner, app)` ended ambiguously.
    pub async fn partial_create_failure(&self, owner: &str, app: &AppName) -> Result<bool> {
        Ok(self
            .load()
            .await?
            .partial_create_failures
            .get(&context_key(owner, app))
            .copied()
            .unwrap_or(false))
    }

    /// Record an ambiguous create. The next mount treats the datastore
    /// as nonexistent, forcing mount-or-create to retry.
    pub async fn set_partial_create_failure(&self, owner: &str, app: &AppName) -> Result<()> {
        let mut data = self.load().await?;
        data.partial_create_failures
            .insert(context_key(owner, app), true);
        // a stale context must not shadow the retry
        data.datastore_contexts.remove(&context_key(owner, app));
        self.save(data).await
    }

    /// Clear the ambiguous-create marker after a confirmed create.
    pub async fn clear_partial_create_failure(&self, owner: &str, app: &AppName) -> Result<()> {
        let mut data = self.load().await?;
        data.partial_create_failures.remove(&context_key(owner, app));
        self.save(data).await
    }
}
