//! Device-root discovery and peer app-key resolution.

use crate::client::context::{DevicePubkey, MountContext};
use crate::client::error::{Result, StoreError, StoreErrorKind};
use crate::client::session::decode_jwt_payload;
use crate::client::DatastoreClient;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;
use vellum_api::device_root::GetDeviceRoot;
use vellum_api::profile::GetProfile;
use vellum_common::gateway::GatewayTransport;
use vellum_common::storage::BlobStore;
use vellum_common::types::{AppName, BlockchainId, DeviceId};
use vellum_root::crypto;
use vellum_root::root::{DeviceRoot, make_empty_device_root};

/// A device root plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootInfo {
    /// The page
    pub root: DeviceRoot,
    /// True when the page was synthesized in memory because the gateway
    /// has never seen one for this device
    pub created: bool,
}

/// Payload of the keyfile JWT embedded in an owner profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct KeyfileClaims {
    #[serde(default)]
    keys: KeyfileKeys,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct KeyfileKeys {
    /// device id → app name → key entry
    #[serde(default)]
    apps: BTreeMap<SmolStr, BTreeMap<SmolStr, AppKeyEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppKeyEntry {
    public_key: String,
}

impl<S, T> DatastoreClient<S, T>
where
    S: BlobStore,
    T: GatewayTransport + Send + Sync,
{
    /// Whether this device should already own a root page: it created
    /// the datastore (its key is the descriptor's) or a version was
    /// observed earlier in this process.
    async fn device_root_expected(&self, ctx: &MountContext) -> Result<bool> {
        if let Some(key) = ctx.signing_key()? {
            if crypto::public_key_hex(&key) == ctx.descriptor.pubkey {
                return Ok(true);
            }
        }
        let key = (
            ctx.datastore_id.clone(),
            ctx.descriptor.root_uuid,
            ctx.device_id.clone(),
        );
        Ok(self.root_version(&key).await.is_some())
    }

    /// Fetch this device's root page.
    ///
    /// A missing page is an error when a page was expected; otherwise an
    /// empty page is synthesized in memory and flagged `created` so the
    /// caller knows the first write must install it. A datastore this
    /// mount just created always synthesizes - its page write may still
    /// be in flight behind the create.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(device_id = %ctx.device_id)))]
    pub async fn find_device_root_info(&self, ctx: &MountContext) -> Result<RootInfo> {
        let req = GetDeviceRoot {
            store_id: ctx.datastore_id.clone(),
            this_device_id: ctx.device_id.clone(),
        };
        let resp = self.send(&req).await?;
        match resp.parse() {
            Ok(out) => Ok(RootInfo {
                root: out.device_root,
                created: false,
            }),
            Err(e) if e.is_not_found() => {
                if !ctx.created && self.device_root_expected(ctx).await? {
                    return Err(StoreError::new(StoreErrorKind::NotFound, Some(Box::new(e)))
                        .with_context(format!(
                            "device root for {} expected but missing",
                            ctx.device_id
                        )));
                }
                Ok(RootInfo {
                    root: make_empty_device_root(ctx.datastore_id.clone(), vec![]),
                    created: true,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve the app public keys of every device the owner advertises.
    ///
    /// Explicit overrides win; otherwise the owner's profile is fetched
    /// and the embedded keyfile JWT consulted for
    /// `keys.apps[device][app].public_key`.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(blockchain_id = %blockchain_id)))]
    pub async fn get_app_keys(
        &self,
        blockchain_id: &BlockchainId,
        app_name: &AppName,
        overrides: Option<Vec<DevicePubkey>>,
    ) -> Result<Vec<DevicePubkey>> {
        if let Some(keys) = overrides {
            return Ok(keys);
        }

        let req = GetProfile {
            blockchain_id: blockchain_id.clone(),
        };
        let out = self.send(&req).await?.parse()?;
        let Some(keyfile) = out.profile.keyfile else {
            return Err(
                StoreError::not_found("keyfile", blockchain_id)
                    .with_help("the owner's profile does not advertise app keys"),
            );
        };
        let claims: KeyfileClaims = decode_jwt_payload(&keyfile)
            .map_err(|e| StoreError::invalid(format!("keyfile does not decode: {e}")))?;

        let mut peers = Vec::new();
        for (device, apps) in &claims.keys.apps {
            if let Some(entry) = apps.get(app_name.as_str()) {
                let device_id = DeviceId::new(device)
                    .map_err(|e| StoreError::invalid(e.to_string()))?;
                peers.push(DevicePubkey {
                    device_id,
                    public_key: entry.public_key.clone(),
                });
            }
        }
        Ok(peers)
    }
}
