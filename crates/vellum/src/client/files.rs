//! The file API: get, put, delete, list, and URL lookup.
//!
//! Each operation runs the same await chain in order: mount, device-root
//! fetch, data mutation, device-root push, version-map update. A put is
//! two to three network round trips deep.

use crate::client::context::MountContext;
use crate::client::error::{Result, StoreError, StoreErrorKind};
use crate::client::DatastoreClient;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::Bytes;
use k256::ecdsa::SigningKey;
use vellum_api::MutationBody;
use vellum_api::device_root::PutDeviceRoot;
use vellum_api::file::{DeleteFileData, GetFileData, GetFileHeader, GetListing, PutFileData};
use vellum_common::gateway::GatewayTransport;
use vellum_common::storage::BlobStore;
use vellum_common::stable_json::to_stable_string;
use vellum_root::crypto::{hash_data_payload, sign_raw_data};
use vellum_root::envelope::{make_data_info, make_fully_qualified_data_id};
use vellum_root::root::{
    DeviceRoot, FileEntry, device_root_insert, device_root_remove, device_root_serialize,
    file_key,
};
use vellum_root::tombstone::{make_data_tombstone, sign_data_tombstone};

fn normalize_name(name: &str) -> &str {
    name.trim_start_matches('/')
}

impl<S, T> DatastoreClient<S, T>
where
    S: BlobStore,
    T: GatewayTransport + Send + Sync,
{
    /// Write a file, creating the datastore if this is its first use.
    ///
    /// Returns the replica URLs the gateway stored the bytes at; the
    /// device root is updated to point at them before this resolves.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip_all, fields(name = name)))]
    pub async fn put_file(&self, name: &str, bytes: &[u8]) -> Result<Vec<String>> {
        let ctx = self
            .datastore_mount_or_create(&self.default_strategy(), None)
            .await?;
        let key = writer_key(&ctx)?;
        let root_info = self.find_device_root_info(&ctx).await?;

        let name = normalize_name(name);
        let file_hash = hash_data_payload(bytes);
        let file_b64 = BASE64.encode(bytes);

        // provisional entry: the gateway fills in the real replica URLs
        let provisional = FileEntry::new(vec![], file_hash.clone());
        let data_id = format!("{}/{}", ctx.datastore_id, name);
        let header = make_data_info(
            &data_id,
            to_stable_string(&provisional)?,
            &ctx.device_id,
            None,
        )
        .sign(&key)?;

        let (datastore_str, datastore_sig) = signed_descriptor(&ctx, &key)?;
        let req = PutFileData {
            store_id: ctx.datastore_id.clone(),
            path: name.to_string(),
            body: MutationBody::new(
                vec![header.header],
                vec![file_b64],
                vec![header.signature],
                vec![],
                datastore_str,
                datastore_sig,
            )?,
        };
        let out = self.send(&req).await?.parse()?;
        if !out.status {
            return Err(StoreError::new(StoreErrorKind::RemoteIo, None)
                .with_context(format!("gateway refused the write of {name}")));
        }

        // install the final entry, carrying the actual replica URLs
        let entry = FileEntry::new(out.urls.clone(), file_hash);
        let new_root = device_root_insert(&root_info.root, name, entry);
        self.put_device_root(&ctx, &key, &new_root).await?;

        Ok(out.urls)
    }

    /// Read a file's bytes.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(name = name)))]
    pub async fn get_file(&self, name: &str) -> Result<Bytes> {
        let ctx = self.mounted_context().await?;
        let req = GetFileData {
            store_id: ctx.datastore_id.clone(),
            path: normalize_name(name).to_string(),
        };
        Ok(self.send(&req).await?.parse()?)
    }

    /// Read the replica URLs of a file's header.
    pub async fn get_file_urls(&self, name: &str) -> Result<Vec<String>> {
        let ctx = self.mounted_context().await?;
        let req = GetFileHeader {
            store_id: ctx.datastore_id.clone(),
            path: normalize_name(name).to_string(),
            this_device_id: ctx.device_id.clone(),
        };
        let entry = self.send(&req).await?.parse()?;
        Ok(entry.urls)
    }

    /// Delete a file.
    ///
    /// Resolves to `NotFound` without touching the gateway when the name
    /// was never recorded in this device's root. An already-tombstoned
    /// name still has its `files` entry and deletes again; the gateway
    /// treats the extra tombstone idempotently.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip_all, fields(name = name)))]
    pub async fn delete_file(&self, name: &str) -> Result<()> {
        let ctx = self.mounted_context().await?;
        let key = writer_key(&ctx)?;
        let root_info = self.find_device_root_info(&ctx).await?;

        let name = normalize_name(name);
        if !root_info.root.files.contains_key(&file_key(name)) {
            return Err(StoreError::not_found("file", name));
        }

        let data_id = format!("{}/{}", ctx.datastore_id, name);
        let mut tombstones = Vec::new();
        let mut own_tombstone = None;
        for device in &ctx.descriptor.device_ids {
            let fq = make_fully_qualified_data_id(device, &data_id);
            let signed = sign_data_tombstone(&make_data_tombstone(&fq), &key);
            if *device == ctx.device_id {
                own_tombstone = Some(signed.clone());
            }
            tombstones.push(signed);
        }
        let own_tombstone = own_tombstone.unwrap_or_else(|| {
            let fq = make_fully_qualified_data_id(&ctx.device_id, &data_id);
            sign_data_tombstone(&make_data_tombstone(&fq), &key)
        });

        let (datastore_str, datastore_sig) = signed_descriptor(&ctx, &key)?;
        let req = DeleteFileData {
            store_id: ctx.datastore_id.clone(),
            path: name.to_string(),
            body: MutationBody::new(
                vec![],
                vec![],
                vec![],
                tombstones,
                datastore_str,
                datastore_sig,
            )?,
        };
        let out = self.send(&req).await?.parse()?;
        if !out.status {
            return Err(StoreError::new(StoreErrorKind::RemoteIo, None)
                .with_context(format!("gateway refused the delete of {name}")));
        }

        let new_root = device_root_remove(&root_info.root, name, own_tombstone);
        self.put_device_root(&ctx, &key, &new_root).await?;
        Ok(())
    }

    /// Fetch the aggregate root listing every live file.
    pub async fn list_files(&self) -> Result<DeviceRoot> {
        let ctx = self.mounted_context().await?;
        let req = GetListing {
            store_id: ctx.datastore_id.clone(),
        };
        Ok(self.send(&req).await?.parse()?)
    }

    /// Sign and push a device root, then record its timestamp in the
    /// version map.
    pub(crate) async fn put_device_root(
        &self,
        ctx: &MountContext,
        key: &SigningKey,
        root: &DeviceRoot,
    ) -> Result<()> {
        let envelope = device_root_serialize(
            &ctx.device_id,
            &ctx.datastore_id,
            &ctx.descriptor.root_uuid,
            root,
        )?;
        let payload_b64 = BASE64.encode(envelope.data.as_bytes());
        let signed = envelope.sign(key)?;

        let (datastore_str, datastore_sig) = signed_descriptor(ctx, key)?;
        let req = PutDeviceRoot {
            store_id: ctx.datastore_id.clone(),
            sync: false,
            body: MutationBody::new(
                vec![signed.header],
                vec![payload_b64],
                vec![signed.signature],
                vec![],
                datastore_str,
                datastore_sig,
            )?,
        };
        let out = self.send(&req).await?.parse()?;
        if !out.status {
            return Err(StoreError::new(StoreErrorKind::RemoteIo, None)
                .with_context("gateway refused the device root write"));
        }

        self.set_root_version(
            (
                ctx.datastore_id.clone(),
                ctx.descriptor.root_uuid,
                ctx.device_id.clone(),
            ),
            root.timestamp,
        )
        .await;
        Ok(())
    }

    /// The resolved mount context, or `NotFound` when the datastore does
    /// not exist.
    async fn mounted_context(&self) -> Result<MountContext> {
        self.resolved_context()
            .await?
            .ok_or_else(|| StoreError::not_found("datastore", self.owner_key()))
    }
}

fn writer_key(ctx: &MountContext) -> Result<SigningKey> {
    ctx.signing_key()?.ok_or_else(|| {
        StoreError::new(StoreErrorKind::Perm, None)
            .with_context("mount is read-only: no writer key")
    })
}

fn signed_descriptor(ctx: &MountContext, key: &SigningKey) -> Result<(String, String)> {
    let datastore_str = ctx.descriptor.serialize()?;
    let datastore_sig = sign_raw_data(datastore_str.as_bytes(), key);
    Ok((datastore_str, datastore_sig))
}
