//! Datastore lifecycle: create-request, create, delete-request, delete,
//! mount, and mount-or-create with partial-failure recovery.

use crate::client::context::{CreationUrls, DevicePubkey, MountContext, ReaderMode};
use crate::client::error::{Result, StoreError, StoreErrorKind};
use crate::client::DatastoreClient;
use k256::ecdsa::SigningKey;
use smol_str::SmolStr;
use vellum_api::store::{
    DeleteDatastore, DeleteDatastoreBody, GetDatastore, PutDatastore, PutDatastoreBody,
    PutDatastoreOutput,
};
use vellum_common::AuthToken;
use vellum_common::gateway::GatewayTransport;
use vellum_common::storage::BlobStore;
use vellum_common::types::{AppName, BlockchainId, DatastoreId, DeviceId};
use vellum_root::crypto;
use vellum_root::descriptor::{DatastoreDescriptor, DatastoreKind};
use vellum_root::envelope::{SignedEnvelope, make_data_info, make_fully_qualified_data_id};
use vellum_root::policy::{DriverClassification, ReplicationStrategy, select_drivers};
use vellum_root::root::{device_root_serialize, make_empty_device_root, root_data_id};
use vellum_root::tombstone::{make_data_tombstone, sign_data_tombstone};

/// How to resolve a mount.
///
/// Empty options mount this session's own datastore in single-reader
/// mode; setting `blockchain_id` switches to multi-reader resolution.
#[derive(Debug, Clone, Default)]
pub struct MountOptions {
    /// Mount an explicit datastore instead of the session's own
    pub datastore_id: Option<DatastoreId>,
    /// Act as an explicit device instead of the session's own
    pub device_id: Option<DeviceId>,
    /// Peer public keys, when the caller already knows them
    pub data_pubkeys: Option<Vec<DevicePubkey>>,
    /// Resolve through the owner's name (multi-reader mode)
    pub blockchain_id: Option<BlockchainId>,
    /// Mount a different app's datastore
    pub app_name: Option<AppName>,
}

/// The three byte-exact signed artifacts a create submits.
#[derive(Debug, Clone)]
pub struct CreateRequestInfo {
    /// Address of the new datastore
    pub datastore_id: DatastoreId,
    /// The descriptor being created
    pub descriptor: DatastoreDescriptor,
    /// Signed envelope over the canonical descriptor
    pub datastore_blob: SignedEnvelope,
    /// Signed envelope over the empty device root
    pub root_blob: SignedEnvelope,
    /// One signed root tombstone per device, enabling later cleanup
    pub root_tombstones: Vec<String>,
}

/// Signed tombstones a delete submits.
#[derive(Debug, Clone)]
pub struct DeleteRequestInfo {
    /// Signed descriptor tombstones, one per device
    pub datastore_tombstones: Vec<String>,
    /// Signed root tombstones, one per device
    pub root_tombstones: Vec<String>,
}

/// Produce the signed artifacts the gateway accepts on a create.
///
/// Pure: no I/O. The same request bundle can be re-submitted - the
/// gateway treats an identical signed create as a no-op, which is what
/// makes partial-failure recovery idempotent.
pub fn datastore_create_request(
    kind: DatastoreKind,
    key: &SigningKey,
    drivers: Vec<SmolStr>,
    device_id: &DeviceId,
    all_device_ids: Vec<DeviceId>,
) -> Result<CreateRequestInfo> {
    let descriptor = DatastoreDescriptor::new(
        kind,
        key,
        drivers.iter().map(|d| d.to_string()).collect(),
        all_device_ids.clone(),
    );
    let datastore_id = descriptor.datastore_id()?;

    let datastore_blob = make_data_info(
        datastore_id.as_str(),
        descriptor.serialize()?,
        device_id,
        None,
    )
    .sign(key)?;

    let empty_root = make_empty_device_root(datastore_id.clone(), vec![]);
    let root_blob =
        device_root_serialize(device_id, &datastore_id, &descriptor.root_uuid, &empty_root)?
            .sign(key)?;

    let root_id = root_data_id(&datastore_id, &descriptor.root_uuid);
    let root_tombstones = all_device_ids
        .iter()
        .map(|device| {
            let fq = make_fully_qualified_data_id(device, &root_id);
            sign_data_tombstone(&make_data_tombstone(&fq), key)
        })
        .collect();

    Ok(CreateRequestInfo {
        datastore_id,
        descriptor,
        datastore_blob,
        root_blob,
        root_tombstones,
    })
}

impl<S, T> DatastoreClient<S, T>
where
    S: BlobStore,
    T: GatewayTransport + Send + Sync,
{
    /// Submit a signed create bundle.
    ///
    /// Authenticates with the session token, or with the API password
    /// plus an explicit `datastore_pubkey` when one is attached to the
    /// client (the auxiliary administrative path).
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip_all, fields(datastore_id = %request.datastore_id)))]
    pub async fn datastore_create(
        &self,
        request: &CreateRequestInfo,
    ) -> Result<PutDatastoreOutput> {
        let (auth, datastore_pubkey) = match self.api_password() {
            Some(pw) => (
                AuthToken::ApiPassword(pw.clone()),
                Some(request.descriptor.pubkey.clone()),
            ),
            None => (self.session_auth(), None),
        };
        let req = PutDatastore {
            datastore_pubkey,
            body: PutDatastoreBody {
                datastore_info: request.datastore_blob.header.clone(),
                datastore_sig: request.datastore_blob.signature.clone(),
                root_info: request.root_blob.header.clone(),
                root_sig: request.root_blob.signature.clone(),
                root_tombstones: request.root_tombstones.clone(),
            },
        };
        let out = self.send_with_auth(&req, auth).await?.parse()?;
        if !out.status {
            return Err(
                StoreError::new(StoreErrorKind::RemoteIo, None)
                    .with_context("gateway refused the datastore create"),
            );
        }
        Ok(out)
    }

    /// Produce signed tombstones for the descriptor and root page of a
    /// mounted datastore.
    pub fn datastore_delete_request(&self, ctx: &MountContext) -> Result<DeleteRequestInfo> {
        let key = ctx
            .signing_key()?
            .ok_or_else(|| {
                StoreError::new(StoreErrorKind::Perm, None)
                    .with_context("mount is read-only: no writer key")
            })?;
        let root_id = root_data_id(&ctx.datastore_id, &ctx.descriptor.root_uuid);

        let mut datastore_tombstones = Vec::new();
        let mut root_tombstones = Vec::new();
        for device in &ctx.descriptor.device_ids {
            let ds_fq = make_fully_qualified_data_id(device, ctx.datastore_id.as_str());
            datastore_tombstones.push(sign_data_tombstone(&make_data_tombstone(&ds_fq), &key));
            let root_fq = make_fully_qualified_data_id(device, &root_id);
            root_tombstones.push(sign_data_tombstone(&make_data_tombstone(&root_fq), &key));
        }
        Ok(DeleteRequestInfo {
            datastore_tombstones,
            root_tombstones,
        })
    }

    /// Delete a mounted datastore and drop its cached context.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip_all, fields(datastore_id = %ctx.datastore_id)))]
    pub async fn datastore_delete(&self, ctx: &MountContext) -> Result<()> {
        let request = self.datastore_delete_request(ctx)?;
        let req = DeleteDatastore {
            body: DeleteDatastoreBody {
                datastore_tombstones: request.datastore_tombstones,
                root_tombstones: request.root_tombstones,
            },
        };
        let out = self.send(&req).await?.parse()?;
        if !out.status {
            return Err(
                StoreError::new(StoreErrorKind::RemoteIo, None)
                    .with_context("gateway refused the datastore delete"),
            );
        }
        self.cache()
            .clear_context(&ctx.owner(), &ctx.app_name)
            .await?;
        Ok(())
    }

    /// Resolve a mount context.
    ///
    /// Returns `Ok(None)` when the datastore does not exist - a mapped
    /// 404 from the gateway, or a pending partial-create flag (which
    /// short-circuits without any request).
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
    pub async fn datastore_mount(&self, opts: MountOptions) -> Result<Option<MountContext>> {
        let app_name = opts
            .app_name
            .clone()
            .unwrap_or_else(|| self.claims().app_domain.clone());

        // single-reader fields, derived from the session when not given
        let device_id = opts
            .device_id
            .clone()
            .unwrap_or_else(|| self.claims().device_id.clone());

        let (owner, request) = match &opts.blockchain_id {
            Some(bid) => (
                bid.to_string(),
                GetDatastore {
                    store_ref: SmolStr::new(app_name.as_str()),
                    device_ids: None,
                    device_pubkeys: None,
                    blockchain_id: Some(bid.clone()),
                },
            ),
            None => {
                let datastore_id = match &opts.datastore_id {
                    Some(id) => id.clone(),
                    None => DatastoreId::new(self.claims().app_user_id.as_str())
                        .map_err(|e| StoreError::invalid(e.to_string()))?,
                };
                let pubkeys = match &opts.data_pubkeys {
                    Some(keys) => keys.clone(),
                    None => self.own_device_pubkey(&device_id)?.into_iter().collect(),
                };
                let (device_ids, device_pubkeys) = if pubkeys.is_empty() {
                    (None, None)
                } else {
                    (
                        Some(
                            pubkeys
                                .iter()
                                .map(|p| p.device_id.to_string())
                                .collect::<Vec<_>>()
                                .join(","),
                        ),
                        Some(
                            pubkeys
                                .iter()
                                .map(|p| p.public_key.clone())
                                .collect::<Vec<_>>()
                                .join(","),
                        ),
                    )
                };
                let request = GetDatastore {
                    store_ref: SmolStr::new(datastore_id.as_str()),
                    device_ids,
                    device_pubkeys,
                    blockchain_id: None,
                };
                (datastore_id.to_string(), request)
            }
        };

        // a pending partial create makes the datastore nonexistent until
        // the create is retried
        if self.cache().partial_create_failure(&owner, &app_name).await? {
            return Ok(None);
        }

        let resp = self.send(&request).await?;
        let out = match resp.parse() {
            Ok(out) => out,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let descriptor = out.datastore;
        let datastore_id = descriptor.datastore_id()?;

        // the writer key travels in the context only when it actually
        // owns this datastore
        let private_key = match self.claims().app_private_key.as_deref() {
            Some(hex) => {
                let key = crypto::decode_private_key(hex)?;
                (crypto::datastore_id_of(&key) == datastore_id).then(|| hex.to_string())
            }
            None => None,
        };

        let (mode, data_pubkeys) = match &opts.blockchain_id {
            Some(bid) => {
                let peers = self
                    .get_app_keys(bid, &app_name, opts.data_pubkeys.clone())
                    .await?;
                (
                    ReaderMode::Multi {
                        blockchain_id: bid.clone(),
                    },
                    peers,
                )
            }
            None => {
                let pubkeys = match opts.data_pubkeys {
                    Some(keys) => keys,
                    None => self.own_device_pubkey(&device_id)?.into_iter().collect(),
                };
                (ReaderMode::Single, pubkeys)
            }
        };

        let ctx = MountContext {
            api_base: self.base().clone(),
            mode,
            app_name: app_name.clone(),
            datastore_id,
            device_id,
            private_key,
            data_pubkeys,
            descriptor,
            created: false,
            urls: None,
        };
        self.cache()
            .put_context(&owner, &app_name, ctx.clone())
            .await?;
        Ok(Some(ctx))
    }

    /// Mount the session's datastore, creating it if absent.
    ///
    /// Driver choice order: `drivers` when supplied, else the node's
    /// per-app preferences from the session token, else a replication
    /// selection over the node's advertised classes.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip_all))]
    pub async fn datastore_mount_or_create(
        &self,
        strategy: &ReplicationStrategy,
        drivers: Option<Vec<SmolStr>>,
    ) -> Result<MountContext> {
        let owner = self.owner_key();
        let app_name = self.claims().app_domain.clone();

        if !self.cache().partial_create_failure(&owner, &app_name).await? {
            if let Some(ctx) = self.cache().context(&owner, &app_name).await? {
                return Ok(ctx);
            }
        }

        if let Some(ctx) = self.datastore_mount(MountOptions::default()).await? {
            return Ok(ctx);
        }

        // absent: create it
        let key_hex = self.claims().app_private_key.clone().ok_or_else(|| {
            StoreError::new(StoreErrorKind::Perm, None)
                .with_context("session carries no writer key; cannot create")
        })?;
        let key = crypto::decode_private_key(&key_hex)?;

        let drivers = match drivers {
            Some(drivers) => drivers,
            None => match self
                .claims()
                .storage
                .preferences
                .get(app_name.as_str())
            {
                Some(preferred) => preferred.clone(),
                None => select_drivers(
                    strategy,
                    &DriverClassification::from_classes(&self.claims().storage.classes),
                )?,
            },
        };

        let device_id = self.claims().device_id.clone();
        let request = datastore_create_request(
            DatastoreKind::Datastore,
            &key,
            drivers,
            &device_id,
            vec![device_id.clone()],
        )?;

        let created = match self.datastore_create(&request).await {
            Ok(out) => out,
            Err(e) => {
                // outcome unobserved; force a retry on the next mount
                self.cache()
                    .set_partial_create_failure(&owner, &app_name)
                    .await?;
                return Err(e);
            }
        };
        self.cache()
            .clear_partial_create_failure(&owner, &app_name)
            .await?;

        match self.datastore_mount(MountOptions::default()).await? {
            Some(mut ctx) => {
                // the returned context reports the creation; the cached
                // copy (written by the mount) stays plain, so later
                // resolutions do not re-claim it
                ctx.created = true;
                ctx.urls = Some(CreationUrls {
                    datastore_urls: created.datastore_urls,
                    root_urls: created.root_urls,
                });
                Ok(ctx)
            }
            None => {
                self.cache()
                    .set_partial_create_failure(&owner, &app_name)
                    .await?;
                Err(StoreError::partial_create(format!(
                    "datastore {} not visible after create",
                    request.datastore_id
                )))
            }
        }
    }

    /// The cached context for this session if one exists (and no partial
    /// create is pending), else a fresh mount.
    pub(crate) async fn resolved_context(&self) -> Result<Option<MountContext>> {
        let owner = self.owner_key();
        let app_name = self.claims().app_domain.clone();
        if !self.cache().partial_create_failure(&owner, &app_name).await? {
            if let Some(ctx) = self.cache().context(&owner, &app_name).await? {
                return Ok(Some(ctx));
            }
        }
        self.datastore_mount(MountOptions::default()).await
    }

    fn own_device_pubkey(&self, device_id: &DeviceId) -> Result<Option<DevicePubkey>> {
        match self.claims().app_private_key.as_deref() {
            Some(hex) => {
                let key = crypto::decode_private_key(hex)?;
                Ok(Some(DevicePubkey {
                    device_id: device_id.clone(),
                    public_key: crypto::public_key_hex(&key),
                }))
            }
            None => Ok(None),
        }
    }
}
