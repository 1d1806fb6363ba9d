//! The mount context: the per-(owner, app) handle binding a datastore to
//! this client's keys, device id, and gateway.

use serde::{Deserialize, Serialize};
use url::Url;
use vellum_common::types::{AppName, BlockchainId, DatastoreId, DeviceId};
use vellum_root::descriptor::DatastoreDescriptor;

/// A peer device and its app public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePubkey {
    /// The peer device
    pub device_id: DeviceId,
    /// Its uncompressed public key, hex
    pub public_key: String,
}

/// How this mount resolves reads.
///
/// The two reader modes and the two path variants discriminate every
/// operation; they live here as tagged data, not as subtypes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ReaderMode {
    /// This device reads its own datastore directly by id
    Single,
    /// Reads aggregate over every device advertised by the owner's name
    Multi {
        /// The owner whose devices are aggregated
        blockchain_id: BlockchainId,
    },
}

/// Replica URLs recorded when this client created the datastore.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationUrls {
    /// Replica URLs of the descriptor
    pub datastore_urls: Vec<String>,
    /// Replica URLs of the initial device root
    pub root_urls: Vec<String>,
}

/// The cached handle for one (owner, app) mount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MountContext {
    /// The API node serving this mount
    pub api_base: Url,
    /// Reader mode
    pub mode: ReaderMode,
    /// Application this mount belongs to
    pub app_name: AppName,
    /// The mounted datastore
    pub datastore_id: DatastoreId,
    /// This device
    pub device_id: DeviceId,
    /// Writer private key (hex), present iff this device writes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    /// Peer devices and their public keys
    pub data_pubkeys: Vec<DevicePubkey>,
    /// The descriptor as last accepted by the gateway
    pub descriptor: DatastoreDescriptor,
    /// Whether this mount created the datastore
    #[serde(default)]
    pub created: bool,
    /// Replica URLs from creation, when `created`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urls: Option<CreationUrls>,
}

impl MountContext {
    /// The owner this mount is cached under: the blockchain id in
    /// multi-reader mode, the datastore id otherwise.
    pub fn owner(&self) -> String {
        match &self.mode {
            ReaderMode::Multi { blockchain_id } => blockchain_id.to_string(),
            ReaderMode::Single => self.datastore_id.to_string(),
        }
    }

    /// Decode the writer key, if this device writes.
    pub fn signing_key(
        &self,
    ) -> Result<Option<k256::ecdsa::SigningKey>, vellum_root::error::CryptoError> {
        self.private_key
            .as_deref()
            .map(vellum_root::crypto::decode_private_key)
            .transpose()
    }
}
