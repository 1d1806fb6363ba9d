//! The datastore descriptor: signed once at creation, immutable
//! thereafter.

use crate::crypto::{self, address_from_public_key};
use crate::error::{CryptoError, Result};
use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vellum_common::stable_json::to_stable_string;
use vellum_common::types::{DatastoreId, DeviceId};

/// Kind tag of a datastore descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatastoreKind {
    /// A flat file namespace
    Datastore,
    /// A collection (write-many, reader-defined merge)
    Collection,
}

/// The signed, immutable description of a datastore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastoreDescriptor {
    /// Kind tag
    #[serde(rename = "type")]
    pub kind: DatastoreKind,
    /// Uncompressed public key, hex
    pub pubkey: String,
    /// Ordered driver names replicating this datastore
    pub drivers: Vec<String>,
    /// Devices spanning the datastore
    pub device_ids: Vec<DeviceId>,
    /// Identifies the logical root directory across all devices
    pub root_uuid: Uuid,
}

impl DatastoreDescriptor {
    /// Build a descriptor for a new datastore, minting a fresh root UUID.
    pub fn new(
        kind: DatastoreKind,
        key: &SigningKey,
        drivers: Vec<String>,
        device_ids: Vec<DeviceId>,
    ) -> Self {
        Self {
            kind,
            pubkey: crypto::public_key_hex(key),
            drivers,
            device_ids,
            root_uuid: Uuid::new_v4(),
        }
    }

    /// The datastore id this descriptor belongs to: the address of its
    /// public key.
    pub fn datastore_id(&self) -> std::result::Result<DatastoreId, CryptoError> {
        address_from_public_key(&self.pubkey)
    }

    /// Canonical JSON of the descriptor - the byte sequence signed at
    /// creation and re-attached to every mutation request.
    pub fn serialize(&self) -> Result<String> {
        Ok(to_stable_string(self)?)
    }
}
