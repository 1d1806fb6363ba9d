//! The device-root directory page and its pure transformations.
//!
//! One root page exists per (device, datastore). Edits never mutate in
//! place: `device_root_insert` and `device_root_remove` clone the page
//! and advance its timestamp, so a caller always holds a consistent
//! snapshot while the new page is in flight.

use crate::envelope::{DataEnvelope, make_data_info, utf8_escape};
use crate::tombstone::parse_data_tombstone;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use vellum_common::types::{DatastoreId, DeviceId};

/// Wire protocol version of root pages and file entries.
pub const ROOT_PROTO_VERSION: u64 = 2;

/// Directory-page type tag: leaf.
pub const ROOT_KIND_LEAF: u64 = 1;

/// One file's authoritative metadata inside a device root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Always [`ROOT_PROTO_VERSION`]
    pub proto_version: u64,
    /// Replica URLs where the bytes live
    pub urls: Vec<String>,
    /// `hash_data_payload` of the file bytes, hex
    pub data_hash: String,
    /// Milliseconds at entry creation
    pub timestamp: u64,
}

impl FileEntry {
    /// Build an entry stamped with the current wall clock.
    pub fn new(urls: Vec<String>, data_hash: impl Into<String>) -> Self {
        Self {
            proto_version: ROOT_PROTO_VERSION,
            urls,
            data_hash: data_hash.into(),
            timestamp: crate::now_ms(),
        }
    }
}

/// A per-device directory page: every file this device believes exists,
/// with per-file tombstones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRoot {
    /// Always [`ROOT_PROTO_VERSION`]
    pub proto_version: u64,
    /// Always [`ROOT_KIND_LEAF`]
    #[serde(rename = "type")]
    pub kind: u64,
    /// Datastore id of the owning keypair
    pub owner: DatastoreId,
    /// Addresses of reader public keys (empty in single-reader mode)
    pub readers: Vec<String>,
    /// Strictly monotonic per (device, root uuid); see
    /// [`advanced_timestamp`]
    pub timestamp: u64,
    /// url-encoded file name → entry
    pub files: BTreeMap<String, FileEntry>,
    /// url-encoded file name → signed tombstone
    pub tombstones: BTreeMap<String, String>,
}

impl DeviceRoot {
    /// Look up a live file entry, honoring tombstones.
    ///
    /// A file exists iff its name is in `files` and any tombstone for the
    /// name carries an older-or-equal timestamp. Removal does not delete
    /// the `files` entry; readers resolve by comparing timestamps.
    pub fn file_entry(&self, file_key: &str) -> Option<&FileEntry> {
        let entry = self.files.get(file_key)?;
        if let Some(tombstone) = self.tombstones.get(file_key) {
            if let Some((stamp, _)) = parse_data_tombstone(tombstone) {
                if stamp > entry.timestamp {
                    return None;
                }
            }
        }
        Some(entry)
    }

    /// Names of all live files, tombstones applied.
    pub fn live_files(&self) -> impl Iterator<Item = (&str, &FileEntry)> {
        self.files
            .keys()
            .filter_map(|name| Some((name.as_str(), self.file_entry(name)?)))
    }
}

/// The map key a file name uses inside a root page (url-encoded).
pub fn file_key(name: &str) -> String {
    utf8_escape(name.trim_start_matches('/'))
}

/// A fresh, empty device root stamped with the current wall clock.
pub fn make_empty_device_root(owner: DatastoreId, readers: Vec<String>) -> DeviceRoot {
    DeviceRoot {
        proto_version: ROOT_PROTO_VERSION,
        kind: ROOT_KIND_LEAF,
        owner,
        readers,
        timestamp: crate::now_ms(),
        files: BTreeMap::new(),
        tombstones: BTreeMap::new(),
    }
}

/// The next timestamp for an edited page: `max(now_ms, old + 1)`.
///
/// Keeps the per-(device, root) sequence strictly increasing even when
/// the wall clock stalls or steps backwards.
pub fn advanced_timestamp(old: u64) -> u64 {
    std::cmp::max(crate::now_ms(), old + 1)
}

/// Clone the page with `files[name] = entry` and an advanced timestamp.
pub fn device_root_insert(root: &DeviceRoot, name: &str, entry: FileEntry) -> DeviceRoot {
    let mut next = root.clone();
    next.files.insert(file_key(name), entry);
    next.timestamp = advanced_timestamp(root.timestamp);
    next
}

/// Clone the page with `tombstones[name] = tombstone` and an advanced
/// timestamp. The `files` entry stays; readers compare timestamps.
pub fn device_root_remove(root: &DeviceRoot, name: &str, tombstone: String) -> DeviceRoot {
    let mut next = root.clone();
    next.tombstones.insert(file_key(name), tombstone);
    next.timestamp = advanced_timestamp(root.timestamp);
    next
}

/// The data id a datastore's root pages live under.
pub fn root_data_id(datastore_id: &DatastoreId, root_uuid: &Uuid) -> String {
    format!("{}.{}", datastore_id, root_uuid)
}

/// Wrap a device root in the mutable-data envelope for transmission.
pub fn device_root_serialize(
    device_id: &DeviceId,
    datastore_id: &DatastoreId,
    root_uuid: &Uuid,
    root: &DeviceRoot,
) -> crate::error::Result<DataEnvelope> {
    let payload = vellum_common::stable_json::to_stable_string(root)?;
    Ok(make_data_info(
        &root_data_id(datastore_id, root_uuid),
        payload,
        device_id,
        None,
    ))
}
