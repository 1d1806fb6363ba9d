//! Signed deletion markers.
//!
//! A tombstone is `delete-<timestamp>:<fq_data_id>`; signing appends
//! `:<base64 signature>`. Parsing is total - malformed input yields
//! `None`, never an error.

use crate::crypto::sign_data_payload;
use crate::envelope::make_fully_qualified_data_id;
use k256::ecdsa::SigningKey;
use vellum_common::types::DeviceId;

/// Make an unsigned tombstone for a fully-qualified data id, stamped with
/// the current wall clock in milliseconds.
pub fn make_data_tombstone(fq_data_id: &str) -> String {
    format!("delete-{}:{}", crate::now_ms(), fq_data_id)
}

/// Make one tombstone per device for the given data id.
pub fn make_data_tombstones(device_ids: &[DeviceId], data_id: &str) -> Vec<String> {
    device_ids
        .iter()
        .map(|device_id| make_data_tombstone(&make_fully_qualified_data_id(device_id, data_id)))
        .collect()
}

/// Sign a tombstone, appending its signature.
pub fn sign_data_tombstone(tombstone: &str, key: &SigningKey) -> String {
    format!("{}:{}", tombstone, sign_data_payload(tombstone, key))
}

/// Parse an unsigned tombstone into `(timestamp, fq_data_id)`.
///
/// The timestamp accepts any decimal integer (second- or
/// millisecond-resolution writers both parse).
pub fn parse_data_tombstone(tombstone: &str) -> Option<(u64, &str)> {
    let rest = tombstone.strip_prefix("delete-")?;
    let (digits, id) = rest.split_once(':')?;
    let timestamp = digits.parse::<u64>().ok()?;
    Some((timestamp, id))
}
