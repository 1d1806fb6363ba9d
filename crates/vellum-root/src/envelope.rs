//! The mutable-data envelope: the canonical JSON shape that is actually
//! signed and transmitted for every mutable object.

use crate::crypto;
use crate::error::Result;
use k256::ecdsa::SigningKey;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use vellum_common::stable_json::to_stable_string;
use vellum_common::types::DeviceId;

/// Characters that pass through data-id encoding unescaped: letters,
/// digits, and `@*_+-./`. Everything else (`:` included) is
/// percent-encoded.
pub const DATA_ID_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'@')
    .remove(b'*')
    .remove(b'_')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'/');

/// Percent-encode a string with the data-id safe set.
pub fn utf8_escape(s: &str) -> String {
    utf8_percent_encode(s, DATA_ID_ESCAPE).to_string()
}

/// Build the fully-qualified data id for `(device_id, data_id)`.
///
/// Any `/` in the data id is first replaced by the literal characters
/// `\x2f`, then `device_id:data_id` is percent-encoded as a whole. The
/// substitution keeps writer-scoped ids flat: a slash never survives into
/// the encoded id's data portion.
pub fn make_fully_qualified_data_id(device_id: &DeviceId, data_id: &str) -> String {
    let flattened = data_id.replace('/', "\\x2f");
    let joined = format!("{}:{}", device_id, flattened);
    utf8_percent_encode(&joined, DATA_ID_ESCAPE).to_string()
}

/// The signed wire shape for every mutable datum.
///
/// `version` is constant 1; the device-root timestamp is the ordering
/// authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataEnvelope {
    /// Device-scoped, percent-encoded data id
    pub fq_data_id: String,
    /// Payload (already serialized by the caller)
    pub data: String,
    /// Constant 1
    pub version: u64,
    /// Milliseconds at envelope construction
    pub timestamp: u64,
}

impl DataEnvelope {
    /// Canonical JSON of this envelope - the exact byte sequence that is
    /// signed and transmitted.
    pub fn serialize(&self) -> Result<String> {
        Ok(to_stable_string(self)?)
    }

    /// Serialize and sign, yielding the header/signature pair the gateway
    /// accepts.
    pub fn sign(&self, key: &SigningKey) -> Result<SignedEnvelope> {
        let header = self.serialize()?;
        let signature = crypto::sign_raw_data(header.as_bytes(), key);
        Ok(SignedEnvelope { header, signature })
    }
}

/// A serialized envelope and its signature, ready for transmission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedEnvelope {
    /// Canonical JSON of the envelope
    pub header: String,
    /// Base64 `R || S` signature over the header bytes
    pub signature: String,
}

/// Wrap a named payload in the mutable-data envelope.
///
/// `fq_data_id` overrides the derived id when the caller already computed
/// it (device-root writes reuse the same id across edits).
pub fn make_data_info(
    data_id: &str,
    data_payload: impl Into<String>,
    device_id: &DeviceId,
    fq_data_id: Option<String>,
) -> DataEnvelope {
    DataEnvelope {
        fq_data_id: fq_data_id
            .unwrap_or_else(|| make_fully_qualified_data_id(device_id, data_id)),
        data: data_payload.into(),
        version: 1,
        timestamp: crate::now_ms(),
    }
}
