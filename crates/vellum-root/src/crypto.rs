//! secp256k1 keys, address derivation, canonical hashing, and signing.
//!
//! The framing here is non-negotiable: the hash over a payload `P` is
//! `sha256(ASCII(len(P)) || ":" || P || ",")`, and signatures are
//! fixed-width `R || S` (32 + 32 bytes) in canonical low-S form, base64
//! encoded. Peers reject anything else.

use crate::error::CryptoError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use k256::ecdsa::signature::Signer;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use vellum_common::types::DatastoreId;

/// Version byte prepended to the key hash in address derivation.
const ADDRESS_VERSION: u8 = 0x00;

/// Decode a private key from hex.
///
/// Accepts 32 bytes, or 33 bytes whose final byte is the `0x01`
/// compressed-format marker (stripped before use).
pub fn decode_private_key(key_hex: &str) -> Result<SigningKey, CryptoError> {
    let mut bytes = hex::decode(key_hex)?;
    match bytes.len() {
        32 => {}
        33 if bytes[32] == 0x01 => {
            bytes.truncate(32);
        }
        got => return Err(CryptoError::InvalidKeyLength { got }),
    }
    SigningKey::from_slice(&bytes).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

/// Uncompressed SEC1 public key bytes (65 bytes, `0x04 || X || Y`).
pub fn public_key_bytes(key: &SigningKey) -> Vec<u8> {
    key.verifying_key()
        .to_encoded_point(false)
        .as_bytes()
        .to_vec()
}

/// Uncompressed public key, hex encoded.
pub fn public_key_hex(key: &SigningKey) -> String {
    hex::encode(public_key_bytes(key))
}

/// Derive the Base58Check address of a public key:
/// `Base58Check(version || RIPEMD160(SHA256(pubkey)))`.
pub fn address_from_public_key(pubkey_hex: &str) -> Result<DatastoreId, CryptoError> {
    let pubkey = hex::decode(pubkey_hex)?;
    let sha = Sha256::digest(&pubkey);
    let h160 = Ripemd160::digest(sha);
    let address = bs58::encode(h160)
        .with_check_version(ADDRESS_VERSION)
        .into_string();
    DatastoreId::new(&address).map_err(|e| CryptoError::InvalidKey(e.to_string()))
}

/// The datastore id owned by a keypair: the address of its uncompressed
/// public key. Holds byte-for-byte across clients.
pub fn datastore_id_of(key: &SigningKey) -> DatastoreId {
    // The address of a freshly derived public key is always well-formed.
    address_from_public_key(&public_key_hex(key)).expect("derived address is valid base58check")
}

/// sha256 of the raw buffer, hex encoded.
pub fn hash_raw_data(buf: &[u8]) -> String {
    hex::encode(Sha256::digest(buf))
}

/// The canonical payload frame: `ASCII(len) || ":" || payload || ","`.
pub fn payload_frame(buf: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(buf.len() + 24);
    frame.extend_from_slice(buf.len().to_string().as_bytes());
    frame.push(b':');
    frame.extend_from_slice(buf);
    frame.push(b',');
    frame
}

/// sha256 over the canonical frame of the payload, hex encoded.
pub fn hash_data_payload(buf: &[u8]) -> String {
    hash_raw_data(&payload_frame(buf))
}

/// ECDSA-sign a buffer (sha256 digest of the buffer is the message).
///
/// The signature is low-S normalized and encoded as fixed-width
/// `R || S`, base64.
pub fn sign_raw_data(buf: &[u8], key: &SigningKey) -> String {
    let sig: Signature = key.sign(buf);
    encode_signature(sig)
}

/// ECDSA-sign a precomputed sha256 digest (hex encoded).
pub fn sign_raw_data_prehashed(digest_hex: &str, key: &SigningKey) -> Result<String, CryptoError> {
    let digest = hex::decode(digest_hex)?;
    let sig: Signature = key
        .sign_prehash(&digest)
        .map_err(|e| CryptoError::Signing(e.to_string()))?;
    Ok(encode_signature(sig))
}

/// Sign a payload string under the canonical frame.
pub fn sign_data_payload(payload: &str, key: &SigningKey) -> String {
    sign_raw_data(&payload_frame(payload.as_bytes()), key)
}

fn encode_signature(sig: Signature) -> String {
    let sig = sig.normalize_s().unwrap_or(sig);
    // fixed-width r || s, each left-zero-padded to 32 bytes
    BASE64.encode(sig.to_vec())
}
