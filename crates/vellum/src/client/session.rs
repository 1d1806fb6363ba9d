//! Gateway session-token claims.
//!
//! The session token is a JWT minted by the gateway's auth endpoint. The
//! client reads its payload without verifying the signature - token
//! verification is the issuer's side of the boundary; the gateway rejects
//! a forged token on first use.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;
use vellum_common::types::{AppName, BlockchainId, DeviceId};
use vellum_root::policy::StorageClass;

/// Claims the client reads from a gateway session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Application the session was issued for
    pub app_domain: AppName,
    /// Owner name, when the session is bound to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain_id: Option<BlockchainId>,
    /// Datastore id of the application keypair
    pub app_user_id: SmolStr,
    /// Writer private key (hex), present iff this device writes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_private_key: Option<String>,
    /// This device's identifier
    pub device_id: DeviceId,
    /// `host:port` of the issuing API node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<SmolStr>,
    /// The node's storage topology
    #[serde(default)]
    pub storage: StorageClaims,
}

/// Storage topology advertised in the session token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageClaims {
    /// Capability class → drivers declaring it
    #[serde(default)]
    pub classes: BTreeMap<StorageClass, Vec<SmolStr>>,
    /// App name → preferred driver list
    #[serde(default)]
    pub preferences: BTreeMap<SmolStr, Vec<SmolStr>>,
}

/// Session-token decoding errors.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SessionTokenError {
    /// The token is not three dot-separated segments
    #[error("token is not a JWT")]
    Malformed,

    /// The payload segment is not base64url
    #[error("token payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    /// The payload does not deserialize to the expected claims
    #[error("token claims do not match: {0}")]
    Claims(#[from] serde_json::Error),
}

/// Decode a JWT's payload segment without verifying its signature.
pub fn decode_jwt_payload<T: DeserializeOwned>(token: &str) -> Result<T, SessionTokenError> {
    let mut segments = token.split('.');
    let (Some(_header), Some(payload), Some(_sig), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(SessionTokenError::Malformed);
    };
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Decode a gateway session token into its claims.
pub fn decode_session_token(token: &str) -> Result<SessionClaims, SessionTokenError> {
    decode_jwt_payload(token)
}

#[cfg(test)]
pub(crate) fn encode_unsigned_jwt<T: Serialize>(claims: &T) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims).unwrap());
    format!("{header}.{payload}.sig")
}
