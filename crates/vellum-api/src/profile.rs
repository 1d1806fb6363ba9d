//! Owner profile resolution (peer app-key discovery).

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;
use vellum_common::gateway::{GatewayRequest, GatewayResp};
use vellum_common::types::BlockchainId;

/// `GET /v1/names/<blockchain_id>/profile` - resolve an owner's profile,
/// which embeds the keyfile JWT advertising per-device app keys.
#[derive(Debug, Clone, Serialize)]
pub struct GetProfile {
    /// The owner to resolve
    #[serde(skip)]
    pub blockchain_id: BlockchainId,
}

impl GatewayRequest for GetProfile {
    const METHOD: http::Method = http::Method::GET;
    type Response = ProfileResponse;

    fn path(&self) -> String {
        format!("/v1/names/{}/profile", self.blockchain_id)
    }
}

/// Marker for the profile schema.
#[derive(Debug)]
pub struct ProfileResponse;

/// The resolved profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileOutput {
    /// The owner's profile object
    pub profile: Profile,
}

/// An owner profile. Only the keyfile matters to the datastore client;
/// everything else passes through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// The keyfile JWT advertising per-device app public keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyfile: Option<SmolStr>,
    /// Fields this client does not interpret
    #[serde(flatten)]
    pub extra: BTreeMap<SmolStr, serde_json::Value>,
}

impl GatewayResp for ProfileResponse {
    const SCHEMA: &'static str = "get-profile";
    type Output = ProfileOutput;
}
