//! Session issuance.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use vellum_common::gateway::{GatewayRequest, GatewayResp};

/// `GET /v1/auth?authRequest=<jwt>` - exchange an auth-request JWT for a
/// session token. Authenticates with the node API password.
#[derive(Debug, Clone, Serialize)]
pub struct GetCoreSessionToken {
    /// The signed auth-request JWT
    #[serde(rename = "authRequest")]
    pub auth_request: String,
}

impl GatewayRequest for GetCoreSessionToken {
    const METHOD: http::Method = http::Method::GET;
    type Response = CoreSessionTokenResponse;

    fn path(&self) -> String {
        "/v1/auth".to_string()
    }
}

/// Marker for the session-token response schema.
#[derive(Debug)]
pub struct CoreSessionTokenResponse;

/// The issued session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreSessionTokenOutput {
    /// Session JWT to present as the bearer credential
    pub token: SmolStr,
}

impl GatewayResp for CoreSessionTokenResponse {
    const SCHEMA: &'static str = "core-session-token";
    type Output = CoreSessionTokenOutput;
}
