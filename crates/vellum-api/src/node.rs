//! Node liveness.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use vellum_common::gateway::{GatewayRequest, GatewayResp};

/// `GET /v1/node/ping`
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ping {}

impl GatewayRequest for Ping {
    const METHOD: http::Method = http::Method::GET;
    type Response = PingResponse;

    fn path(&self) -> String {
        "/v1/node/ping".to_string()
    }
}

/// Marker for the ping response schema.
#[derive(Debug)]
pub struct PingResponse;

/// Liveness report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingOutput {
    /// `"alive"` on a healthy node
    pub status: SmolStr,
}

impl GatewayResp for PingResponse {
    const SCHEMA: &'static str = "ping";
    type Output = PingOutput;
}
