//! Device-root read and write endpoints.

use crate::MutationBody;
use serde::{Deserialize, Serialize};
use vellum_common::error::EncodeError;
use vellum_common::gateway::{GatewayRequest, GatewayResp};
use vellum_common::types::{DatastoreId, DeviceId};
use vellum_root::root::DeviceRoot;

/// `GET /v1/stores/<id>/device_roots?this_device_id=…` - read the current
/// device root.
#[derive(Debug, Clone, Serialize)]
pub struct GetDeviceRoot {
    /// The datastore the root belongs to
    #[serde(skip)]
    pub store_id: DatastoreId,
    /// Which device's root to read
    pub this_device_id: DeviceId,
}

impl GatewayRequest for GetDeviceRoot {
    const METHOD: http::Method = http::Method::GET;
    type Response = DeviceRootResponse;

    fn path(&self) -> String {
        format!("/v1/stores/{}/device_roots", self.store_id)
    }
}

/// Marker for the device-root read schema.
#[derive(Debug)]
pub struct DeviceRootResponse;

/// The current device root page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRootOutput {
    /// The page as the gateway last accepted it
    pub device_root: DeviceRoot,
}

impl GatewayResp for DeviceRootResponse {
    const SCHEMA: &'static str = "get-device-root";
    type Output = DeviceRootOutput;
}

/// `POST /v1/stores/<id>/device_roots?sync=…` - write a device root.
#[derive(Debug, Clone, Serialize)]
pub struct PutDeviceRoot {
    /// The datastore the root belongs to
    #[serde(skip)]
    pub store_id: DatastoreId,
    /// Ask the gateway to replicate synchronously
    pub sync: bool,
    /// The signed root page
    #[serde(skip)]
    pub body: MutationBody,
}

impl GatewayRequest for PutDeviceRoot {
    const METHOD: http::Method = http::Method::POST;
    type Response = PutDeviceRootResponse;

    fn path(&self) -> String {
        format!("/v1/stores/{}/device_roots", self.store_id)
    }

    fn encode_body(&self) -> Result<Option<Vec<u8>>, EncodeError> {
        Ok(Some(serde_json::to_vec(&self.body)?))
    }
}

/// Marker for the device-root write schema.
#[derive(Debug)]
pub struct PutDeviceRootResponse;

/// Replica URLs of the written page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutDeviceRootOutput {
    /// Whether the write was accepted
    pub status: bool,
    /// Replica URLs of the page
    #[serde(default)]
    pub urls: Vec<String>,
}

impl GatewayResp for PutDeviceRootResponse {
    const SCHEMA: &'static str = "put-device-root";
    type Output = PutDeviceRootOutput;
}
