//! File data, header, and listing endpoints.

use crate::{MutationBody, StatusResponse};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use vellum_common::error::DecodeError;
use vellum_common::gateway::{GatewayRequest, GatewayResp};
use vellum_common::types::{DatastoreId, DeviceId};
use vellum_root::root::{DeviceRoot, FileEntry};

/// `GET /v1/stores/<id>/files?path=<name>` - fetch raw file bytes.
#[derive(Debug, Clone, Serialize)]
pub struct GetFileData {
    /// The datastore to read from
    #[serde(skip)]
    pub store_id: DatastoreId,
    /// File name
    pub path: String,
}

impl GatewayRequest for GetFileData {
    const METHOD: http::Method = http::Method::GET;
    type Response = FileDataResponse;

    fn path(&self) -> String {
        format!("/v1/stores/{}/files", self.store_id)
    }
}

/// Marker for the raw file-bytes "schema" (no decoding applied).
#[derive(Debug)]
pub struct FileDataResponse;

impl GatewayResp for FileDataResponse {
    const SCHEMA: &'static str = "get-file";
    type Output = Bytes;

    fn decode_output(body: &[u8]) -> Result<Self::Output, DecodeError> {
        Ok(Bytes::copy_from_slice(body))
    }
}

/// `GET /v1/stores/<id>/headers?path=<name>&this_device_id=…` - fetch a
/// file's header (its device-root entry).
#[derive(Debug, Clone, Serialize)]
pub struct GetFileHeader {
    /// The datastore to read from
    #[serde(skip)]
    pub store_id: DatastoreId,
    /// File name
    pub path: String,
    /// Device whose root is consulted
    pub this_device_id: DeviceId,
}

impl GatewayRequest for GetFileHeader {
    const METHOD: http::Method = http::Method::GET;
    type Response = FileHeaderResponse;

    fn path(&self) -> String {
        format!("/v1/stores/{}/headers", self.store_id)
    }
}

/// Marker for the file-header schema.
#[derive(Debug)]
pub struct FileHeaderResponse;

impl GatewayResp for FileHeaderResponse {
    const SCHEMA: &'static str = "get-file-header";
    type Output = FileEntry;
}

/// `GET /v1/stores/<id>/listing` - fetch the aggregate root.
#[derive(Debug, Clone, Serialize)]
pub struct GetListing {
    /// The datastore to list
    #[serde(skip)]
    pub store_id: DatastoreId,
}

impl GatewayRequest for GetListing {
    const METHOD: http::Method = http::Method::GET;
    type Response = ListingResponse;

    fn path(&self) -> String {
        format!("/v1/stores/{}/listing", self.store_id)
    }
}

/// Marker for the listing schema.
#[derive(Debug)]
pub struct ListingResponse;

impl GatewayResp for ListingResponse {
    const SCHEMA: &'static str = "get-listing";
    type Output = DeviceRoot;
}

/// `POST /v1/stores/<id>/files?path=<name>` - create or update a file.
#[derive(Debug, Clone, Serialize)]
pub struct PutFileData {
    /// The datastore to write to
    #[serde(skip)]
    pub store_id: DatastoreId,
    /// File name
    pub path: String,
    /// Signed header/payload bundle
    #[serde(skip)]
    pub body: MutationBody,
}

impl GatewayRequest for PutFileData {
    const METHOD: http::Method = http::Method::POST;
    type Response = PutFileResponse;

    fn path(&self) -> String {
        format!("/v1/stores/{}/files", self.store_id)
    }

    fn encode_body(&self) -> Result<Option<Vec<u8>>, vellum_common::error::EncodeError> {
        Ok(Some(serde_json::to_vec(&self.body)?))
    }
}

/// Marker for the file-write schema.
#[derive(Debug)]
pub struct PutFileResponse;

/// Replica URLs the write produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutFileOutput {
    /// Whether the write was accepted
    pub status: bool,
    /// Replica URLs of the file bytes
    #[serde(default)]
    pub urls: Vec<String>,
}

impl GatewayResp for PutFileResponse {
    const SCHEMA: &'static str = "put-file";
    type Output = PutFileOutput;
}

/// `DELETE /v1/stores/<id>/files?path=<name>` - delete a file.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteFileData {
    /// The datastore to delete from
    #[serde(skip)]
    pub store_id: DatastoreId,
    /// File name
    pub path: String,
    /// Signed tombstone bundle
    #[serde(skip)]
    pub body: MutationBody,
}

impl GatewayRequest for DeleteFileData {
    const METHOD: http::Method = http::Method::DELETE;
    type Response = DeleteFileResponse;

    fn path(&self) -> String {
        format!("/v1/stores/{}/files", self.store_id)
    }

    fn encode_body(&self) -> Result<Option<Vec<u8>>, vellum_common::error::EncodeError> {
        Ok(Some(serde_json::to_vec(&self.body)?))
    }
}

/// Marker for the file-delete schema.
#[derive(Debug)]
pub struct DeleteFileResponse;

impl GatewayResp for DeleteFileResponse {
    const SCHEMA: &'static str = "delete-file";
    type Output = StatusResponse;
}
