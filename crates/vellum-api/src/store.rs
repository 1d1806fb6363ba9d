//! Datastore lifecycle endpoints.

use crate::StatusResponse;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use vellum_common::error::EncodeError;
use vellum_common::gateway::{GatewayRequest, GatewayResp};
use vellum_common::types::BlockchainId;
use vellum_root::descriptor::DatastoreDescriptor;

/// `GET /v1/stores/<ref>` - resolve a datastore for mounting.
///
/// Single-reader mounts pass the datastore id plus `device_ids` /
/// `device_pubkeys`; multi-reader mounts pass the app name plus
/// `blockchain_id`.
#[derive(Debug, Clone, Serialize)]
pub struct GetDatastore {
    /// Datastore id (single-reader) or app name (multi-reader)
    #[serde(skip)]
    pub store_ref: SmolStr,
    /// CSV of device ids spanning the datastore
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_ids: Option<String>,
    /// CSV of the matching device public keys
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_pubkeys: Option<String>,
    /// Owner name for multi-reader resolution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockchain_id: Option<BlockchainId>,
}

impl GatewayRequest for GetDatastore {
    const METHOD: http::Method = http::Method::GET;
    type Response = DatastoreResponse;

    fn path(&self) -> String {
        format!("/v1/stores/{}", self.store_ref)
    }
}

/// Marker for the datastore resolution schema.
#[derive(Debug)]
pub struct DatastoreResponse;

/// The resolved datastore descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatastoreOutput {
    /// The descriptor as the gateway last accepted it
    pub datastore: DatastoreDescriptor,
}

impl GatewayResp for DatastoreResponse {
    const SCHEMA: &'static str = "get-datastore";
    type Output = DatastoreOutput;
}

/// Body of a datastore create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutDatastoreBody {
    /// Serialized mutable-data envelope over the descriptor
    pub datastore_info: String,
    /// Signature over `datastore_info`
    pub datastore_sig: String,
    /// Serialized mutable-data envelope over the empty device root
    pub root_info: String,
    /// Signature over `root_info`
    pub root_sig: String,
    /// One signed root tombstone per device, for later cleanup
    pub root_tombstones: Vec<String>,
}

/// `POST /v1/stores` - create a datastore.
///
/// `datastore_pubkey` accompanies the API-password auth path, which has
/// no session to infer the key from.
#[derive(Debug, Clone, Serialize)]
pub struct PutDatastore {
    /// Explicit public key for the API-password path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datastore_pubkey: Option<String>,
    /// The signed create bundle
    #[serde(skip)]
    pub body: PutDatastoreBody,
}

impl GatewayRequest for PutDatastore {
    const METHOD: http::Method = http::Method::POST;
    type Response = PutDatastoreResponse;

    fn path(&self) -> String {
        "/v1/stores".to_string()
    }

    fn encode_body(&self) -> Result<Option<Vec<u8>>, EncodeError> {
        Ok(Some(serde_json::to_vec(&self.body)?))
    }
}

/// Marker for the create response schema.
#[derive(Debug)]
pub struct PutDatastoreResponse;

/// Replica URLs the create produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutDatastoreOutput {
    /// Whether the create was accepted
    pub status: bool,
    /// Replica URLs of the descriptor
    #[serde(default)]
    pub datastore_urls: Vec<String>,
    /// Replica URLs of the empty device root
    #[serde(default)]
    pub root_urls: Vec<String>,
}

impl GatewayResp for PutDatastoreResponse {
    const SCHEMA: &'static str = "put-datastore";
    type Output = PutDatastoreOutput;
}

/// Body of a datastore delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteDatastoreBody {
    /// Signed tombstones for the descriptor, one per device
    pub datastore_tombstones: Vec<String>,
    /// Signed tombstones for the root page, one per device
    pub root_tombstones: Vec<String>,
}

/// `DELETE /v1/stores` - delete a datastore.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteDatastore {
    /// The signed tombstone bundle
    #[serde(skip)]
    pub body: DeleteDatastoreBody,
}

impl GatewayRequest for DeleteDatastore {
    const METHOD: http::Method = http::Method::DELETE;
    type Response = DeleteDatastoreResponse;

    fn path(&self) -> String {
        "/v1/stores".to_string()
    }

    fn encode_body(&self) -> Result<Option<Vec<u8>>, EncodeError> {
        Ok(Some(serde_json::to_vec(&self.body)?))
    }
}

/// Marker for the delete response schema.
#[derive(Debug)]
pub struct DeleteDatastoreResponse;

impl GatewayResp for DeleteDatastoreResponse {
    const SCHEMA: &'static str = "delete-datastore";
    type Output = StatusResponse;
}

#[cfg(test)]
mod tests {
    use super::*;
    use vellum_common::gateway::{CallOptions, build_http_request};
    use vellum_common::url::Url;

    #[test]
    fn single_reader_query() {
        let req = GetDatastore {
            store_ref: "1abc".into(),
            device_ids: Some("phone,laptop".into()),
            device_pubkeys: Some("04aa,04bb".into()),
            blockchain_id: None,
        };
        let http = build_http_request(
            &Url::parse("http://node:6270").unwrap(),
            &req,
            &CallOptions::default(),
        )
        .unwrap();
        let uri = http.uri().to_string();
        assert!(uri.contains("/v1/stores/1abc?"));
        assert!(uri.contains("device_ids=phone%2Claptop"));
        assert!(uri.contains("device_pubkeys=04aa%2C04bb"));
        assert!(!uri.contains("blockchain_id"));
    }

    #[test]
    fn multi_reader_query() {
        let req = GetDatastore {
            store_ref: "files.app.co".into(),
            device_ids: None,
            device_pubkeys: None,
            blockchain_id: Some(BlockchainId::new("alice.id").unwrap()),
        };
        let http = build_http_request(
            &Url::parse("http://node:6270").unwrap(),
            &req,
            &CallOptions::default(),
        )
        .unwrap();
        let uri = http.uri().to_string();
        assert!(uri.contains("/v1/stores/files.app.co?blockchain_id=alice.id"));
    }

    #[test]
    fn create_body_is_json_and_pubkey_is_query() {
        let req = PutDatastore {
            datastore_pubkey: Some("04aa".into()),
            body: PutDatastoreBody {
                datastore_info: "info".into(),
                datastore_sig: "sig".into(),
                root_info: "root".into(),
                root_sig: "rsig".into(),
                root_tombstones: vec![],
            },
        };
        let http = build_http_request(
            &Url::parse("http://node:6270").unwrap(),
            &req,
            &CallOptions::default(),
        )
        .unwrap();
        assert!(http.uri().to_string().contains("/v1/stores?datastore_pubkey=04aa"));
        let body: PutDatastoreBody = serde_json::from_slice(http.body()).unwrap();
        assert_eq!(body.datastore_info, "info");
    }
}
