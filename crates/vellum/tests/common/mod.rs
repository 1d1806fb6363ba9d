//! Shared mock gateway and fixtures for the client tests.
#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use http::Response as HttpResponse;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use url::Url;
use uuid::Uuid;
use vellum::client::DatastoreClient;
use vellum_common::error::TransportError;
use vellum_common::gateway::GatewayTransport;
use vellum_common::storage::MemoryBlobStore;
use vellum_common::types::{AppName, DatastoreId, DeviceId};
use vellum_root::descriptor::{DatastoreDescriptor, DatastoreKind};

/// Private key 1; its public key is the curve generator.
pub const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";
pub const PUB_ONE: &str = "0479be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8";
pub const ADDR_ONE: &str = "1EHNa6Q4Jz2uvNExL497mE43ikXhwF6kZm";

#[derive(Clone, Default)]
pub struct MockClient {
    // queue of HTTP responses to pop for each fetch call
    queue: Arc<Mutex<VecDeque<HttpResponse<Vec<u8>>>>>,
    // capture requests for assertions
    log: Arc<Mutex<Vec<http::Request<Vec<u8>>>>>,
}

impl MockClient {
    pub async fn push(&self, resp: HttpResponse<Vec<u8>>) {
        self.queue.lock().await.push_back(resp);
    }

    pub async fn take_log(&self) -> Vec<http::Request<Vec<u8>>> {
        let mut log = self.log.lock().await;
        let out = std::mem::take(&mut *log);
        out
    }
}

impl GatewayTransport for MockClient {
    fn fetch(
        &self,
        request: http::Request<Vec<u8>>,
    ) -> impl core::future::Future<
        Output = core::result::Result<http::Response<Vec<u8>>, TransportError>,
    > + Send {
        let log = self.log.clone();
        let queue = self.queue.clone();
        async move {
            log.lock().await.push(request);
            Ok(queue.lock().await.pop_front().expect("no queued response"))
        }
    }
}

pub fn json_response(status: u16, body: &serde_json::Value) -> HttpResponse<Vec<u8>> {
    HttpResponse::builder()
        .status(status)
        .body(serde_json::to_vec(body).unwrap())
        .unwrap()
}

pub fn raw_response(status: u16, body: &[u8]) -> HttpResponse<Vec<u8>> {
    HttpResponse::builder()
        .status(status)
        .body(body.to_vec())
        .unwrap()
}

pub fn not_found() -> HttpResponse<Vec<u8>> {
    json_response(404, &serde_json::json!({"error": "no such datastore"}))
}

/// An unsigned session JWT carrying the test claims.
pub fn session_token(extra_storage: Option<serde_json::Value>) -> String {
    let storage = extra_storage.unwrap_or_else(|| {
        serde_json::json!({
            "classes": {
                "read_local": ["disk"],
                "write_local": ["disk"],
                "read_public": ["s3"],
                "write_public": ["s3"]
            },
            "preferences": {}
        })
    });
    let claims = serde_json::json!({
        "app_domain": "files.app.co",
        "app_user_id": ADDR_ONE,
        "app_private_key": KEY_ONE,
        "device_id": "phone",
        "api_endpoint": "localhost:6270",
        "storage": storage,
    });
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256K","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    format!("{header}.{payload}.sig")
}

pub type TestClient = DatastoreClient<MemoryBlobStore, MockClient>;

pub fn client(mock: &MockClient) -> TestClient {
    client_with_token(mock, &session_token(None))
}

pub fn client_with_token(mock: &MockClient, token: &str) -> TestClient {
    let store = Arc::new(MemoryBlobStore::default());
    DatastoreClient::new(
        mock.clone(),
        Url::parse("http://localhost:6270").unwrap(),
        token.to_string(),
        store,
    )
    .expect("client")
}

pub fn descriptor() -> DatastoreDescriptor {
    DatastoreDescriptor {
        kind: DatastoreKind::Datastore,
        pubkey: PUB_ONE.to_string(),
        drivers: vec!["disk".to_string()],
        device_ids: vec![DeviceId::new("phone").unwrap()],
        root_uuid: Uuid::nil(),
    }
}

pub fn datastore_id() -> DatastoreId {
    DatastoreId::new(ADDR_ONE).unwrap()
}

pub fn app_name() -> AppName {
    AppName::new("files.app.co").unwrap()
}

pub fn mount_response() -> HttpResponse<Vec<u8>> {
    json_response(
        200,
        &serde_json::json!({"datastore": serde_json::to_value(descriptor()).unwrap()}),
    )
}
