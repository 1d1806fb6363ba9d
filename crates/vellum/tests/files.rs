mod common;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use common::*;
use vellum::client::{DevicePubkey, MountContext, ReaderMode, StoreErrorKind};
use vellum_api::MutationBody;
use vellum_root::crypto::hash_data_payload;
use vellum_root::envelope::DataEnvelope;
use vellum_root::root::{
    DeviceRoot, FileEntry, device_root_insert, device_root_remove, make_empty_device_root,
};

fn seeded_context() -> MountContext {
    MountContext {
        api_base: url::Url::parse("http://localhost:6270").unwrap(),
        mode: ReaderMode::Single,
        app_name: app_name(),
        datastore_id: datastore_id(),
        device_id: vellum_common::types::DeviceId::new("phone").unwrap(),
        private_key: Some(KEY_ONE.to_string()),
        data_pubkeys: vec![DevicePubkey {
            device_id: vellum_common::types::DeviceId::new("phone").unwrap(),
            public_key: PUB_ONE.to_string(),
        }],
        descriptor: descriptor(),
        created: false,
        urls: None,
    }
}

async fn seed_cache(client: &TestClient) {
    client
        .cache()
        .put_context(ADDR_ONE, &app_name(), seeded_context())
        .await
        .unwrap();
}

fn root_with(entries: &[(&str, &str)]) -> DeviceRoot {
    let mut root = make_empty_device_root(datastore_id(), vec![]);
    for (name, hash) in entries {
        root = device_root_insert(&root, name, FileEntry::new(vec![], *hash));
    }
    root
}

#[tokio::test]
async fn put_then_get_round_trips() {
    let mock = MockClient::default();
    let client = client(&mock);

    // put: mount probe 404 → create → re-mount → root fetch (absent,
    // synthesized because this mount created the store) → file post →
    // root post
    mock.push(not_found()).await;
    mock.push(json_response(200, &serde_json::json!({"status": true}))).await;
    mock.push(mount_response()).await;
    mock.push(not_found()).await;
    mock.push(json_response(
        200,
        &serde_json::json!({"status": true, "urls": ["http://replica/file1"]}),
    ))
    .await;
    mock.push(json_response(200, &serde_json::json!({"status": true}))).await;

    let urls = client.put_file("/file1", b"hello world").await.unwrap();
    assert_eq!(urls, vec!["http://replica/file1"]);

    let log = mock.take_log().await;
    assert_eq!(log.len(), 6);

    // the file post carries the base64 payload and a signed header whose
    // entry hash commits to the bytes
    let put = &log[4];
    assert_eq!(put.method(), http::Method::POST);
    assert!(put.uri().to_string().contains("/files?path=file1"));
    let body: MutationBody = serde_json::from_slice(put.body()).unwrap();
    assert_eq!(body.payloads, vec![BASE64.encode(b"hello world")]);
    assert_eq!(body.headers.len(), 1);
    assert_eq!(body.signatures.len(), 1);
    let header: DataEnvelope = serde_json::from_str(&body.headers[0]).unwrap();
    let entry: FileEntry = serde_json::from_str(&header.data).unwrap();
    assert_eq!(entry.data_hash, hash_data_payload(b"hello world"));
    assert!(entry.urls.is_empty(), "provisional entry carries no urls");
    assert_eq!(
        BASE64.decode(&body.signatures[0]).unwrap().len(),
        64,
        "fixed-width R||S signature"
    );

    // the root post installs the final entry with the replica urls
    let root_put = &log[5];
    assert!(root_put.uri().to_string().contains("/device_roots"));
    let body: MutationBody = serde_json::from_slice(root_put.body()).unwrap();
    let page: DeviceRoot =
        serde_json::from_slice(&BASE64.decode(&body.payloads[0]).unwrap()).unwrap();
    let installed = page.file_entry("file1").unwrap();
    assert_eq!(installed.urls, vec!["http://replica/file1"]);
    assert_eq!(installed.data_hash, hash_data_payload(b"hello world"));

    // get: context is cached, one request
    mock.push(raw_response(200, b"hello world")).await;
    let bytes = client.get_file("/file1").await.unwrap();
    assert_eq!(&bytes[..], b"hello world");
    let log = mock.take_log().await;
    assert_eq!(log.len(), 1);
    assert!(log[0].uri().to_string().contains("/files?path=file1"));
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let mock = MockClient::default();
    let client = client(&mock);
    seed_cache(&client).await;

    // delete: root fetch → file delete → root post
    mock.push(json_response(
        200,
        &serde_json::json!({"device_root": serde_json::to_value(root_with(&[("f", "abcd")])).unwrap()}),
    ))
    .await;
    mock.push(json_response(200, &serde_json::json!({"status": true}))).await;
    mock.push(json_response(200, &serde_json::json!({"status": true}))).await;

    client.delete_file("/f").await.unwrap();

    let log = mock.take_log().await;
    assert_eq!(log.len(), 3);
    let del = &log[1];
    assert_eq!(del.method(), http::Method::DELETE);
    let body: MutationBody = serde_json::from_slice(del.body()).unwrap();
    assert!(body.headers.is_empty());
    assert_eq!(body.tombstones.len(), 1, "one per device");
    assert!(body.tombstones[0].starts_with("delete-"));

    // the pushed root tombstones the name but keeps the entry
    let body: MutationBody = serde_json::from_slice(log[2].body()).unwrap();
    let page: DeviceRoot =
        serde_json::from_slice(&BASE64.decode(&body.payloads[0]).unwrap()).unwrap();
    assert!(page.files.contains_key("f"));
    assert!(page.tombstones.contains_key("f"));
    assert!(page.file_entry("f").is_none());

    // a read now maps the gateway's 404 to NotFound
    mock.push(not_found()).await;
    let err = client.get_file("/f").await.unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::NotFound);
}

#[tokio::test]
async fn delete_of_tombstoned_name_still_reaches_the_gateway() {
    let mock = MockClient::default();
    let client = client(&mock);
    seed_cache(&client).await;

    // the name was deleted once already: a newer tombstone shadows the
    // entry, but the entry itself stays recorded in `files`
    let root = root_with(&[("f", "abcd")]);
    let stamp = vellum_root::now_ms() + 10;
    let root = device_root_remove(&root, "f", format!("delete-{stamp}:phone%3Aid"));
    assert!(root.file_entry("f").is_none());
    assert!(root.files.contains_key("f"));

    mock.push(json_response(
        200,
        &serde_json::json!({"device_root": serde_json::to_value(&root).unwrap()}),
    ))
    .await;
    mock.push(json_response(200, &serde_json::json!({"status": true}))).await;
    mock.push(json_response(200, &serde_json::json!({"status": true}))).await;

    // a second delete is not a local ENOENT: the tombstone goes to the
    // gateway again, which treats the repeat idempotently
    client.delete_file("/f").await.unwrap();

    let log = mock.take_log().await;
    assert_eq!(log.len(), 3);
    assert_eq!(log[1].method(), http::Method::DELETE);
}

#[tokio::test]
async fn delete_of_missing_file_is_local_enoent() {
    let mock = MockClient::default();
    let client = client(&mock);
    seed_cache(&client).await;

    mock.push(json_response(
        200,
        &serde_json::json!({"device_root": serde_json::to_value(root_with(&[])).unwrap()}),
    ))
    .await;

    let err = client.delete_file("/missing").await.unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::NotFound);
    // only the root fetch went out; no gateway mutation for a local miss
    assert_eq!(mock.take_log().await.len(), 1);
}

#[tokio::test]
async fn listing_reflects_both_puts() {
    let mock = MockClient::default();
    let client = client(&mock);
    seed_cache(&client).await;

    // put "/a": root fetch (empty) → file post → root post
    mock.push(json_response(
        200,
        &serde_json::json!({"device_root": serde_json::to_value(root_with(&[])).unwrap()}),
    ))
    .await;
    mock.push(json_response(200, &serde_json::json!({"status": true, "urls": ["u/a"]}))).await;
    mock.push(json_response(200, &serde_json::json!({"status": true}))).await;
    client.put_file("/a", b"1").await.unwrap();
    let first_log = mock.take_log().await;
    let body: MutationBody = serde_json::from_slice(first_log[2].body()).unwrap();
    let after_a: DeviceRoot =
        serde_json::from_slice(&BASE64.decode(&body.payloads[0]).unwrap()).unwrap();

    // put "/b": the gateway serves the root installed by the first put
    mock.push(json_response(
        200,
        &serde_json::json!({"device_root": serde_json::to_value(&after_a).unwrap()}),
    ))
    .await;
    mock.push(json_response(200, &serde_json::json!({"status": true, "urls": ["u/b"]}))).await;
    mock.push(json_response(200, &serde_json::json!({"status": true}))).await;
    client.put_file("/b", b"2").await.unwrap();
    let second_log = mock.take_log().await;
    let body: MutationBody = serde_json::from_slice(second_log[2].body()).unwrap();
    let after_b: DeviceRoot =
        serde_json::from_slice(&BASE64.decode(&body.payloads[0]).unwrap()).unwrap();

    // both names live in the final page, and timestamps kept climbing
    let names: Vec<&str> = after_b.live_files().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert!(after_b.timestamp > after_a.timestamp);

    // listFiles returns what the gateway aggregates
    mock.push(json_response(200, &serde_json::to_value(&after_b).unwrap())).await;
    let listing = client.list_files().await.unwrap();
    let names: Vec<&str> = listing.live_files().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[tokio::test]
async fn get_file_urls_reads_the_header() {
    let mock = MockClient::default();
    let client = client(&mock);
    seed_cache(&client).await;

    mock.push(json_response(
        200,
        &serde_json::to_value(FileEntry::new(vec!["http://replica/f".into()], "abcd")).unwrap(),
    ))
    .await;

    let urls = client.get_file_urls("/f").await.unwrap();
    assert_eq!(urls, vec!["http://replica/f"]);
    let log = mock.take_log().await;
    let uri = log[0].uri().to_string();
    assert!(uri.contains("/headers?"));
    assert!(uri.contains("path=f"));
    assert!(uri.contains("this_device_id=phone"));
}

#[tokio::test]
async fn expected_root_missing_propagates() {
    let mock = MockClient::default();
    let client = client(&mock);
    seed_cache(&client).await;

    // the seeded context is the creator (its key matches the
    // descriptor), so a missing root page is an error, not a synthesis
    mock.push(not_found()).await;
    let ctx = seeded_context();
    let err = client.find_device_root_info(&ctx).await.unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::NotFound);
}
