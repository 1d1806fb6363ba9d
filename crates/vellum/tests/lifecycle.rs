mod common;

use common::*;
use vellum::MountOptions;
use vellum::client::StoreErrorKind;
use vellum_api::store::PutDatastoreBody;
use vellum_root::envelope::DataEnvelope;
use vellum_root::policy::ReplicationStrategy;

fn local_public() -> ReplicationStrategy {
    ReplicationStrategy {
        local: 1,
        public: 1,
        ..Default::default()
    }
}

#[tokio::test]
async fn mount_of_missing_datastore_resolves_to_none() {
    let mock = MockClient::default();
    let client = client(&mock);

    mock.push(not_found()).await;
    let ctx = client.datastore_mount(MountOptions::default()).await.unwrap();
    assert!(ctx.is_none());

    let log = mock.take_log().await;
    assert_eq!(log.len(), 1);
    let uri = log[0].uri().to_string();
    assert!(uri.contains(&format!("/v1/stores/{ADDR_ONE}")));
    assert!(uri.contains("device_ids=phone"));
    assert!(uri.contains(&format!("device_pubkeys={PUB_ONE}")));
}

#[tokio::test]
async fn mount_or_create_creates_when_absent() {
    let mock = MockClient::default();
    let client = client(&mock).with_strategy(local_public());

    mock.push(not_found()).await; // initial mount
    mock.push(json_response(
        200,
        &serde_json::json!({
            "status": true,
            "datastore_urls": ["http://replica/ds"],
            "root_urls": ["http://replica/root"]
        }),
    ))
    .await; // create
    mock.push(mount_response()).await; // re-mount

    let ctx = client
        .datastore_mount_or_create(&local_public(), None)
        .await
        .unwrap();
    assert!(ctx.created);
    assert_eq!(ctx.datastore_id, datastore_id());
    assert_eq!(
        ctx.urls.as_ref().unwrap().datastore_urls,
        vec!["http://replica/ds"]
    );
    assert!(ctx.private_key.is_some(), "creator mounts as writer");

    let log = mock.take_log().await;
    assert_eq!(log.len(), 3);
    assert_eq!(log[1].method(), http::Method::POST);
    assert!(log[1].uri().to_string().ends_with("/v1/stores"));

    // the create bundle carries the signed descriptor and root blobs
    let body: PutDatastoreBody = serde_json::from_slice(log[1].body()).unwrap();
    let ds_env: DataEnvelope = serde_json::from_str(&body.datastore_info).unwrap();
    let descriptor: serde_json::Value = serde_json::from_str(&ds_env.data).unwrap();
    assert_eq!(descriptor["pubkey"], PUB_ONE);
    // replication selection over the advertised classes picked both
    assert_eq!(descriptor["drivers"], serde_json::json!(["disk", "s3"]));
    assert_eq!(ds_env.version, 1);
    assert_eq!(body.root_tombstones.len(), 1);
    assert!(!body.datastore_sig.is_empty());
    assert!(!body.root_sig.is_empty());

    // session bearer auth on every request
    for req in &log {
        let auth = req.headers().get(http::header::AUTHORIZATION).unwrap();
        assert!(auth.to_str().unwrap().starts_with("bearer "));
    }
}

#[tokio::test]
async fn mount_or_create_is_idempotent() {
    let mock = MockClient::default();
    let client = client(&mock).with_strategy(local_public());

    mock.push(not_found()).await;
    mock.push(json_response(200, &serde_json::json!({"status": true}))).await;
    mock.push(mount_response()).await;

    let first = client
        .datastore_mount_or_create(&local_public(), None)
        .await
        .unwrap();
    assert!(first.created);
    mock.take_log().await;

    // second call resolves from the cache: same datastore, no created
    // flag, no network traffic
    let second = client
        .datastore_mount_or_create(&local_public(), None)
        .await
        .unwrap();
    assert_eq!(second.datastore_id, first.datastore_id);
    assert!(!second.created);
    assert!(mock.take_log().await.is_empty());
}

#[tokio::test]
async fn explicit_drivers_override_selection() {
    let mock = MockClient::default();
    let client = client(&mock);

    mock.push(not_found()).await;
    mock.push(json_response(200, &serde_json::json!({"status": true}))).await;
    mock.push(mount_response()).await;

    client
        .datastore_mount_or_create(&local_public(), Some(vec!["s3".into()]))
        .await
        .unwrap();

    let log = mock.take_log().await;
    let body: PutDatastoreBody = serde_json::from_slice(log[1].body()).unwrap();
    let ds_env: DataEnvelope = serde_json::from_str(&body.datastore_info).unwrap();
    let descriptor: serde_json::Value = serde_json::from_str(&ds_env.data).unwrap();
    assert_eq!(descriptor["drivers"], serde_json::json!(["s3"]));
}

#[tokio::test]
async fn node_preferences_beat_selection() {
    let mock = MockClient::default();
    let storage = serde_json::json!({
        "classes": {"read_local": ["disk"], "write_local": ["disk"]},
        "preferences": {"files.app.co": ["dropbox", "s3"]}
    });
    let client = client_with_token(&mock, &session_token(Some(storage)));

    mock.push(not_found()).await;
    mock.push(json_response(200, &serde_json::json!({"status": true}))).await;
    mock.push(mount_response()).await;

    client
        .datastore_mount_or_create(&local_public(), None)
        .await
        .unwrap();

    let log = mock.take_log().await;
    let body: PutDatastoreBody = serde_json::from_slice(log[1].body()).unwrap();
    let ds_env: DataEnvelope = serde_json::from_str(&body.datastore_info).unwrap();
    let descriptor: serde_json::Value = serde_json::from_str(&ds_env.data).unwrap();
    assert_eq!(descriptor["drivers"], serde_json::json!(["dropbox", "s3"]));
}

#[tokio::test]
async fn unsatisfiable_strategy_fails_before_any_create() {
    let mock = MockClient::default();
    let storage = serde_json::json!({
        "classes": {"read_local": ["disk"]},
        "preferences": {}
    });
    let client = client_with_token(&mock, &session_token(Some(storage)));

    mock.push(not_found()).await;
    let strategy = ReplicationStrategy {
        private: 1,
        ..Default::default()
    };
    let err = client
        .datastore_mount_or_create(&strategy, None)
        .await
        .unwrap_err();
    assert_eq!(
        err.kind(),
        StoreErrorKind::UnsatisfiableReplicationStrategy
    );
    // only the mount probe went out
    assert_eq!(mock.take_log().await.len(), 1);
}

#[tokio::test]
async fn partial_create_flag_forces_retry_and_clears() {
    let mock = MockClient::default();
    let client = client(&mock).with_strategy(local_public());

    client.datastore_create_set_retry().await.unwrap();

    // flag set: mount short-circuits to absent without a request, so the
    // first wire operation is the create itself
    mock.push(json_response(200, &serde_json::json!({"status": true}))).await;
    mock.push(mount_response()).await;

    let ctx = client
        .datastore_mount_or_create(&local_public(), None)
        .await
        .unwrap();
    assert!(ctx.created);
    assert!(
        !client
            .cache()
            .partial_create_failure(ADDR_ONE, &app_name())
            .await
            .unwrap(),
        "successful create clears the flag"
    );

    let log = mock.take_log().await;
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].method(), http::Method::POST);
    assert!(log[0].uri().to_string().ends_with("/v1/stores"));
}

#[tokio::test]
async fn failed_create_sets_the_flag() {
    let mock = MockClient::default();
    let client = client(&mock).with_strategy(local_public());

    mock.push(not_found()).await; // mount probe
    mock.push(raw_response(500, b"boom")).await; // create blows up

    let err = client
        .datastore_mount_or_create(&local_public(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), StoreErrorKind::RemoteIo);
    assert!(
        client
            .cache()
            .partial_create_failure(ADDR_ONE, &app_name())
            .await
            .unwrap(),
        "ambiguous create is recorded"
    );

    // and the flag silences the next mount
    let ctx = client.datastore_mount(MountOptions::default()).await.unwrap();
    assert!(ctx.is_none());
    assert_eq!(mock.take_log().await.len(), 2, "no request after the flag");
}

#[tokio::test]
async fn delete_submits_tombstones_per_device() {
    let mock = MockClient::default();
    let client = client(&mock);

    mock.push(mount_response()).await;
    let ctx = client
        .datastore_mount(MountOptions::default())
        .await
        .unwrap()
        .unwrap();

    mock.push(json_response(200, &serde_json::json!({"status": true}))).await;
    client.datastore_delete(&ctx).await.unwrap();

    let log = mock.take_log().await;
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].method(), http::Method::DELETE);
    let body: serde_json::Value = serde_json::from_slice(log[1].body()).unwrap();
    assert_eq!(body["datastore_tombstones"].as_array().unwrap().len(), 1);
    assert_eq!(body["root_tombstones"].as_array().unwrap().len(), 1);
    let stone = body["root_tombstones"][0].as_str().unwrap();
    assert!(stone.starts_with("delete-"));

    // the cached context is gone: next resolution hits the wire
    mock.push(not_found()).await;
    assert!(
        client
            .datastore_mount(MountOptions::default())
            .await
            .unwrap()
            .is_none()
    );
}
