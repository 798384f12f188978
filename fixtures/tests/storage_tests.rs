use chrono::{Duration, Utc};
use fitcheck::storage::UploadSigner;
use fixtures::{spawn_server, storage_router, StorageState};
use std::net::SocketAddr;

const SECRET: &[u8] = b"fixture-signing-key";

async fn start_storage() -> (SocketAddr, StorageState, UploadSigner) {
    let state = StorageState::new(UploadSigner::new(SECRET, "", "http://unused"));
    let addr = spawn_server(storage_router(state.clone()))
        .await
        .expect("storage fixture starts");

    let base = format!("http://{addr}");
    let signer = UploadSigner::new(SECRET, &base, &format!("{base}/objects"));
    (addr, state, signer)
}

#[tokio::test]
async fn signed_upload_is_stored_and_served() {
    let (_, state, signer) = start_storage().await;
    let target = signer.presign("avatars/ada/1", Utc::now()).unwrap();

    let client = reqwest::Client::new();
    let put = client
        .put(&target.url)
        .header("content-type", "image/png")
        .body(vec![1u8, 2, 3])
        .send()
        .await
        .unwrap();
    assert_eq!(put.status(), reqwest::StatusCode::CREATED);
    assert_eq!(state.object_count(), 1);

    let get = client.get(&target.public_url).send().await.unwrap();
    assert_eq!(get.status(), reqwest::StatusCode::OK);
    assert_eq!(get.headers()["content-type"], "image/png");
    assert_eq!(get.bytes().await.unwrap().as_ref(), &[1u8, 2, 3]);
}

#[tokio::test]
async fn tampered_signature_is_rejected() {
    let (_, state, signer) = start_storage().await;
    let target = signer.presign("avatars/ada/1", Utc::now()).unwrap();

    // Same signature, different object key
    let tampered = target.url.replace("avatars/ada/1", "avatars/bea/1");
    let response = reqwest::Client::new()
        .put(&tampered)
        .body("x")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    assert_eq!(state.object_count(), 0);
}

#[tokio::test]
async fn expired_target_is_rejected() {
    let (_, state, signer) = start_storage().await;
    let target = signer
        .presign("avatars/ada/1", Utc::now() - Duration::hours(1))
        .unwrap();

    let response = reqwest::Client::new()
        .put(&target.url)
        .body("x")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    assert!(response.text().await.unwrap().contains("expired"));
    assert_eq!(state.object_count(), 0);
}

#[tokio::test]
async fn unsigned_upload_and_missing_object() {
    let (addr, _, _) = start_storage().await;
    let client = reqwest::Client::new();

    let unsigned = client
        .put(format!("http://{addr}/uploads/avatars/ada/1"))
        .body("x")
        .send()
        .await
        .unwrap();
    assert_eq!(unsigned.status(), reqwest::StatusCode::BAD_REQUEST);

    let missing = client
        .get(format!("http://{addr}/objects/nothing/here"))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn only_images_are_accepted() {
    let (_, state, signer) = start_storage().await;
    let target = signer.presign("avatars/ada/1", Utc::now()).unwrap();

    let response = reqwest::Client::new()
        .put(&target.url)
        .header("content-type", "text/html")
        .body("<script></script>")
        .send()
        .await
        .unwrap();

    assert_eq!(
        response.status(),
        reqwest::StatusCode::UNSUPPORTED_MEDIA_TYPE
    );
    assert_eq!(state.object_count(), 0);
}

#[tokio::test]
async fn uploads_over_the_size_limit_are_rejected() {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use fitcheck::client::MAX_UPLOAD_BYTES;
    use tower::ServiceExt;

    let state = StorageState::new(UploadSigner::new(SECRET, "", "http://unused"));
    let signer = UploadSigner::new(SECRET, "", "http://unused");
    let app = storage_router(state.clone());

    let put = |bytes: usize| {
        let target = signer.presign("posts/ada/1", Utc::now()).unwrap();
        Request::builder()
            .method("PUT")
            .uri(target.url)
            .header("content-type", "image/jpeg")
            .body(Body::from(vec![0u8; bytes]))
            .unwrap()
    };

    let too_big = app
        .clone()
        .oneshot(put(MAX_UPLOAD_BYTES + 1))
        .await
        .unwrap();
    assert_eq!(too_big.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(state.object_count(), 0);

    let at_limit = app.oneshot(put(MAX_UPLOAD_BYTES)).await.unwrap();
    assert_eq!(at_limit.status(), StatusCode::CREATED);
    assert_eq!(state.object_count(), 1);
}
