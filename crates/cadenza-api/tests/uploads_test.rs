//! Signed upload URL and direct write integration tests.
//!
//! Run with: `cargo test -p cadenza-api --test uploads_test`

mod helpers;

use axum::http::StatusCode;
use bytes::Bytes;
use cadenza_core::models::SignedUploadResponse;
use cadenza_core::Bucket;
use cadenza_services::test_helpers::MockStorage;
use helpers::{api_path, now_secs, setup_test_app, TestAppBuilder, JPEG, MAX_IMAGE_BYTES, PNG};
use serde_json::{json, Value};

#[tokio::test]
async fn signed_url_points_at_a_fresh_path_in_the_bucket() {
    let app = setup_test_app();

    let response = app
        .client()
        .post(&api_path("/uploads/signed-url"))
        .json(&json!({
            "bucket": "audio-submissions",
            "fileName": "My Song.mp3",
            "contentType": "audio/mpeg",
            "fileSize": 4096,
            "uploadedBy": "u1"
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: SignedUploadResponse = response.json();
    assert_eq!(body.bucket, Bucket::AudioSubmissions);
    assert!(body.path.starts_with("u1/My_Song-"));
    assert!(body.path.ends_with(".mp3"));
    assert_eq!(
        body.public_url,
        format!("{}/audio-submissions/{}", MockStorage::PUBLIC_BASE, body.path)
    );
    assert!(body.signed_url.starts_with(MockStorage::UPLOAD_BASE));
    assert!(body.expires_at > chrono::Utc::now());
}

#[tokio::test]
async fn two_requests_for_the_same_name_get_different_paths() {
    let app = setup_test_app();
    let request = json!({
        "bucket": "submission-images",
        "fileName": "cover.png",
        "contentType": "image/png",
        "fileSize": 100
    });

    let first: SignedUploadResponse = app
        .client()
        .post(&api_path("/uploads/signed-url"))
        .json(&request)
        .await
        .json();
    let second: SignedUploadResponse = app
        .client()
        .post(&api_path("/uploads/signed-url"))
        .json(&request)
        .await
        .json();

    assert_ne!(first.path, second.path);
}

#[tokio::test]
async fn audio_type_is_rejected_for_the_image_bucket() {
    let app = setup_test_app();

    let response = app
        .client()
        .post(&api_path("/uploads/signed-url"))
        .json(&json!({
            "bucket": "submission-images",
            "fileName": "song.mp3",
            "contentType": "audio/mpeg",
            "fileSize": 100
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let body: Value = response.json();
    assert_eq!(body["code"], "UNSUPPORTED_MEDIA_TYPE");
    assert!(body["error"].as_str().unwrap().contains("image/png"));
}

#[tokio::test]
async fn declared_size_over_the_bucket_limit_is_rejected() {
    let app = setup_test_app();

    let response = app
        .client()
        .post(&api_path("/uploads/signed-url"))
        .json(&json!({
            "bucket": "submission-images",
            "fileName": "huge.png",
            "contentType": "image/png",
            "fileSize": MAX_IMAGE_BYTES + 1
        }))
        .await;

    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn invalid_requests_use_the_error_shape() {
    let app = setup_test_app();

    let empty_name = app
        .client()
        .post(&api_path("/uploads/signed-url"))
        .json(&json!({
            "bucket": "audio-submissions",
            "fileName": "",
            "contentType": "audio/mpeg",
            "fileSize": 10
        }))
        .await;
    assert_eq!(empty_name.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(empty_name.json::<Value>()["code"], "INVALID_INPUT");

    let unknown_bucket = app
        .client()
        .post(&api_path("/uploads/signed-url"))
        .json(&json!({
            "bucket": "videos",
            "fileName": "clip.mp4",
            "contentType": "video/mp4",
            "fileSize": 10
        }))
        .await;
    assert_eq!(unknown_bucket.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(unknown_bucket.json::<Value>()["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn signed_write_stores_the_object() {
    let app = setup_test_app();
    let key = "submission-images/u1/cover-1.png";
    let expires = now_secs() + 60;
    let signature = app.signer.sign(key, expires).unwrap();

    let response = app
        .client()
        .put(&api_path(&format!("/storage/{}", key)))
        .add_query_param("expires", expires)
        .add_query_param("signature", &signature)
        .bytes(Bytes::from_static(PNG))
        .content_type("image/png")
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(app.storage.get_file(key).unwrap(), Bytes::from_static(PNG));
    assert_eq!(app.storage.content_type(key).as_deref(), Some("image/png"));
}

#[tokio::test]
async fn expired_or_tampered_signatures_are_forbidden() {
    let app = setup_test_app();
    let key = "submission-images/u1/cover-1.png";

    let expired = now_secs() - 10;
    let expired_sig = app.signer.sign(key, expired).unwrap();
    let response = app
        .client()
        .put(&api_path(&format!("/storage/{}", key)))
        .add_query_param("expires", expired)
        .add_query_param("signature", &expired_sig)
        .bytes(Bytes::from_static(PNG))
        .content_type("image/png")
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    let expires = now_secs() + 60;
    let other_sig = app
        .signer
        .sign("submission-images/u1/other.png", expires)
        .unwrap();
    let response = app
        .client()
        .put(&api_path(&format!("/storage/{}", key)))
        .add_query_param("expires", expires)
        .add_query_param("signature", &other_sig)
        .bytes(Bytes::from_static(PNG))
        .content_type("image/png")
        .await;
    assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

    assert!(!app.storage.has_file(key));
}

#[tokio::test]
async fn content_must_match_the_declared_type() {
    let app = setup_test_app();
    let key = "submission-images/u1/cover-1.png";
    let expires = now_secs() + 60;
    let signature = app.signer.sign(key, expires).unwrap();

    let response = app
        .client()
        .put(&api_path(&format!("/storage/{}", key)))
        .add_query_param("expires", expires)
        .add_query_param("signature", &signature)
        .bytes(Bytes::from_static(JPEG))
        .content_type("image/png")
        .await;

    assert_eq!(response.status_code(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(!app.storage.has_file(key));
}

#[tokio::test]
async fn image_bucket_size_limit_applies_to_written_bytes() {
    let app = setup_test_app();
    let key = "submission-images/u1/big.png";
    let expires = now_secs() + 60;
    let signature = app.signer.sign(key, expires).unwrap();
    let mut data = PNG.to_vec();
    data.resize(MAX_IMAGE_BYTES as usize + 1, 0);

    let response = app
        .client()
        .put(&api_path(&format!("/storage/{}", key)))
        .add_query_param("expires", expires)
        .add_query_param("signature", &signature)
        .bytes(Bytes::from(data))
        .content_type("image/png")
        .await;

    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn backends_without_direct_writes_do_not_expose_the_route() {
    let app = TestAppBuilder::new().without_direct_writes().build();
    let key = "submission-images/u1/cover-1.png";
    let expires = now_secs() + 60;
    let signature = app.signer.sign(key, expires).unwrap();

    let response = app
        .client()
        .put(&api_path(&format!("/storage/{}", key)))
        .add_query_param("expires", expires)
        .add_query_param("signature", &signature)
        .bytes(Bytes::from_static(PNG))
        .content_type("image/png")
        .await;

    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
