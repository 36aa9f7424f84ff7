use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use barge_axum::{router, TransferState};
use barge_transfer::{
    MemoryRemoteStore, RangeStreamer, RetryPolicy, TransferConfig, UploadSessionManager,
};

/// Test factory functions
fn test_app() -> (axum::Router, MemoryRemoteStore) {
    let store = MemoryRemoteStore::new();
    let config = TransferConfig::new()
        .with_chunk_size(10)
        .with_range_window(100)
        .with_retry(
            RetryPolicy::new()
                .with_max_attempts(2)
                .with_base_delay(Duration::from_millis(1))
                .without_jitter(),
        );

    let state = TransferState {
        manager: Arc::new(UploadSessionManager::new(store.clone(), config.clone())),
        streamer: Arc::new(RangeStreamer::new(store.clone(), config)),
    };
    (router(state), store)
}

async fn json_body(res: axum::response::Response) -> Value {
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn initiate(app: &axum::Router, file_name: &str, total_size: u64) -> String {
    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!(
                    "/uploads?file_name={file_name}&total_size={total_size}"
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    body["session_id"].as_str().unwrap().to_string()
}

async fn put_part(
    app: &axum::Router,
    session_id: &str,
    part_number: u32,
    data: Vec<u8>,
) -> axum::response::Response {
    app.clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/uploads/{session_id}/parts/{part_number}"))
                .body(Body::from(data))
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn upload_flow_round_trips_over_http() {
    let (app, store) = test_app();

    let session_id = initiate(&app, "clip.bin", 25).await;

    for (part_number, value, len) in [(1u32, 1u8, 10usize), (2, 2, 10), (3, 3, 5)] {
        let res = put_part(&app, &session_id, part_number, vec![value; len]).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = json_body(res).await;
        assert_eq!(body["part_number"], part_number);
        assert_eq!(body["byte_length"], len as u64);
        assert!(!body["checksum"].as_str().unwrap().is_empty());
    }

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/uploads/{session_id}/finish"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert!(!body["object_id"].as_str().unwrap().is_empty());

    assert_eq!(store.object_bytes("clip.bin").unwrap().len(), 25);
}

#[tokio::test]
async fn initiate_reports_the_plan() {
    let (app, _store) = test_app();

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/uploads?file_name=clip.bin&total_size=25")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().get("x-request-id").is_some());
    let body = json_body(res).await;
    assert_eq!(body["part_count"], 3);
    assert_eq!(body["chunk_size"], 10);
}

#[tokio::test]
async fn invalid_part_number_maps_to_bad_request() {
    let (app, _store) = test_app();
    let session_id = initiate(&app, "clip.bin", 25).await;

    let res = put_part(&app, &session_id, 9, vec![0u8; 10]).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json_body(res).await;
    assert_eq!(body["error"], "invalid_part_number");
}

#[tokio::test]
async fn finish_with_missing_parts_maps_to_conflict() {
    let (app, store) = test_app();
    let session_id = initiate(&app, "clip.bin", 25).await;

    let res = put_part(&app, &session_id, 1, vec![1u8; 10]).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/uploads/{session_id}/finish"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body = json_body(res).await;
    assert_eq!(body["error"], "incomplete_part_set");
    assert_eq!(store.finish_calls(), 0);
}

#[tokio::test]
async fn unknown_session_maps_to_not_found() {
    let (app, _store) = test_app();

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/uploads/ses_missing")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = json_body(res).await;
    assert_eq!(body["error"], "session_not_found");
}

#[tokio::test]
async fn abort_returns_no_content_and_is_idempotent() {
    let (app, _store) = test_app();
    let session_id = initiate(&app, "clip.bin", 25).await;

    for _ in 0..2 {
        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/uploads/{session_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
    }
}

#[tokio::test]
async fn range_read_frames_partial_content() {
    let (app, store) = test_app();
    let data: Vec<u8> = (0..200u8).collect();
    store.insert_object("media.bin", data.clone());

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/objects/media.bin")
                .header(header::RANGE, "bytes=10-19")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        res.headers().get(header::CONTENT_RANGE).unwrap(),
        "bytes 10-19/200"
    );
    assert_eq!(res.headers().get(header::CONTENT_LENGTH).unwrap(), "10");
    assert_eq!(res.headers().get(header::ACCEPT_RANGES).unwrap(), "bytes");

    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], &data[10..20]);
}

#[tokio::test]
async fn open_ended_range_is_bounded_by_the_window() {
    let (app, store) = test_app();
    store.insert_object("media.bin", vec![7u8; 1000]);

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/objects/media.bin")
                .header(header::RANGE, "bytes=500-")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(
        res.headers().get(header::CONTENT_RANGE).unwrap(),
        "bytes 500-599/1000"
    );
}

#[tokio::test]
async fn missing_range_header_is_a_bad_request() {
    let (app, store) = test_app();
    store.insert_object("media.bin", vec![7u8; 100]);

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/objects/media.bin")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json_body(res).await;
    assert_eq!(body["error"], "missing_range_header");
}

#[tokio::test]
async fn unsatisfiable_range_maps_to_416() {
    let (app, store) = test_app();
    store.insert_object("media.bin", vec![7u8; 1000]);

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/objects/media.bin")
                .header(header::RANGE, "bytes=1000-1005")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::RANGE_NOT_SATISFIABLE);
    let body = json_body(res).await;
    assert_eq!(body["error"], "range_not_satisfiable");
}

#[tokio::test]
async fn health_endpoint_answers() {
    let (app, _store) = test_app();

    let res = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = res.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"ok");
}
