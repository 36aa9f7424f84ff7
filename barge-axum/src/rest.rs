use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    routing::{get, post, put},
    Json, Router,
};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use barge_transfer::{
    RangeStreamer, SessionId, TransferError, UploadSession, UploadSessionManager,
};

use crate::error::ApiError;

/// Shared state behind the transfer routes
#[derive(Clone)]
pub struct TransferState {
    pub manager: Arc<UploadSessionManager>,
    pub streamer: Arc<RangeStreamer>,
}

#[derive(Debug, Deserialize)]
struct InitiateParams {
    file_name: String,
    total_size: u64,
}

#[derive(Debug, Serialize)]
struct InitiateResponse {
    session_id: String,
    part_count: u32,
    chunk_size: u64,
}

#[derive(Debug, Serialize)]
struct PartResponse {
    part_number: u32,
    checksum: String,
    byte_length: u64,
}

#[derive(Debug, Serialize)]
struct FinishResponse {
    object_id: String,
}

/// Build the transfer router.
///
/// Request-id and trace layers wrap every route, the same way services in
/// front of this surface expect to correlate logs.
pub fn router(state: TransferState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/uploads", post(initiate_upload))
        .route(
            "/uploads/{session_id}",
            get(upload_session).delete(abort_upload),
        )
        .route("/uploads/{session_id}/parts/{part_number}", put(submit_part))
        .route("/uploads/{session_id}/finish", post(finish_upload))
        .route("/objects/{object_name}", get(read_object_range))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

async fn initiate_upload(
    State(state): State<TransferState>,
    Query(params): Query<InitiateParams>,
) -> Result<Json<InitiateResponse>, ApiError> {
    let session_id = state
        .manager
        .initiate(&params.file_name, params.total_size)
        .await?;
    let session = state.manager.session(&session_id).await?;

    info!(
        session_id = %session_id,
        file_name = %params.file_name,
        part_count = session.plan.part_count,
        "upload initiated over http"
    );
    Ok(Json(InitiateResponse {
        session_id: session_id.to_string(),
        part_count: session.plan.part_count,
        chunk_size: session.plan.chunk_size,
    }))
}

async fn submit_part(
    State(state): State<TransferState>,
    Path((session_id, part_number)): Path<(String, u32)>,
    body: Body,
) -> Result<Json<PartResponse>, ApiError> {
    let stream = body
        .into_data_stream()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err));

    let result = state
        .manager
        .submit_part(
            &SessionId::from_string(session_id),
            part_number,
            Box::pin(stream),
        )
        .await?;

    Ok(Json(PartResponse {
        part_number: result.part_number,
        checksum: result.checksum,
        byte_length: result.byte_length,
    }))
}

async fn finish_upload(
    State(state): State<TransferState>,
    Path(session_id): Path<String>,
) -> Result<Json<FinishResponse>, ApiError> {
    let object_id = state
        .manager
        .finish(&SessionId::from_string(session_id))
        .await?;

    Ok(Json(FinishResponse {
        object_id: object_id.to_string(),
    }))
}

async fn abort_upload(
    State(state): State<TransferState>,
    Path(session_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .manager
        .abort(&SessionId::from_string(session_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_session(
    State(state): State<TransferState>,
    Path(session_id): Path<String>,
) -> Result<Json<UploadSession>, ApiError> {
    let session = state
        .manager
        .session(&SessionId::from_string(session_id))
        .await?;
    Ok(Json(session))
}

async fn read_object_range(
    State(state): State<TransferState>,
    Path(object_name): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let range_header = match headers.get(header::RANGE) {
        Some(value) => Some(value.to_str().map_err(|_| {
            TransferError::MalformedRangeHeader {
                header: "<non-ascii range header>".to_string(),
            }
        })?),
        None => None,
    };

    let opened = state.streamer.open(&object_name, range_header).await?;

    // Partial-content framing; 206 is returned even when the window covers
    // the whole object.
    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_RANGE, opened.range.content_range())
        .header(header::CONTENT_LENGTH, opened.range.content_length())
        .body(Body::from_stream(opened.stream))
        .map_err(|err| {
            ApiError(TransferError::Io {
                source: std::io::Error::new(std::io::ErrorKind::Other, err),
            })
        })
}
