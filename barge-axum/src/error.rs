use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use barge_transfer::TransferError;
use serde_json::json;

/// HTTP wrapper around [`TransferError`].
///
/// Every error renders as JSON with a stable machine-readable `error` kind
/// plus a human message, so clients can branch without string matching.
#[derive(Debug)]
pub struct ApiError(pub TransferError);

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            TransferError::InvalidInput { .. }
            | TransferError::InvalidPartNumber { .. }
            | TransferError::MissingRangeHeader
            | TransferError::MalformedRangeHeader { .. } => StatusCode::BAD_REQUEST,

            TransferError::SessionNotFound { .. } | TransferError::NotFound { .. } => {
                StatusCode::NOT_FOUND
            }

            TransferError::InvalidState { .. }
            | TransferError::IncompletePartSet { .. }
            | TransferError::FinalizeRejected { .. } => StatusCode::CONFLICT,

            TransferError::RangeNotSatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,

            TransferError::BackendUnavailable { .. }
            | TransferError::PartUploadFailed { .. }
            | TransferError::StreamInterrupted { .. }
            | TransferError::Backend { .. }
            | TransferError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self.0, kind = self.0.kind(), "request failed");
        }
        let body = json!({
            "error": self.0.kind(),
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
