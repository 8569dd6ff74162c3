use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use posegen_core::error::CoreError;
use posegen_replicate::ReplicateApiError;
use posegen_store::StoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `posegen_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The job table could not be persisted.
    #[error("Job store error: {0}")]
    Store(#[from] StoreError),

    /// The generation service rejected the request, failed or timed out.
    #[error("Remote service error: {0}")]
    RemoteService(#[from] ReplicateApiError),

    /// The multipart body could not be read. Carries its own status, so an
    /// oversized upload is a 413.
    #[error("Upload error: {0}")]
    Upload(#[from] MultipartError),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::MissingInput(msg) => {
                    (StatusCode::BAD_REQUEST, "MISSING_INPUT", msg.clone())
                }
                // The id is client-supplied; it is not echoed back.
                CoreError::NotFound { entity, .. } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} ID not found"),
                ),
            },

            AppError::Store(err) => {
                tracing::error!(error = %err, "Job store error");
                internal()
            }

            // The saved upload could not be read back; nothing remote failed.
            AppError::RemoteService(ReplicateApiError::Image(err)) => {
                tracing::error!(error = %err, "Failed to read saved upload");
                internal()
            }

            AppError::RemoteService(err) => {
                tracing::error!(error = %err, "Generation service call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "REMOTE_SERVICE_ERROR",
                    "The generation service request failed".to_string(),
                )
            }

            // --- HTTP-specific errors ---
            AppError::Upload(err) => {
                let status = err.status();
                let code = if status == StatusCode::PAYLOAD_TOO_LARGE {
                    "PAYLOAD_TOO_LARGE"
                } else {
                    "BAD_REQUEST"
                };
                (status, code, err.body_text())
            }
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
