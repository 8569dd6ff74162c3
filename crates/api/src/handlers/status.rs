use axum::extract::{Path, State};
use axum::Json;
use posegen_core::job::{JobRecord, JobStatus};
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;

/// Client-facing view of a job record.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: JobStatus,
    pub outputs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<JobRecord> for StatusResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            status: record.status,
            outputs: record.outputs,
            error: record.error,
        }
    }
}

/// GET /status/{id}
///
/// A job still `starting` or `processing` is a normal answer; only an
/// unknown id is a 404.
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<StatusResponse>> {
    let record = state.store.get(&id).await?;
    Ok(Json(record.into()))
}
