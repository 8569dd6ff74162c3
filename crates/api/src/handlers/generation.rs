//! Handlers for the generation endpoints.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::error::AppResult;
use crate::state::AppState;
use crate::submitter;
use crate::upload::read_generation_form;

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub prediction_id: String,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub outputs: Vec<String>,
}

/// POST /generate
///
/// Save the uploaded image and start an asynchronous prediction. The
/// result arrives later through the webhook; poll `/status/{id}` for it.
pub async fn generate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<SubmitResponse>)> {
    let form = read_generation_form(multipart, &state.config.input_dir).await?;
    let prediction_id = submitter::submit_job(&state, &form.image_path, &form.prompt).await?;

    Ok((StatusCode::ACCEPTED, Json(SubmitResponse { prediction_id })))
}

/// POST /generate/sync
///
/// Save the uploaded image, run the model to completion and return the
/// saved outputs.
pub async fn generate_sync(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<SyncResponse>> {
    let form = read_generation_form(multipart, &state.config.input_dir).await?;
    let outputs = submitter::run_sync(&state, &form.image_path, &form.prompt).await?;

    tracing::info!(count = outputs.len(), "Synchronous generation finished");
    Ok(Json(SyncResponse { outputs }))
}
