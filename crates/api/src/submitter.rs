//! Job submission and synchronous runs.
//!
//! [`submit_job`] is the asynchronous path: it mints a webhook capability,
//! asks the model service to start a prediction that will call back to it,
//! and records the job as `starting`. The remote call completes before the
//! store is touched, so no store lock is held across the network.
//!
//! The prediction id only exists once the service answers, which means a
//! fast callback can land before the `starting` record. The callback
//! handler creates the record in that case, and [`submit_job`] uses
//! [`JobStore::insert_if_absent`] so it never overwrites it.
//!
//! [`JobStore::insert_if_absent`]: posegen_store::JobStore::insert_if_absent

use std::path::{Path, PathBuf};

use posegen_core::error::CoreError;
use posegen_core::job::JobRecord;
use posegen_core::upload::output_filename;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// URL prefix under which the output directory is served.
pub const OUTPUTS_ROUTE: &str = "/outputs";

async fn require_inputs(image: &Path, prompt: &str) -> AppResult<()> {
    if prompt.trim().is_empty() {
        return Err(CoreError::MissingInput("Missing prompt".into()).into());
    }
    let is_file = match tokio::fs::metadata(image).await {
        Ok(meta) => meta.is_file(),
        Err(_) => false,
    };
    if !is_file {
        return Err(CoreError::MissingInput("Missing image".into()).into());
    }
    Ok(())
}

/// Start an asynchronous prediction and record it. Returns the prediction id.
pub async fn submit_job(state: &AppState, image: &Path, prompt: &str) -> AppResult<String> {
    require_inputs(image, prompt).await?;

    let capability = state.signer.mint();
    let webhook_url = capability.callback_url(&state.config.public_url);

    let prediction = state
        .model
        .create_prediction(image, prompt, &webhook_url)
        .await?;
    let id = prediction.id;

    let record = JobRecord::starting(&id, Some(capability.nonce));
    match state.store.insert_if_absent(&id, record).await {
        Ok(true) => {
            tracing::info!(prediction_id = %id, "Prediction submitted");
        }
        Ok(false) => {
            tracing::info!(
                prediction_id = %id,
                "Callback arrived before submission was recorded, keeping its record",
            );
        }
        Err(e) => {
            tracing::warn!(
                prediction_id = %id,
                error = %e,
                "Prediction recorded in memory only",
            );
        }
    }

    Ok(id)
}

/// Run a prediction to completion and save its outputs.
///
/// Returns the URL path of each saved file, in output order.
pub async fn run_sync(state: &AppState, image: &Path, prompt: &str) -> AppResult<Vec<String>> {
    require_inputs(image, prompt).await?;

    let outputs = state.model.run(image, prompt).await?;
    let saved = save_outputs(&state.config.output_dir, &outputs).await?;

    Ok(saved
        .iter()
        .filter_map(|path| path.file_name().and_then(|n| n.to_str()))
        .map(|name| format!("{OUTPUTS_ROUTE}/{name}"))
        .collect())
}

/// Write each output to `dir` as `output_{timestamp}_{index}.png`.
pub async fn save_outputs(dir: &Path, outputs: &[Vec<u8>]) -> AppResult<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create output dir: {e}")))?;

    let finished_at = chrono::Utc::now();
    let mut paths = Vec::with_capacity(outputs.len());
    for (index, bytes) in outputs.iter().enumerate() {
        let path = dir.join(output_filename(finished_at, index));
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to save output: {e}")))?;
        tracing::info!(path = %path.display(), "Saved output");
        paths.push(path);
    }
    Ok(paths)
}
