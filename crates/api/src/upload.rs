//! Multipart handling for the generation endpoints.
//!
//! Both `/generate` and `/generate/sync` take the same form: a `prompt`
//! text field and an `image` file field. The image is only written to the
//! input directory once both fields are known to be present.

use std::path::{Path, PathBuf};

use axum::body::Bytes;
use axum::extract::Multipart;
use posegen_core::error::CoreError;
use posegen_core::upload::{sanitize_filename, FALLBACK_FILENAME};

use crate::error::{AppError, AppResult};

/// A validated generation form whose image is already on disk.
#[derive(Debug)]
pub struct GenerationForm {
    pub prompt: String,
    pub image_path: PathBuf,
}

/// Read the `prompt` and `image` fields, then save the image under
/// `input_dir`. Unknown fields are ignored.
pub async fn read_generation_form(
    mut multipart: Multipart,
    input_dir: &Path,
) -> AppResult<GenerationForm> {
    let mut prompt: Option<String> = None;
    let mut image: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("prompt") => {
                prompt = Some(field.text().await?);
            }
            Some("image") => {
                let filename = field.file_name().unwrap_or(FALLBACK_FILENAME).to_string();
                let data = field.bytes().await?;
                image = Some((filename, data));
            }
            _ => {}
        }
    }

    let prompt = prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    let image = image.filter(|(_, data)| !data.is_empty());

    let (Some(prompt), Some((filename, data))) = (prompt, image) else {
        return Err(CoreError::MissingInput("Missing prompt or image".into()).into());
    };

    let image_path = save_upload(input_dir, &filename, &data).await?;
    Ok(GenerationForm { prompt, image_path })
}

/// Write an uploaded file into `input_dir` under a sanitized, unique name.
pub async fn save_upload(input_dir: &Path, filename: &str, data: &[u8]) -> AppResult<PathBuf> {
    tokio::fs::create_dir_all(input_dir)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to create input dir: {e}")))?;

    let stored_name = format!(
        "{}_{}",
        uuid::Uuid::new_v4().simple(),
        sanitize_filename(filename)
    );
    let path = input_dir.join(stored_name);

    tokio::fs::write(&path, data)
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to save upload: {e}")))?;

    tracing::debug!(path = %path.display(), bytes = data.len(), "Saved upload");
    Ok(path)
}
