//! Route definitions for generation and status polling.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{generation, status};
use crate::state::AppState;

/// ```text
/// POST   /generate        -> generate
/// POST   /generate/sync   -> generate_sync
/// GET    /status/{id}     -> get_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generation::generate))
        .route("/generate/sync", post(generation::generate_sync))
        .route("/status/{id}", get(status::get_status))
}
