pub mod generation;
pub mod health;
pub mod webhook;

use axum::Router;

use crate::state::AppState;

/// Build the application route tree.
///
/// Route hierarchy:
///
/// ```text
/// /generate                 async submission (POST, multipart)
/// /generate/sync            blocking generation (POST, multipart)
/// /status/{id}              prediction status (GET)
/// /webhook                  prediction callbacks (POST)
/// ```
///
/// `/health` and `/outputs` are mounted separately by the router builder.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(generation::router())
        .merge(webhook::router())
}
