//! Route definitions for model service callbacks.
//!
//! No session auth: the capability in the query string is the only
//! credential.

use axum::routing::post;
use axum::Router;

use crate::handlers::webhook;
use crate::state::AppState;

/// ```text
/// POST   /webhook         -> receive_webhook
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/webhook", post(webhook::receive_webhook))
}
