use std::sync::Arc;

use posegen_core::capability::WebhookSigner;
use posegen_replicate::ModelService;
use posegen_store::JobStore;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// The job table; the only shared mutable state.
    pub store: Arc<JobStore>,
    /// Remote generation model.
    pub model: Arc<dyn ModelService>,
    /// Mints and checks webhook capabilities.
    pub signer: Arc<WebhookSigner>,
}
