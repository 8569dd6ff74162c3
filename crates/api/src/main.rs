use std::net::SocketAddr;
use std::sync::Arc;

use posegen_core::capability::WebhookSigner;
use posegen_replicate::ReplicateApi;
use posegen_store::{JobPersistence, JobStore, JsonFilePersistence, MemoryPersistence};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use posegen_api::config::{JobStoreBackend, ServerConfig};
use posegen_api::router::build_app_router;
use posegen_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "posegen_api=debug,posegen_store=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        public_url = %config.public_url,
        "Loaded server configuration",
    );

    // --- Directories ---
    for dir in [&config.input_dir, &config.output_dir] {
        tokio::fs::create_dir_all(dir)
            .await
            .unwrap_or_else(|e| panic!("Failed to create {}: {e}", dir.display()));
    }

    // --- Job store ---
    let backend: Arc<dyn JobPersistence> = match &config.job_store {
        JobStoreBackend::File(path) => Arc::new(JsonFilePersistence::new(path)),
        JobStoreBackend::Memory => Arc::new(MemoryPersistence),
    };
    let store = JobStore::open(backend)
        .await
        .expect("Failed to load job store");

    // --- Webhook capabilities ---
    let signer = match &config.webhook_secret {
        Some(secret) => WebhookSigner::new(secret),
        None => {
            tracing::warn!(
                "WEBHOOK_SECRET not set; callbacks for jobs submitted before a restart will be rejected"
            );
            WebhookSigner::random()
        }
    };

    // --- Model service ---
    if config.replicate.api_token.is_empty() {
        tracing::warn!("REPLICATE_API_TOKEN not set; generation requests will be rejected upstream");
    }
    let model = ReplicateApi::new(config.replicate.clone()).expect("Failed to build HTTP client");

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(store),
        model: Arc::new(model),
        signer: Arc::new(signer),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
