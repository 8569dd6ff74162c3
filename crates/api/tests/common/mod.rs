#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use posegen_core::capability::{WebhookCapability, WebhookSigner};
use posegen_replicate::{
    ModelService, Prediction, ReplicateApiError, ReplicateConfig, DEFAULT_API_URL,
    DEFAULT_MODEL_VERSION,
};
use posegen_store::JobStore;
use tempfile::TempDir;
use tower::ServiceExt;

use posegen_api::config::{JobStoreBackend, ServerConfig};
use posegen_api::router::build_app_router;
use posegen_api::state::AppState;

pub const PUBLIC_URL: &str = "http://relay.test";
pub const BOUNDARY: &str = "posegen-test-boundary";

/// Build a test `ServerConfig` with its directories under `root`.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config(root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        max_upload_bytes: 2 * 1024 * 1024,
        public_url: PUBLIC_URL.to_string(),
        input_dir: root.join("input"),
        output_dir: root.join("outputs"),
        job_store: JobStoreBackend::Memory,
        webhook_secret: Some("test-secret".to_string()),
        replicate: ReplicateConfig {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: String::new(),
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(10),
        },
    }
}

// ---------------------------------------------------------------------------
// Fake model service
// ---------------------------------------------------------------------------

/// One `create_prediction` call as the fake saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub image: PathBuf,
    pub prompt: String,
    pub webhook_url: String,
}

/// In-process stand-in for the remote model.
///
/// Hands out queued ids first, then `pred-1`, `pred-2`, ... .
#[derive(Default)]
pub struct FakeModel {
    ids: Mutex<VecDeque<String>>,
    counter: AtomicUsize,
    failing: AtomicBool,
    outputs: Mutex<Vec<Vec<u8>>>,
    calls: Mutex<Vec<RecordedCall>>,
    runs: AtomicUsize,
}

impl FakeModel {
    pub fn queue_id(&self, id: &str) {
        self.ids.lock().unwrap().push_back(id.to_string());
    }

    pub fn fail_requests(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn set_outputs(&self, outputs: Vec<Vec<u8>>) {
        *self.outputs.lock().unwrap() = outputs;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    fn upstream_failure() -> ReplicateApiError {
        ReplicateApiError::ApiError {
            status: 502,
            body: "upstream token r8_secret rejected".to_string(),
        }
    }
}

#[async_trait]
impl ModelService for FakeModel {
    async fn create_prediction(
        &self,
        image: &Path,
        prompt: &str,
        webhook_url: &str,
    ) -> Result<Prediction, ReplicateApiError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(Self::upstream_failure());
        }

        self.calls.lock().unwrap().push(RecordedCall {
            image: image.to_path_buf(),
            prompt: prompt.to_string(),
            webhook_url: webhook_url.to_string(),
        });

        let id = self.ids.lock().unwrap().pop_front().unwrap_or_else(|| {
            let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
            format!("pred-{n}")
        });

        Ok(serde_json::from_value(serde_json::json!({
            "id": id,
            "status": "starting",
            "output": null,
            "error": null,
        }))
        .unwrap())
    }

    async fn run(&self, _image: &Path, _prompt: &str) -> Result<Vec<Vec<u8>>, ReplicateApiError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Self::upstream_failure());
        }
        Ok(self.outputs.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// Test application
// ---------------------------------------------------------------------------

/// The router plus handles on its state for assertions.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub model: Arc<FakeModel>,
    _root: TempDir,
}

impl TestApp {
    /// A fresh router sharing this app's state, ready for `oneshot`.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.state.config
    }

    pub fn store(&self) -> &JobStore {
        &self.state.store
    }

    pub fn signer(&self) -> &WebhookSigner {
        &self.state.signer
    }
}

/// Build the full application router with all middleware layers over an
/// in-memory store and a [`FakeModel`].
///
/// Uses the same `build_app_router` as `main.rs`, so integration tests
/// exercise the production middleware stack.
pub fn build_test_app() -> TestApp {
    let root = tempfile::tempdir().unwrap();
    let config = test_config(root.path());
    let model = Arc::new(FakeModel::default());

    let state = AppState {
        config: Arc::new(config.clone()),
        store: Arc::new(JobStore::in_memory()),
        model: model.clone(),
        signer: Arc::new(WebhookSigner::new(config.webhook_secret.as_deref().unwrap())),
    };

    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        model,
        _root: root,
    }
}

// ---------------------------------------------------------------------------
// Multipart
// ---------------------------------------------------------------------------

/// Builder for `multipart/form-data` request bodies.
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.body
    }
}

/// The form used by most generation tests.
pub fn pose_form(prompt: &str) -> Vec<u8> {
    MultipartBody::new()
        .text("prompt", prompt)
        .file("image", "pose.jpg", "image/jpeg", b"\xff\xd8\xff\xe0fake-jpeg")
        .finish()
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_multipart(app: Router, uri: &str, body: Vec<u8>) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(json.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a callback body to the webhook URL of `capability`.
pub async fn post_webhook(
    app: Router,
    capability: &WebhookCapability,
    json: serde_json::Value,
) -> Response<Body> {
    let uri = format!(
        "/webhook?nonce={}&sig={}",
        capability.nonce, capability.signature
    );
    post_json(app, &uri, json).await
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Count regular files in `dir`; a missing directory counts as empty.
pub fn file_count(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(Result::ok)
                .filter(|e| e.path().is_file())
                .count()
        })
        .unwrap_or(0)
}
