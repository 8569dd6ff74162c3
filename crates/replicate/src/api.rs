//! REST API client for Replicate predictions.
//!
//! Wraps prediction creation, prediction lookup and output download using
//! [`reqwest`]. Every request shares one client built with the configured
//! timeout, so a stalled upstream surfaces as an error instead of hanging
//! the handler that called it.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use posegen_core::job::JobStatus;
use serde_json::{json, Value};
use tokio::time::Instant;

use crate::prediction::Prediction;
use crate::ModelService;

/// Connection settings for the Replicate API.
#[derive(Debug, Clone)]
pub struct ReplicateConfig {
    /// Base URL, e.g. `https://api.replicate.com/v1`.
    pub api_url: String,
    pub api_token: String,
    /// Model version hash to run.
    pub model_version: String,
    /// Upper bound for a single HTTP request and for a synchronous run.
    pub timeout: Duration,
    /// Delay between status polls while a synchronous run is in flight.
    pub poll_interval: Duration,
}

/// Errors from the Replicate REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ReplicateApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Replicate returned a non-2xx status code.
    #[error("Replicate API error ({status}): {body}")]
    ApiError {
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The local input image could not be read.
    #[error("Failed to read input image: {0}")]
    Image(#[from] std::io::Error),

    /// The prediction finished without succeeding.
    #[error(
        "Prediction {id} ended with status {status}: {}",
        .error.as_deref().unwrap_or("no error reported")
    )]
    PredictionFailed {
        id: String,
        status: String,
        error: Option<String>,
    },

    /// A synchronous run hit the configured timeout. `id` is `None` when
    /// the prediction was never accepted.
    #[error(
        "Prediction {} did not finish within {waited_secs}s",
        .id.as_deref().unwrap_or("<not created>")
    )]
    TimedOut {
        id: Option<String>,
        waited_secs: u64,
    },
}

/// HTTP client for the Replicate predictions API.
pub struct ReplicateApi {
    client: reqwest::Client,
    config: ReplicateConfig,
}

impl ReplicateApi {
    pub fn new(config: ReplicateConfig) -> Result<Self, ReplicateApiError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    /// Fetch the current state of a prediction.
    pub async fn get_prediction(&self, id: &str) -> Result<Prediction, ReplicateApiError> {
        let response = self
            .client
            .get(format!("{}/predictions/{}", self.api_url(), id))
            .bearer_auth(&self.config.api_token)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download one output file.
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, ReplicateApiError> {
        let response = self.client.get(url).send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn submit(
        &self,
        image: &Path,
        prompt: &str,
        webhook_url: Option<&str>,
        wait: bool,
    ) -> Result<Prediction, ReplicateApiError> {
        let image_uri = image_data_uri(image).await?;
        let body = prediction_body(&self.config.model_version, &image_uri, prompt, webhook_url);

        let mut request = self
            .client
            .post(format!("{}/predictions", self.api_url()))
            .bearer_auth(&self.config.api_token)
            .json(&body);
        if wait {
            request = request.header("Prefer", "wait");
        }

        let prediction: Prediction = Self::parse_response(request.send().await?).await?;
        tracing::debug!(
            prediction_id = %prediction.id,
            status = %prediction.status,
            "Prediction created",
        );
        Ok(prediction)
    }

    /// Submit, poll to a terminal status and download every output.
    ///
    /// Unbounded on its own; [`ModelService::run`] wraps it in the run
    /// deadline. The prediction id is written to `created` as soon as it
    /// is known.
    async fn complete(
        &self,
        image: &Path,
        prompt: &str,
        created: &mut Option<String>,
    ) -> Result<Vec<Vec<u8>>, ReplicateApiError> {
        let mut prediction = self.submit(image, prompt, None, true).await?;
        *created = Some(prediction.id.clone());

        while !prediction.status.is_terminal() {
            tokio::time::sleep(self.config.poll_interval).await;
            prediction = self.get_prediction(&prediction.id).await?;
            tracing::debug!(
                prediction_id = %prediction.id,
                status = %prediction.status,
                "Polled prediction",
            );
        }

        if prediction.status != JobStatus::Succeeded {
            return Err(ReplicateApiError::PredictionFailed {
                error: prediction.error_message(),
                status: prediction.status.to_string(),
                id: prediction.id,
            });
        }

        let mut outputs = Vec::new();
        for url in prediction.output_urls() {
            outputs.push(self.download(&url).await?);
        }
        Ok(outputs)
    }

    fn api_url(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    // ---- private helpers ----

    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ReplicateApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ReplicateApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ReplicateApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl ModelService for ReplicateApi {
    async fn create_prediction(
        &self,
        image: &Path,
        prompt: &str,
        webhook_url: &str,
    ) -> Result<Prediction, ReplicateApiError> {
        self.submit(image, prompt, Some(webhook_url), false).await
    }

    /// The configured timeout bounds the whole run: submission, polling
    /// and downloads share one deadline.
    async fn run(&self, image: &Path, prompt: &str) -> Result<Vec<Vec<u8>>, ReplicateApiError> {
        tracing::info!(prompt, image = %image.display(), "Running model synchronously");

        let started = Instant::now();
        let deadline = started + self.config.timeout;
        let mut created = None;

        let outcome =
            tokio::time::timeout_at(deadline, self.complete(image, prompt, &mut created)).await;

        match outcome {
            Ok(result) => result,
            Err(_) => {
                let waited_secs = started.elapsed().as_secs();
                tracing::warn!(prediction_id = ?created, waited_secs, "Synchronous run timed out");
                Err(ReplicateApiError::TimedOut {
                    id: created,
                    waited_secs,
                })
            }
        }
    }
}

/// JSON body for `POST /predictions`.
///
/// With a webhook, only the `completed` event is requested so the service
/// calls back once per job.
pub fn prediction_body(
    version: &str,
    image_uri: &str,
    prompt: &str,
    webhook_url: Option<&str>,
) -> Value {
    let mut body = json!({
        "version": version,
        "input": {
            "image": image_uri,
            "prompt": prompt,
        },
    });
    if let Some(url) = webhook_url {
        body["webhook"] = json!(url);
        body["webhook_events_filter"] = json!(["completed"]);
    }
    body
}

/// Read `path` and encode it as a `data:` URI for the `image` input.
pub async fn image_data_uri(path: &Path) -> Result<String, ReplicateApiError> {
    let bytes = tokio::fs::read(path).await?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:{};base64,{}", mime.essence_str(), encoded))
}
