//! Client for the remote pose-conditioned generation model.
//!
//! [`ModelService`] is the seam the API server talks to: one call starts an
//! asynchronous prediction that reports back through a webhook, the other
//! runs a prediction to completion and returns the generated image bytes.
//! [`api::ReplicateApi`] implements it against the Replicate HTTP API.

pub mod api;
pub mod prediction;

use std::path::Path;

use async_trait::async_trait;

pub use api::{ReplicateApi, ReplicateApiError, ReplicateConfig};
pub use prediction::Prediction;

/// Version hash of `jagilley/controlnet-pose` used by default.
pub const DEFAULT_MODEL_VERSION: &str =
    "0304f7f774ba7341ef754231f794b1ba3d129e3c46af3022241325ae0c50fb99";

/// Default Replicate API base URL.
pub const DEFAULT_API_URL: &str = "https://api.replicate.com/v1";

#[async_trait]
pub trait ModelService: Send + Sync {
    /// Start a prediction that will post its completion to `webhook_url`.
    ///
    /// Returns as soon as the service has accepted the job.
    async fn create_prediction(
        &self,
        image: &Path,
        prompt: &str,
        webhook_url: &str,
    ) -> Result<Prediction, ReplicateApiError>;

    /// Run a prediction to completion and download every output.
    async fn run(&self, image: &Path, prompt: &str) -> Result<Vec<Vec<u8>>, ReplicateApiError>;
}
