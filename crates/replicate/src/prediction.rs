//! Prediction objects returned by the model service.

use posegen_core::job::JobStatus;
use posegen_core::webhook::output_urls;
use serde::Deserialize;
use serde_json::Value;

/// The subset of a Replicate prediction this service reads.
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub error: Value,
}

impl Prediction {
    pub fn output_urls(&self) -> Vec<String> {
        output_urls(self.output.clone())
    }

    pub fn error_message(&self) -> Option<String> {
        match &self.error {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}
