//! Parsing of inbound prediction callbacks.
//!
//! The model service posts its whole prediction object. Only `id`, `status`,
//! `output` and `error` matter here; everything else is ignored. Field
//! presence is checked explicitly so a payload without an id never reaches
//! the store.

use serde::Deserialize;
use serde_json::Value;

use crate::job::JobStatus;

/// A callback body that passed presence checks.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookPayload {
    pub id: String,
    pub status: JobStatus,
    pub outputs: Vec<String>,
    pub error: Option<String>,
}

/// Why a callback body was dropped.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PayloadRejection {
    #[error("Body is not a JSON object: {0}")]
    Malformed(String),

    #[error("Payload has no prediction id")]
    MissingId,

    #[error("Payload has no status")]
    MissingStatus,
}

#[derive(Deserialize)]
struct RawPayload {
    id: Option<String>,
    status: Option<String>,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Value,
}

impl WebhookPayload {
    /// Parse and validate a raw callback body.
    pub fn parse(body: &[u8]) -> Result<Self, PayloadRejection> {
        let raw: RawPayload = serde_json::from_slice(body)
            .map_err(|e| PayloadRejection::Malformed(e.to_string()))?;

        let id = raw
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(PayloadRejection::MissingId)?;

        let status = raw
            .status
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(PayloadRejection::MissingStatus)?;

        Ok(Self {
            id,
            status: JobStatus::from(status),
            outputs: output_urls(raw.output),
            error: error_message(raw.error),
        })
    }
}

/// Output references from a prediction's `output` field.
///
/// The pose model returns a list of URLs, but a single string is also
/// accepted. Non-string list entries are skipped; `null` yields nothing.
pub fn output_urls(output: Value) -> Vec<String> {
    match output {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        Value::String(s) => vec![s],
        _ => Vec::new(),
    }
}

fn error_message(error: Value) -> Option<String> {
    match error {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}
