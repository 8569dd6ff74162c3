//! Job record and lifecycle status.
//!
//! A [`JobRecord`] tracks one prediction submitted to the model service.
//! The status vocabulary belongs to the remote service, so [`JobStatus`]
//! keeps any string it does not recognise instead of rejecting it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

pub const STATUS_STARTING: &str = "starting";
pub const STATUS_PROCESSING: &str = "processing";
pub const STATUS_SUCCEEDED: &str = "succeeded";
pub const STATUS_FAILED: &str = "failed";
pub const STATUS_CANCELED: &str = "canceled";

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a prediction, serialized as the plain status string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    /// A status string the service reported that we have no variant for.
    Other(String),
}

impl JobStatus {
    pub fn as_str(&self) -> &str {
        match self {
            JobStatus::Starting => STATUS_STARTING,
            JobStatus::Processing => STATUS_PROCESSING,
            JobStatus::Succeeded => STATUS_SUCCEEDED,
            JobStatus::Failed => STATUS_FAILED,
            JobStatus::Canceled => STATUS_CANCELED,
            JobStatus::Other(s) => s,
        }
    }

    /// Whether the prediction has finished, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled
        )
    }

    /// Position in the forward-only lifecycle.
    ///
    /// Unknown statuses rank alongside `processing`: they are neither the
    /// initial state nor a recognised completion.
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Starting => 0,
            JobStatus::Processing | JobStatus::Other(_) => 1,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Canceled => 2,
        }
    }

    /// Whether moving from `self` to `next` would go backwards.
    pub fn would_regress_to(&self, next: &JobStatus) -> bool {
        next.rank() < self.rank()
    }
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            STATUS_STARTING => JobStatus::Starting,
            STATUS_PROCESSING => JobStatus::Processing,
            STATUS_SUCCEEDED => JobStatus::Succeeded,
            STATUS_FAILED => JobStatus::Failed,
            STATUS_CANCELED => JobStatus::Canceled,
            _ => JobStatus::Other(value),
        }
    }
}

impl From<&str> for JobStatus {
    fn from(value: &str) -> Self {
        JobStatus::from(value.to_string())
    }
}

impl From<JobStatus> for String {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// JobRecord
// ---------------------------------------------------------------------------

/// Persisted lifecycle state for one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Nonce of the webhook capability this job was submitted with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_nonce: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// A freshly submitted job: `starting`, no outputs.
    pub fn starting(id: impl Into<String>, webhook_nonce: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: JobStatus::Starting,
            outputs: Vec::new(),
            error: None,
            webhook_nonce,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace status, outputs and error with the values from a callback.
    ///
    /// Outputs are only kept when the new status is terminal.
    pub fn overwrite(&mut self, status: JobStatus, outputs: Vec<String>, error: Option<String>) {
        self.outputs = if status.is_terminal() { outputs } else { Vec::new() };
        self.status = status;
        self.error = error;
        self.updated_at = Utc::now();
    }
}
