//! Prediction callback receiver.
//!
//! The model service posts the finished prediction here. The sender cannot
//! act on an error, and an error would tell a stranger which ids exist, so
//! the answer is always `204 No Content`. Anything unusable is logged and
//! dropped.

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use posegen_core::job::JobRecord;
use posegen_core::webhook::WebhookPayload;
use serde::Deserialize;

use crate::state::AppState;

/// Capability carried in the callback URL.
#[derive(Debug, Deserialize)]
pub struct WebhookQuery {
    pub nonce: Option<String>,
    pub sig: Option<String>,
}

/// What a callback did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Updated,
    /// No record yet; one was created from the callback.
    Created,
    /// The record was submitted with a different capability.
    NonceMismatch,
    /// The callback would move the status backwards.
    Regression,
    /// Signature, body or required fields were unusable.
    Rejected,
}

/// POST /webhook?nonce=..&sig=..
pub async fn receive_webhook(
    State(state): State<AppState>,
    query: Result<Query<WebhookQuery>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> StatusCode {
    let outcome = match (query, body) {
        (Ok(Query(query)), Ok(body)) => apply_callback(&state, &query, &body).await,
        (Err(e), _) => {
            tracing::warn!(error = %e, "Dropping webhook with unreadable query");
            CallbackOutcome::Rejected
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Dropping webhook with unreadable body");
            CallbackOutcome::Rejected
        }
    };
    tracing::debug!(?outcome, "Webhook handled");

    StatusCode::NO_CONTENT
}

/// Verify, parse and apply one callback.
pub async fn apply_callback(state: &AppState, query: &WebhookQuery, body: &[u8]) -> CallbackOutcome {
    let nonce = match (query.nonce.as_deref(), query.sig.as_deref()) {
        (Some(nonce), Some(sig)) if state.signer.verify(nonce, sig) => nonce.to_string(),
        _ => {
            tracing::warn!("Dropping webhook with missing or invalid signature");
            return CallbackOutcome::Rejected;
        }
    };

    let payload = match WebhookPayload::parse(body) {
        Ok(payload) => payload,
        Err(reason) => {
            tracing::warn!(%reason, "Dropping unusable webhook payload");
            return CallbackOutcome::Rejected;
        }
    };

    let mut outcome = CallbackOutcome::Updated;
    let WebhookPayload {
        id,
        status,
        outputs,
        error,
    } = payload;

    let result = state
        .store
        .update(&id, |current| match current {
            Some(existing) => {
                if existing
                    .webhook_nonce
                    .as_deref()
                    .is_some_and(|expected| expected != nonce)
                {
                    outcome = CallbackOutcome::NonceMismatch;
                    return None;
                }
                if existing.status.would_regress_to(&status) {
                    outcome = CallbackOutcome::Regression;
                    return None;
                }
                let mut next = existing.clone();
                next.overwrite(status.clone(), outputs, error);
                Some(next)
            }
            None => {
                outcome = CallbackOutcome::Created;
                let mut placeholder = JobRecord::starting(&id, Some(nonce.clone()));
                placeholder.overwrite(status.clone(), outputs, error);
                Some(placeholder)
            }
        })
        .await;

    match (&result, outcome) {
        (Err(e), _) => {
            tracing::warn!(prediction_id = %id, error = %e, "Callback applied in memory only");
        }
        (Ok(_), CallbackOutcome::NonceMismatch) => {
            tracing::warn!(prediction_id = %id, "Dropping webhook signed for another job");
        }
        (Ok(_), CallbackOutcome::Regression) => {
            tracing::debug!(prediction_id = %id, %status, "Ignoring status regression");
        }
        (Ok(_), _) => {
            tracing::info!(prediction_id = %id, %status, ?outcome, "Prediction updated from webhook");
        }
    }

    outcome
}
