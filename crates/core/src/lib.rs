//! Domain types for the pose generation relay.
//!
//! Holds the job record and its status vocabulary, the parsed webhook
//! payload, webhook capability signing, and upload filename rules. This
//! crate has no I/O so the store, the model client and the API server can
//! all depend on it.

pub mod capability;
pub mod error;
pub mod job;
pub mod upload;
pub mod webhook;
