//! Job store: the in-memory job table and its persistence mirror.
//!
//! [`JobStore`] is the single owner of job records for the process. Every
//! mutation runs inside one mutex scope that covers the change and the write
//! of the full table to the configured [`JobPersistence`] backend, so readers
//! never see a half-applied update and snapshots reach disk in order.
//!
//! When the backend write fails the in-memory change is kept and the error
//! is returned: the record stays queryable for the life of the process but
//! will not survive a restart. Callers decide whether that matters.

pub mod persistence;

use std::sync::Arc;

use posegen_core::error::CoreError;
use posegen_core::job::JobRecord;
use tokio::sync::Mutex;

pub use persistence::{JobPersistence, JobTable, JsonFilePersistence, MemoryPersistence};

/// Entity name used in not-found errors.
pub const ENTITY: &str = "Prediction";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Job persistence I/O failed: {0}")]
    Persistence(#[from] std::io::Error),

    #[error("Job table serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub struct JobStore {
    jobs: Mutex<JobTable>,
    backend: Arc<dyn JobPersistence>,
}

impl JobStore {
    /// Load the persisted table from `backend` and wrap it.
    pub async fn open(backend: Arc<dyn JobPersistence>) -> Result<Self, StoreError> {
        let jobs = backend.load().await?;
        tracing::info!(
            backend = backend.name(),
            jobs = jobs.len(),
            "Job store loaded"
        );
        Ok(Self {
            jobs: Mutex::new(jobs),
            backend,
        })
    }

    /// A store with no durable backing.
    pub fn in_memory() -> Self {
        Self {
            jobs: Mutex::new(JobTable::new()),
            backend: Arc::new(MemoryPersistence),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Insert or overwrite the record for `id`, then persist the table.
    pub async fn put(&self, id: &str, record: JobRecord) -> Result<(), StoreError> {
        let mut jobs = self.jobs.lock().await;
        jobs.insert(id.to_string(), record);
        self.backend.save(&jobs).await
    }

    /// Insert `record` only when `id` is not tracked yet.
    ///
    /// Returns `true` when the record was inserted.
    pub async fn insert_if_absent(&self, id: &str, record: JobRecord) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.lock().await;
        if jobs.contains_key(id) {
            return Ok(false);
        }
        jobs.insert(id.to_string(), record);
        self.backend.save(&jobs).await?;
        Ok(true)
    }

    /// Atomic read-modify-write of one record.
    ///
    /// `f` sees the current record (if any) and returns the replacement, or
    /// `None` to leave the table untouched. Returns the stored replacement.
    pub async fn update<F>(&self, id: &str, f: F) -> Result<Option<JobRecord>, StoreError>
    where
        F: FnOnce(Option<&JobRecord>) -> Option<JobRecord>,
    {
        let mut jobs = self.jobs.lock().await;
        let Some(next) = f(jobs.get(id)) else {
            return Ok(None);
        };
        jobs.insert(id.to_string(), next.clone());
        self.backend.save(&jobs).await?;
        Ok(Some(next))
    }

    /// Current record for `id`.
    pub async fn get(&self, id: &str) -> Result<JobRecord, CoreError> {
        self.jobs
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                entity: ENTITY,
                id: id.to_string(),
            })
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}
