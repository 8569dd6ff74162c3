//! Durable backends for the job table.
//!
//! The store hands every backend the full table after each mutation; a
//! backend persists it as one unit. Backends are picked when the store is
//! opened.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use async_trait::async_trait;
use posegen_core::job::JobRecord;

use crate::StoreError;

pub type JobTable = HashMap<String, JobRecord>;

#[async_trait]
pub trait JobPersistence: Send + Sync {
    /// Short backend name, reported by the health endpoint.
    fn name(&self) -> &'static str;

    /// Read the persisted table. A backend with nothing stored yet returns
    /// an empty table.
    async fn load(&self) -> Result<JobTable, StoreError>;

    /// Replace the persisted table with `jobs`.
    async fn save(&self, jobs: &JobTable) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

/// One JSON object mapping job id to record, rewritten on every update.
///
/// Writes go to `<path>.tmp` first and are renamed over `path`, so the file
/// on disk is always either the previous or the new table.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl JobPersistence for JsonFilePersistence {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<JobTable, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No job file yet, starting empty");
                return Ok(JobTable::new());
            }
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(JobTable::new());
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn save(&self, jobs: &JobTable) -> Result<(), StoreError> {
        // Sorted keys keep the file diffable.
        let ordered: BTreeMap<&String, &JobRecord> = jobs.iter().collect();
        let body = serde_json::to_vec_pretty(&ordered)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Keeps nothing; the in-memory table is all there is.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryPersistence;

#[async_trait]
impl JobPersistence for MemoryPersistence {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self) -> Result<JobTable, StoreError> {
        Ok(JobTable::new())
    }

    async fn save(&self, _jobs: &JobTable) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use posegen_core::job::JobStatus;

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFilePersistence::new(dir.path().join("predictions.json"));
        assert!(backend.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.json");
        std::fs::write(&path, "\n").unwrap();
        let backend = JsonFilePersistence::new(&path);
        assert!(backend.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_then_load_returns_same_table() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFilePersistence::new(dir.path().join("nested/predictions.json"));

        let mut table = JobTable::new();
        let mut done = JobRecord::starting("abc123", Some("nonce".into()));
        done.overwrite(JobStatus::Succeeded, vec!["http://x/1.png".into()], None);
        table.insert("abc123".into(), done);
        table.insert("def456".into(), JobRecord::starting("def456", None));

        backend.save(&table).await.unwrap();
        let loaded = backend.load().await.unwrap();
        assert_eq!(loaded, table);

        // The temp file is renamed away.
        assert!(!dir.path().join("nested/predictions.json.tmp").exists());
    }

    #[tokio::test]
    async fn file_is_a_flat_object_keyed_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.json");
        let backend = JsonFilePersistence::new(&path);

        let mut table = JobTable::new();
        table.insert("abc123".into(), JobRecord::starting("abc123", None));
        backend.save(&table).await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["abc123"]["status"], "starting");
        assert_eq!(raw["abc123"]["outputs"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.json");
        std::fs::write(&path, "{not json").unwrap();
        let backend = JsonFilePersistence::new(&path);
        assert!(matches!(
            backend.load().await,
            Err(StoreError::Serialization(_))
        ));
    }
}
