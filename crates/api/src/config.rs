use std::path::PathBuf;
use std::time::Duration;

use posegen_replicate::{ReplicateConfig, DEFAULT_API_URL, DEFAULT_MODEL_VERSION};

/// Where the job table is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStoreBackend {
    /// Flat JSON file at the given path, rewritten on every update.
    File(PathBuf),
    /// No persistence; jobs are lost on restart.
    Memory,
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `180`).
    pub request_timeout_secs: u64,
    /// Largest accepted request body, in bytes (default: 20 MiB).
    pub max_upload_bytes: usize,
    /// Externally reachable base URL; webhook URLs are built under it.
    pub public_url: String,
    /// Directory uploaded images are saved into.
    pub input_dir: PathBuf,
    /// Directory synchronous outputs are written into (served at `/outputs`).
    pub output_dir: PathBuf,
    pub job_store: JobStoreBackend,
    /// Secret for webhook capabilities. `None` means a random per-process
    /// secret is generated at startup.
    pub webhook_secret: Option<String>,
    pub replicate: ReplicateConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default                         |
    /// |---------------------------|---------------------------------|
    /// | `HOST`                    | `0.0.0.0`                       |
    /// | `PORT`                    | `3000`                          |
    /// | `CORS_ORIGINS`            | `http://localhost:5173`         |
    /// | `REQUEST_TIMEOUT_SECS`    | `180`                           |
    /// | `MAX_UPLOAD_MB`           | `20`                            |
    /// | `PUBLIC_URL`              | `http://localhost:{PORT}`       |
    /// | `INPUT_DIR`               | `input`                         |
    /// | `OUTPUT_DIR`              | `outputs`                       |
    /// | `JOB_STORE_BACKEND`       | `file` (`file` or `memory`)     |
    /// | `JOB_STORE_PATH`          | `predictions.json`              |
    /// | `WEBHOOK_SECRET`          | random per process              |
    /// | `REPLICATE_API_TOKEN`     | empty                           |
    /// | `REPLICATE_API_URL`       | `https://api.replicate.com/v1`  |
    /// | `REPLICATE_MODEL_VERSION` | `jagilley/controlnet-pose` hash |
    /// | `REPLICATE_TIMEOUT_SECS`  | `120`                           |
    /// | `REPLICATE_POLL_MS`       | `1000`                          |
    ///
    /// `REPLICATE_TIMEOUT_SECS` must be below `REQUEST_TIMEOUT_SECS` so a
    /// slow model run fails as a service error before the request timeout.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "180".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let max_upload_mb: usize = std::env::var("MAX_UPLOAD_MB")
            .unwrap_or_else(|_| "20".into())
            .parse()
            .expect("MAX_UPLOAD_MB must be a valid usize");

        let public_url = std::env::var("PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        let input_dir = std::env::var("INPUT_DIR").unwrap_or_else(|_| "input".into());
        let output_dir = std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "outputs".into());

        let store_path =
            std::env::var("JOB_STORE_PATH").unwrap_or_else(|_| "predictions.json".into());
        let job_store = match std::env::var("JOB_STORE_BACKEND")
            .unwrap_or_else(|_| "file".into())
            .to_lowercase()
            .as_str()
        {
            "file" => JobStoreBackend::File(PathBuf::from(store_path)),
            "memory" => JobStoreBackend::Memory,
            other => panic!("JOB_STORE_BACKEND must be 'file' or 'memory', got '{other}'"),
        };

        let webhook_secret = std::env::var("WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        let replicate_timeout_secs: u64 = std::env::var("REPLICATE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "120".into())
            .parse()
            .expect("REPLICATE_TIMEOUT_SECS must be a valid u64");

        let replicate_poll_ms: u64 = std::env::var("REPLICATE_POLL_MS")
            .unwrap_or_else(|_| "1000".into())
            .parse()
            .expect("REPLICATE_POLL_MS must be a valid u64");

        if let Err(msg) = check_timeouts(request_timeout_secs, replicate_timeout_secs) {
            panic!("{msg}");
        }

        let replicate = ReplicateConfig {
            api_url: std::env::var("REPLICATE_API_URL")
                .unwrap_or_else(|_| DEFAULT_API_URL.into()),
            api_token: std::env::var("REPLICATE_API_TOKEN").unwrap_or_default(),
            model_version: std::env::var("REPLICATE_MODEL_VERSION")
                .unwrap_or_else(|_| DEFAULT_MODEL_VERSION.into()),
            timeout: Duration::from_secs(replicate_timeout_secs),
            poll_interval: Duration::from_millis(replicate_poll_ms),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            public_url,
            input_dir: PathBuf::from(input_dir),
            output_dir: PathBuf::from(output_dir),
            job_store,
            webhook_secret,
            replicate,
        }
    }
}

/// The model timeout has to expire before the HTTP request timeout.
fn check_timeouts(request_timeout_secs: u64, replicate_timeout_secs: u64) -> Result<(), String> {
    if replicate_timeout_secs >= request_timeout_secs {
        return Err(format!(
            "REPLICATE_TIMEOUT_SECS ({replicate_timeout_secs}) must be less than \
             REQUEST_TIMEOUT_SECS ({request_timeout_secs})"
        ));
    }
    Ok(())
}
