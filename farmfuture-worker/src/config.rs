//! Worker configuration
//!
//! Defines the parameters of a supervisor: where the job service lives,
//! which job this worker serves, and how sandboxes are launched.

use std::path::PathBuf;
use std::time::Duration;

/// Supervisor configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Job service base URL (e.g., "http://localhost:8080")
    pub service_url: String,

    /// Job this worker was started for
    pub job_id: u64,

    /// How long to wait before asking again when work is `waiting`
    pub waiting_interval: Duration,

    /// Executable launched as the sandbox; the running binary when unset
    pub sandbox_program: Option<PathBuf>,
}

impl WorkerConfig {
    /// Creates a new configuration with defaults
    pub fn new(service_url: String, job_id: u64) -> Self {
        Self {
            service_url,
            job_id,
            waiting_interval: Duration::from_secs(10),
            sandbox_program: None,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - FARMFUTURE_URL (required)
    /// - FARMFUTURE_JOB_ID (required)
    /// - FARMFUTURE_WAITING_INTERVAL (optional, seconds, default: 10)
    /// - FARMFUTURE_SANDBOX_PROGRAM (optional, default: this executable)
    pub fn from_env() -> anyhow::Result<Self> {
        let service_url = std::env::var("FARMFUTURE_URL")
            .map_err(|_| anyhow::anyhow!("FARMFUTURE_URL environment variable not set"))?;

        let job_id = std::env::var("FARMFUTURE_JOB_ID")
            .map_err(|_| anyhow::anyhow!("FARMFUTURE_JOB_ID environment variable not set"))?
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("FARMFUTURE_JOB_ID is not a job id: {}", e))?;

        Ok(Self::new(service_url, job_id).with_optional_env())
    }

    /// Applies the optional environment settings on top of the defaults
    pub fn with_optional_env(mut self) -> Self {
        if let Some(secs) = std::env::var("FARMFUTURE_WAITING_INTERVAL")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.waiting_interval = Duration::from_secs(secs);
        }

        if let Some(program) = std::env::var_os("FARMFUTURE_SANDBOX_PROGRAM") {
            self.sandbox_program = Some(PathBuf::from(program));
        }

        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.service_url.is_empty() {
            anyhow::bail!("service_url cannot be empty");
        }

        if !self.service_url.starts_with("http://") && !self.service_url.starts_with("https://") {
            anyhow::bail!("service_url must start with http:// or https://");
        }

        if self.waiting_interval.is_zero() {
            anyhow::bail!("waiting_interval must be greater than 0");
        }

        Ok(())
    }
}
