//! Farmfuture client
//!
//! The remote job service contract and an HTTP implementation of it.
//!
//! The contract is split by side:
//! - [`JobService`] is used by submitters and the resolver to create jobs
//!   and to query their status in batches.
//! - [`FarmService`] is used by a farm-side supervisor bound to one job to
//!   pull work items and report results.
//!
//! Both traits are object safe so tests can substitute in-memory fakes.

pub mod error;
mod jobs;
mod work;

pub use error::{ClientError, Result};
pub use work::WorkerSession;

use async_trait::async_trait;
use farmfuture_core::domain::{JobRecord, Status, WorkItem};
use farmfuture_core::dto::job::JobSubmission;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;

/// Submitting-side view of the remote job service
#[async_trait]
pub trait JobService: Send + Sync {
    /// Submits a job and returns its id
    async fn submit_job(&self, submission: JobSubmission) -> Result<u64>;

    /// Queries several jobs in one call
    ///
    /// # Arguments
    /// * `job_ids` - Jobs to query
    /// * `include_agenda` - Whether to include per-item detail, including
    ///   result packages
    async fn query_status(
        &self,
        job_ids: &BTreeSet<u64>,
        include_agenda: bool,
    ) -> Result<Vec<JobRecord>>;
}

/// Farm-side view of the remote job service, bound to one job
#[async_trait]
pub trait FarmService: Send + Sync {
    /// Fetches the job this worker was started for
    async fn job_object(&self) -> Result<JobRecord>;

    /// Requests the next work item; blocks until the service answers
    async fn request_work(&self) -> Result<WorkItem>;

    /// Reports the final status of this worker's job
    async fn report_job(&self, status: Status) -> Result<()>;

    /// Reports a work item with its result package and status
    async fn report_work(&self, item: &WorkItem) -> Result<()>;
}

/// HTTP client for the remote job service
#[derive(Debug, Clone)]
pub struct FarmClient {
    /// Base URL of the service (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl FarmClient {
    /// Create a new client
    ///
    /// # Example
    /// ```
    /// use farmfuture_client::FarmClient;
    ///
    /// let client = FarmClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a configured reqwest client
    ///
    /// Timeouts for the batch queries belong here; the resolver does not
    /// cancel a query in flight.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the service
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Handle a response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle a response that returns no content
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(())
    }
}
