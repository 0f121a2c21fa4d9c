//! Farm-side work requests and reports

use async_trait::async_trait;
use farmfuture_core::domain::{JobRecord, Status, WorkItem};
use farmfuture_core::dto::job::ReportJobRequest;

use crate::error::Result;
use crate::{FarmClient, FarmService};

/// A worker's connection to the service, bound to the job it serves
#[derive(Debug, Clone)]
pub struct WorkerSession {
    client: FarmClient,
    job_id: u64,
}

impl WorkerSession {
    pub fn new(client: FarmClient, job_id: u64) -> Self {
        Self { client, job_id }
    }

    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    fn job_url(&self) -> String {
        format!("{}/api/jobs/{}", self.client.base_url, self.job_id)
    }
}

#[async_trait]
impl FarmService for WorkerSession {
    async fn job_object(&self) -> Result<JobRecord> {
        let response = self.client.client.get(self.job_url()).send().await?;
        self.client.handle_response(response).await
    }

    async fn request_work(&self) -> Result<WorkItem> {
        let url = format!("{}/work/request", self.job_url());
        let response = self.client.client.post(&url).send().await?;
        self.client.handle_response(response).await
    }

    async fn report_job(&self, status: Status) -> Result<()> {
        let url = format!("{}/status", self.job_url());
        let response = self
            .client
            .client
            .put(&url)
            .json(&ReportJobRequest { status })
            .send()
            .await?;
        self.client.handle_empty_response(response).await
    }

    async fn report_work(&self, item: &WorkItem) -> Result<()> {
        let url = format!("{}/work/{}", self.job_url(), item.id);
        let response = self.client.client.put(&url).json(item).send().await?;
        self.client.handle_empty_response(response).await
    }
}
