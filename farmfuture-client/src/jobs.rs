//! Job submission and batch status queries

use async_trait::async_trait;
use farmfuture_core::domain::JobRecord;
use farmfuture_core::dto::job::{JobSubmission, SubmittedJob};
use std::collections::BTreeSet;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::{FarmClient, JobService};

/// Formats ids as the comma separated list the query endpoint expects
pub(crate) fn id_list(job_ids: &BTreeSet<u64>) -> String {
    job_ids
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[async_trait]
impl JobService for FarmClient {
    async fn submit_job(&self, submission: JobSubmission) -> Result<u64> {
        if submission.agenda.is_empty() {
            return Err(ClientError::InvalidRequest(
                "a job needs at least one work item".to_string(),
            ));
        }

        let url = format!("{}/api/jobs", self.base_url);
        let response = self.client.post(&url).json(&submission).send().await?;

        let submitted: SubmittedJob = self.handle_response(response).await?;
        debug!(
            "Submitted job {} '{}' with {} item(s)",
            submitted.id,
            submission.name,
            submission.agenda.len()
        );
        Ok(submitted.id)
    }

    async fn query_status(
        &self,
        job_ids: &BTreeSet<u64>,
        include_agenda: bool,
    ) -> Result<Vec<JobRecord>> {
        if job_ids.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/api/jobs", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("ids", id_list(job_ids)),
                ("agenda", include_agenda.to_string()),
            ])
            .send()
            .await?;

        self.handle_response(response).await
    }
}
