//! One poll cycle of the resolver
//!
//! Queries the farm for every tracked job in a single batch and settles
//! the futures whose work items have finished.

use anyhow::{Context, Result};
use farmfuture_client::JobService;
use farmfuture_core::domain::{JobRecord, ResultPackage, Status};
use farmfuture_core::pack;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::ResolverConfig;
use crate::error::{FutureError, JobFailure};
use crate::future::{RemoteFuture, WorkKey};
use crate::resolver::backoff::Backoff;
use crate::resolver::registry::FutureRegistry;

/// State owned by the resolver loop
pub(crate) struct Poller {
    service: Arc<dyn JobService>,
    pub(crate) registry: FutureRegistry,
    pub(crate) backoff: Backoff,
    two_stage: bool,
}

impl Poller {
    pub(crate) fn new(service: Arc<dyn JobService>, config: &ResolverConfig) -> Self {
        Self {
            service,
            registry: FutureRegistry::new(),
            backoff: Backoff::new(config),
            two_stage: config.two_stage_polling,
        }
    }

    /// Runs one query/resolution pass and returns how many futures settled
    pub(crate) async fn poll(&mut self) -> Result<usize> {
        let job_ids = self.registry.job_ids();
        if job_ids.is_empty() {
            return Ok(0);
        }

        trace!("Polling {} job(s)", job_ids.len());

        let jobs = if self.two_stage {
            let jobs = self
                .service
                .query_status(&job_ids, false)
                .await
                .context("Failed to query job status")?;

            let finished: BTreeSet<u64> = jobs
                .iter()
                .filter(|job| job.status.is_finished())
                .map(|job| job.id)
                .collect();

            if finished.is_empty() {
                return Ok(0);
            }

            debug!("Fetching detail for {} finished job(s)", finished.len());
            self.service
                .query_status(&finished, true)
                .await
                .context("Failed to query finished job detail")?
        } else {
            self.service
                .query_status(&job_ids, true)
                .await
                .context("Failed to query job status")?
        };

        Ok(self.resolve_jobs(&jobs)?)
    }

    /// Settles futures for every finished agenda entry
    ///
    /// An entry leaves the registry only once its future is settled.
    fn resolve_jobs(&mut self, jobs: &[JobRecord]) -> Result<usize, FutureError> {
        let mut resolved = 0;

        for job in jobs {
            for (position, item) in job.agenda.iter().enumerate() {
                if !item.status.is_finished() {
                    continue;
                }

                let key = WorkKey::new(job.id, position as u64);
                let Some(future) = self.registry.get(&key) else {
                    continue;
                };

                self.backoff.reset();
                settle(&future, item.status, item.result_package.as_deref())?;
                self.registry.remove(&key);
                resolved += 1;

                debug!("Resolved future {} ({})", key, item.status);
            }
        }

        Ok(resolved)
    }
}

/// Applies a packed result package to a future
fn settle(future: &RemoteFuture, status: Status, payload: Option<&str>) -> Result<(), FutureError> {
    let package = match payload.map(pack::unpack::<ResultPackage>) {
        Some(Ok(package)) => package,
        Some(Err(e)) => {
            return future.set_failure(JobFailure::MalformedResult(e.to_string()));
        }
        None => {
            return future.set_failure(JobFailure::MalformedResult(format!(
                "work item is {} but has no result package",
                status
            )));
        }
    };

    match package {
        ResultPackage {
            result: Some(value),
            ..
        } => future.set_result(value),
        ResultPackage {
            exception: Some(error),
            ..
        } => future.set_failure(JobFailure::Remote(error)),
        _ => future.set_failure(JobFailure::MalformedResult(
            "neither result nor exception present".to_string(),
        )),
    }
}
