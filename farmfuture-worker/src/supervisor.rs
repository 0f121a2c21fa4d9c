//! Execution supervisor
//!
//! The farm starts one supervisor per worker slot. It pulls work items
//! for its job until the farm signals there is nothing left, runs each
//! one in a fresh sandbox process and reports the outcome.

use anyhow::{Context, Result};
use farmfuture_client::FarmService;
use farmfuture_core::domain::{JobMetadata, RemoteError, ResultPackage, Status, WorkItem};
use farmfuture_core::pack;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::protocol::{self, SandboxLauncher};

/// Work loop for one worker slot
pub struct Supervisor {
    service: Arc<dyn FarmService>,
    launcher: SandboxLauncher,
    waiting_interval: Duration,
}

impl Supervisor {
    pub fn new(
        service: Arc<dyn FarmService>,
        launcher: SandboxLauncher,
        waiting_interval: Duration,
    ) -> Self {
        Self {
            service,
            launcher,
            waiting_interval,
        }
    }

    /// Runs until the farm hands out a terminal status
    ///
    /// Returns the status reported for the job. Errors come only from the
    /// farm service itself; failures of individual work items are
    /// reported and the loop continues.
    pub async fn run(&self) -> Result<Status> {
        let job = self
            .service
            .job_object()
            .await
            .context("Failed to fetch job object")?;

        info!("Received job {}", job.id);

        // The sandbox does not need its siblings' data.
        let metadata = job.metadata();

        loop {
            let mut item = self
                .service
                .request_work()
                .await
                .context("Failed to request work")?;

            info!("Received work '{}' ({})", item.name, item.status);

            if item.status.ends_worker() {
                info!("Reporting job as {}", item.status);
                self.service
                    .report_job(item.status)
                    .await
                    .context("Failed to report job status")?;
                info!("Worker shutting down");
                return Ok(item.status);
            }

            if item.status == Status::Waiting {
                info!(
                    "Job {} is waiting, asking again in {:?}",
                    metadata.id, self.waiting_interval
                );
                tokio::time::sleep(self.waiting_interval).await;
                continue;
            }

            let package = self.execute(&metadata, &item).await;
            let status = package.status_or_failed();
            let package = ResultPackage {
                status: Some(status),
                ..package
            };

            item.result_package =
                Some(pack::pack(&package).context("Failed to pack result package")?);
            item.status = status;

            if status == Status::Failed {
                if let Some(exception) = &package.exception {
                    warn!("Work '{}' failed: {}", item.name, exception);
                }
                log_environment();
            }

            info!("Reporting work '{}' as {}", item.name, status);
            self.service
                .report_work(&item)
                .await
                .context("Failed to report work")?;
        }
    }

    /// Runs one work item in a sandbox; never fails
    async fn execute(&self, job: &JobMetadata, item: &WorkItem) -> ResultPackage {
        let Some(package) = item.package.clone() else {
            return ResultPackage::failed(RemoteError::new(
                "MissingPackage",
                format!("work item '{}' has no package", item.name),
            ));
        };

        info!(
            "Work package: func={} preflight={}",
            package.func,
            package.preflight.as_deref().unwrap_or("-")
        );

        let launcher = self.launcher.clone();
        let job = job.clone();
        let handle = tokio::task::spawn_blocking(move || {
            protocol::run_sandbox(&launcher, &job, &package)
        });

        match handle.await {
            Ok(package) => package,
            Err(e) => ResultPackage::failed(RemoteError::new(
                "SupervisorError",
                format!("sandbox task failed: {}", e),
            )),
        }
    }
}

fn log_environment() {
    let mut vars: Vec<(String, String)> = std::env::vars().collect();
    vars.sort();
    for (key, value) in vars {
        debug!("env {} = {:?}", key, value);
    }
}
