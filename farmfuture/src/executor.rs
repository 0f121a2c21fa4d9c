//! Work submission
//!
//! The executor turns work packages into a farm job and returns one
//! future per agenda entry, already handed to the resolver.

use anyhow::{Context, Result};
use farmfuture_client::JobService;
use farmfuture_core::domain::WorkPackage;
use farmfuture_core::dto::job::JobSubmission;
use std::sync::Arc;
use tracing::info;

use crate::config::ExecutorConfig;
use crate::future::RemoteFuture;
use crate::resolver::Resolver;

/// Submits work to the farm
#[derive(Clone)]
pub struct Executor {
    service: Arc<dyn JobService>,
    resolver: Resolver,
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(service: Arc<dyn JobService>, resolver: Resolver, config: ExecutorConfig) -> Self {
        Self {
            service,
            resolver,
            config,
        }
    }

    /// Submits a single work item as its own job
    pub async fn submit(&self, package: WorkPackage) -> Result<RemoteFuture> {
        let mut futures = self.submit_batch(vec![package]).await?;
        futures
            .pop()
            .context("job submission produced no futures")
    }

    /// Submits one job with an agenda entry per package
    ///
    /// Futures are returned in package order.
    pub async fn submit_batch(&self, packages: Vec<WorkPackage>) -> Result<Vec<RemoteFuture>> {
        let Some(first) = packages.first() else {
            anyhow::bail!("cannot submit an empty batch");
        };

        let name = self
            .config
            .job_name
            .clone()
            .unwrap_or_else(|| first.func.clone());

        let agenda = packages
            .iter()
            .map(WorkPackage::pack)
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to pack work package")?;

        let count = agenda.len();
        let job_id = self
            .service
            .submit_job(JobSubmission {
                name: name.clone(),
                agenda,
                attributes: self.config.attributes.clone(),
            })
            .await
            .context("Failed to submit job")?;

        info!("Submitted job {} '{}' with {} item(s)", job_id, name, count);

        let futures: Vec<RemoteFuture> = (0..count as u64)
            .map(|work_id| RemoteFuture::new(job_id, work_id))
            .collect();

        for future in &futures {
            self.resolver.submit(future.clone());
        }
        self.resolver.wake();

        Ok(futures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolverConfig;
    use crate::test_support::*;
    use farmfuture_core::domain::Status;
    use serde_json::json;
    use std::time::Duration;

    fn executor(service: &Arc<ScriptedJobService>, config: ExecutorConfig) -> Executor {
        let service: Arc<dyn JobService> = service.clone();
        let resolver = Resolver::new(
            Arc::clone(&service),
            ResolverConfig::default()
                .with_delays(Duration::from_millis(5), Duration::from_millis(20)),
        )
        .unwrap();
        Executor::new(service, resolver, config)
    }

    #[tokio::test]
    async fn test_submit_batch_creates_one_job() {
        let service = Arc::new(ScriptedJobService::new());
        service.answer_detailed(vec![job(
            101,
            Status::Complete,
            vec![completed(0, json!(1)), completed(1, json!(4))],
        )]);

        let executor = executor(&service, ExecutorConfig::default());
        let futures = executor
            .submit_batch(vec![
                WorkPackage::new("math.square").with_args(vec![json!(1)]),
                WorkPackage::new("math.square").with_args(vec![json!(2)]),
            ])
            .await
            .unwrap();

        let submissions = service.submissions();
        assert_eq!(submissions.len(), 1);
        assert_eq!(submissions[0].name, "math.square");
        assert_eq!(submissions[0].agenda.len(), 2);

        assert_eq!(futures[0].key().job_id, 101);
        assert_eq!(futures[1].work_id(), 1);

        for (future, expected) in futures.iter().zip([json!(1), json!(4)]) {
            let value = tokio::time::timeout(Duration::from_secs(5), future.wait())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(value, expected);
        }

        executor.resolver.shutdown();
        executor.resolver.join().unwrap();
    }

    #[tokio::test]
    async fn test_job_name_and_attributes_from_config() {
        let service = Arc::new(ScriptedJobService::new());
        let config = ExecutorConfig::default()
            .with_job_name("nightly")
            .with_attribute("priority", json!(10));

        let executor = executor(&service, config);
        let future = executor.submit(WorkPackage::new("noop")).await.unwrap();
        assert_eq!(future.work_id(), 0);

        let submission = &service.submissions()[0];
        assert_eq!(submission.name, "nightly");
        assert_eq!(submission.attributes.get("priority"), Some(&json!(10)));

        executor.resolver.shutdown();
        executor.resolver.join().unwrap();
    }

    #[tokio::test]
    async fn test_empty_batch_rejected() {
        let service = Arc::new(ScriptedJobService::new());
        let executor = executor(&service, ExecutorConfig::default());
        assert!(executor.submit_batch(Vec::new()).await.is_err());
        assert!(service.submissions().is_empty());
    }
}
