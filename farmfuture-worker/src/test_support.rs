//! Scripted farm service shared by unit and integration tests

use async_trait::async_trait;
use farmfuture_client::{ClientError, FarmService};
use farmfuture_core::domain::{JobRecord, Status, WorkItem};
use serde_json::Map;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Farm that hands out a fixed sequence of work items and records reports
pub struct ScriptedFarm {
    job: JobRecord,
    items: Mutex<VecDeque<WorkItem>>,
    requests: AtomicUsize,
    job_reports: Mutex<Vec<Status>>,
    work_reports: Mutex<Vec<WorkItem>>,
}

impl ScriptedFarm {
    pub fn new(items: Vec<WorkItem>) -> Self {
        Self {
            job: JobRecord {
                id: 42,
                name: Some("scripted".to_string()),
                status: Status::Running,
                agenda: items.clone(),
                attributes: Map::new(),
            },
            items: Mutex::new(items.into()),
            requests: AtomicUsize::new(0),
            job_reports: Mutex::new(Vec::new()),
            work_reports: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn job_reports(&self) -> Vec<Status> {
        self.job_reports.lock().unwrap().clone()
    }

    pub fn work_reports(&self) -> Vec<WorkItem> {
        self.work_reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl FarmService for ScriptedFarm {
    async fn job_object(&self) -> farmfuture_client::Result<JobRecord> {
        Ok(self.job.clone())
    }

    async fn request_work(&self) -> farmfuture_client::Result<WorkItem> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.items
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ClientError::api_error(404, "no scripted work left"))
    }

    async fn report_job(&self, status: Status) -> farmfuture_client::Result<()> {
        self.job_reports.lock().unwrap().push(status);
        Ok(())
    }

    async fn report_work(&self, item: &WorkItem) -> farmfuture_client::Result<()> {
        self.work_reports.lock().unwrap().push(item.clone());
        Ok(())
    }
}
