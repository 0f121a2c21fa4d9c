//! Shared fixtures for resolver tests

use async_trait::async_trait;
use farmfuture_client::{ClientError, JobService};
use farmfuture_core::domain::{JobRecord, RemoteError, ResultPackage, Status, WorkItem};
use farmfuture_core::dto::job::JobSubmission;
use farmfuture_core::pack;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, VecDeque};
use std::sync::Mutex;

/// One recorded `query_status` call
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub job_ids: BTreeSet<u64>,
    pub include_agenda: bool,
}

/// Job service that replays scripted answers
///
/// Each query pops the next answer; the last answer repeats once the
/// script runs out. Answers are looked up per detail level so two-stage
/// tests can script aggregate and detailed answers separately.
#[derive(Default)]
pub struct ScriptedJobService {
    aggregate: Mutex<VecDeque<Result<Vec<JobRecord>, String>>>,
    detailed: Mutex<VecDeque<Result<Vec<JobRecord>, String>>>,
    queries: Mutex<Vec<Query>>,
    submissions: Mutex<Vec<JobSubmission>>,
}

impl ScriptedJobService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer_detailed(&self, jobs: Vec<JobRecord>) -> &Self {
        self.detailed.lock().unwrap().push_back(Ok(jobs));
        self
    }

    pub fn answer_aggregate(&self, jobs: Vec<JobRecord>) -> &Self {
        self.aggregate.lock().unwrap().push_back(Ok(jobs));
        self
    }

    pub fn fail_detailed(&self, message: &str) -> &Self {
        self.detailed
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn queries(&self) -> Vec<Query> {
        self.queries.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<JobSubmission> {
        self.submissions.lock().unwrap().clone()
    }

    fn next(
        script: &Mutex<VecDeque<Result<Vec<JobRecord>, String>>>,
    ) -> Result<Vec<JobRecord>, ClientError> {
        let mut script = script.lock().unwrap();
        let answer = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        match answer {
            Some(Ok(jobs)) => Ok(jobs),
            Some(Err(message)) => Err(ClientError::api_error(500, message)),
            None => Ok(Vec::new()),
        }
    }
}

#[async_trait]
impl JobService for ScriptedJobService {
    async fn submit_job(&self, submission: JobSubmission) -> farmfuture_client::Result<u64> {
        let mut submissions = self.submissions.lock().unwrap();
        submissions.push(submission);
        Ok(100 + submissions.len() as u64)
    }

    async fn query_status(
        &self,
        job_ids: &BTreeSet<u64>,
        include_agenda: bool,
    ) -> farmfuture_client::Result<Vec<JobRecord>> {
        self.queries.lock().unwrap().push(Query {
            job_ids: job_ids.clone(),
            include_agenda,
        });

        if include_agenda {
            Self::next(&self.detailed)
        } else {
            Self::next(&self.aggregate)
        }
    }
}

/// Job record with the given agenda
pub fn job(id: u64, status: Status, agenda: Vec<WorkItem>) -> JobRecord {
    JobRecord {
        id,
        name: Some(format!("job-{}", id)),
        status,
        agenda,
        attributes: Map::new(),
    }
}

/// Agenda entry with an optional raw result payload
pub fn item(id: u64, status: Status, result_package: Option<String>) -> WorkItem {
    WorkItem {
        id,
        name: id.to_string(),
        status,
        package: None,
        result_package,
    }
}

pub fn completed(id: u64, value: Value) -> WorkItem {
    let package = pack::pack(&ResultPackage::complete(value)).unwrap();
    item(id, Status::Complete, Some(package))
}

pub fn failed(id: u64, error: RemoteError) -> WorkItem {
    let package = pack::pack(&ResultPackage::failed(error)).unwrap();
    item(id, Status::Failed, Some(package))
}

pub fn running(id: u64) -> WorkItem {
    item(id, Status::Running, None)
}
