//! Job DTOs for communication with the remote service

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::package::PackedWorkPackage;
use crate::domain::status::Status;

/// Request to submit a new job; one agenda entry per package
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSubmission {
    pub name: String,
    pub agenda: Vec<PackedWorkPackage>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
}

/// Response to a job submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedJob {
    pub id: u64,
}

/// Final job status reported by a worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportJobRequest {
    pub status: Status,
}
