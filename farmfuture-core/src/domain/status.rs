//! Job and work item status

use serde::{Deserialize, Serialize};

/// Status of a job or of a single work item (agenda entry)
///
/// The remote service owns these values; this system only reads them,
/// except for the terminal status the supervisor reports for its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Complete,
    Failed,
    Pending,
    Blocked,
    Waiting,
    Running,
    /// Any status this system does not act on specially
    #[serde(other)]
    Other,
}

impl Status {
    /// Whether the work has finished, successfully or not
    pub fn is_finished(&self) -> bool {
        matches!(self, Status::Complete | Status::Failed)
    }

    /// Whether a worker handed this status has nothing left to do
    ///
    /// `complete` means no more items, `pending` means the worker was
    /// preempted, `blocked` usually means a dependency is unmet.
    pub fn ends_worker(&self) -> bool {
        matches!(self, Status::Complete | Status::Pending | Status::Blocked)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Status::Complete => "complete",
            Status::Failed => "failed",
            Status::Pending => "pending",
            Status::Blocked => "blocked",
            Status::Waiting => "waiting",
            Status::Running => "running",
            Status::Other => "other",
        };
        write!(f, "{}", name)
    }
}
