//! Error types for futures and the resolver

use farmfuture_core::domain::RemoteError;
use thiserror::Error;

/// Failure value stored in a future that did not produce a result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobFailure {
    /// The work raised, or the worker could not run it
    #[error("remote work failed: {0}")]
    Remote(RemoteError),

    /// The future was submitted after the resolver stopped
    #[error("farmfuture resolver shut down")]
    ResolverShutdown,

    /// The resolver loop died while the future was outstanding
    #[error("farmfuture resolver failed")]
    ResolverFailed,

    /// The farm reported the item finished but its result was unusable
    #[error("malformed result package: {0}")]
    MalformedResult(String),
}

/// Misuse of a future's single-assignment contract
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FutureError {
    #[error("future for job {job_id} item {work_id} is already resolved")]
    AlreadyResolved { job_id: u64, work_id: u64 },
}
