//! Remote futures
//!
//! A [`RemoteFuture`] is a cheap, cloneable handle to a result cell that is
//! assigned exactly once. Every clone observes the same transition. The
//! resolver only keeps a [`WeakFuture`], so a future nobody holds anymore
//! is freed even while it is still pending.

use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::sync::watch;

use crate::error::{FutureError, JobFailure};

/// Identity of a future: job id plus the work item's agenda position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkKey {
    pub job_id: u64,
    pub work_id: u64,
}

impl WorkKey {
    pub fn new(job_id: u64, work_id: u64) -> Self {
        Self { job_id, work_id }
    }
}

impl std::fmt::Display for WorkKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.job_id, self.work_id)
    }
}

/// State of a future
#[derive(Debug, Clone, PartialEq)]
pub enum FutureState {
    Pending,
    Fulfilled(Value),
    Failed(JobFailure),
}

impl FutureState {
    pub fn is_pending(&self) -> bool {
        matches!(self, FutureState::Pending)
    }

    fn outcome(&self) -> Option<Result<Value, JobFailure>> {
        match self {
            FutureState::Pending => None,
            FutureState::Fulfilled(value) => Some(Ok(value.clone())),
            FutureState::Failed(failure) => Some(Err(failure.clone())),
        }
    }
}

/// Handle to the eventual result of one remote work item
#[derive(Debug, Clone)]
pub struct RemoteFuture {
    key: WorkKey,
    cell: Arc<watch::Sender<FutureState>>,
}

impl RemoteFuture {
    /// Creates a pending future for `(job_id, work_id)`
    pub fn new(job_id: u64, work_id: u64) -> Self {
        let (cell, _) = watch::channel(FutureState::Pending);
        Self {
            key: WorkKey::new(job_id, work_id),
            cell: Arc::new(cell),
        }
    }

    pub fn key(&self) -> WorkKey {
        self.key
    }

    pub fn job_id(&self) -> u64 {
        self.key.job_id
    }

    pub fn work_id(&self) -> u64 {
        self.key.work_id
    }

    /// Snapshot of the current state
    pub fn state(&self) -> FutureState {
        self.cell.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.cell.borrow().is_pending()
    }

    /// Outcome if resolved, without waiting
    pub fn try_result(&self) -> Option<Result<Value, JobFailure>> {
        self.cell.borrow().outcome()
    }

    /// Waits until the future leaves the pending state
    pub async fn wait(&self) -> Result<Value, JobFailure> {
        let mut receiver = self.cell.subscribe();
        match receiver.wait_for(|state| !state.is_pending()).await {
            Ok(state) => match state.outcome() {
                Some(outcome) => outcome,
                None => Err(JobFailure::ResolverFailed),
            },
            // The sender lives as long as `self`, so the channel cannot close.
            Err(_) => Err(JobFailure::ResolverFailed),
        }
    }

    /// Fulfills the future; fails if it is already resolved
    pub fn set_result(&self, value: Value) -> Result<(), FutureError> {
        self.resolve(FutureState::Fulfilled(value))
    }

    /// Fails the future; fails if it is already resolved
    pub fn set_failure(&self, failure: JobFailure) -> Result<(), FutureError> {
        self.resolve(FutureState::Failed(failure))
    }

    fn resolve(&self, next: FutureState) -> Result<(), FutureError> {
        let mut accepted = false;
        self.cell.send_if_modified(|state| {
            if state.is_pending() {
                *state = next;
                accepted = true;
            }
            accepted
        });

        if accepted {
            Ok(())
        } else {
            Err(FutureError::AlreadyResolved {
                job_id: self.key.job_id,
                work_id: self.key.work_id,
            })
        }
    }

    pub(crate) fn downgrade(&self) -> WeakFuture {
        WeakFuture {
            key: self.key,
            cell: Arc::downgrade(&self.cell),
        }
    }
}

/// Non-owning handle held by the resolver
#[derive(Debug, Clone)]
pub(crate) struct WeakFuture {
    key: WorkKey,
    cell: Weak<watch::Sender<FutureState>>,
}

impl WeakFuture {
    pub(crate) fn upgrade(&self) -> Option<RemoteFuture> {
        self.cell.upgrade().map(|cell| RemoteFuture {
            key: self.key,
            cell,
        })
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.cell.strong_count() > 0
    }
}
