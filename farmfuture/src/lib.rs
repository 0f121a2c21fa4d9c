//! Farmfuture
//!
//! Futures for work executed on a remote, poll-based job farm.
//!
//! Architecture:
//! - Future: single-assignment result cell shared by all of its holders
//! - Resolver: one background loop per process that batches status
//!   queries for every outstanding future and completes them
//! - Executor: submits work to the farm and hands back futures
//!
//! Callers never poll the farm themselves. They submit work, keep the
//! returned [`RemoteFuture`] and await it; dropping every handle to a
//! future is enough for the resolver to forget it.

pub mod config;
pub mod error;
pub mod executor;
pub mod future;
pub mod resolver;

#[cfg(test)]
mod test_support;

pub use config::{ExecutorConfig, ResolverConfig};
pub use error::{FutureError, JobFailure};
pub use executor::Executor;
pub use future::{FutureState, RemoteFuture, WorkKey};
pub use resolver::{Resolver, ResolverGuard};
