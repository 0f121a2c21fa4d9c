//! Core domain types
//!
//! These types mirror the records held by the remote job service and the
//! packages exchanged between the supervisor and its sandbox child.

pub mod error;
pub mod job;
pub mod package;
pub mod status;

pub use error::RemoteError;
pub use job::{JobMetadata, JobRecord, WorkItem};
pub use package::{PackedWorkPackage, ResultPackage, WorkPackage};
pub use status::Status;
