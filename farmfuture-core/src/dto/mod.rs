//! Data transfer objects
//!
//! Request and response bodies exchanged with the remote job service.

pub mod job;
