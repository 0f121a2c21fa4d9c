//! Farmfuture Core
//!
//! Core types and abstractions shared by the submitting side (futures and
//! resolver) and the farm side (supervisor and sandbox).
//!
//! This crate contains:
//! - Domain types: jobs, work items, work and result packages
//! - DTOs: request bodies exchanged with the remote job service
//! - The pack/unpack codec used for every payload that crosses a boundary
//! - The named callable registry the sandbox resolves work against

pub mod callable;
pub mod domain;
pub mod dto;
pub mod pack;
