//! Farmfuture Worker
//!
//! The farm side of farmfuture: a supervisor that pulls work items for
//! one job and runs each of them in an isolated sandbox process.
//!
//! Architecture:
//! - Configuration: settings from the environment and the command line
//! - Supervisor: work request loop and result reporting
//! - Protocol: pipes between supervisor and sandbox
//! - Sandbox: child entry point that runs the target callable
//!
//! Callables are compiled in. A custom worker binary builds a
//! [`Registry`](farmfuture_core::callable::Registry), optionally adds the
//! [`builtins`], and hands it to [`main_with_registry`].

pub mod builtins;
pub mod cli;
pub mod config;
pub mod protocol;
pub mod sandbox;
pub mod supervisor;

#[cfg(test)]
mod test_support;

pub use cli::main_with_registry;
pub use config::WorkerConfig;
pub use protocol::SandboxLauncher;
pub use supervisor::Supervisor;
