//! Failure values carried across process boundaries

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure raised while executing work, in transportable form
///
/// Built by the sandbox when preflight, unpacking or the target callable
/// fails, and by the supervisor when the exchange with the sandbox breaks.
/// The resolver hands it to the waiting future unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    /// Short classification, e.g. `CallableError` or `ProtocolError`
    pub kind: String,
    /// Human readable message
    pub message: String,
    /// Causes, outermost first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chain: Vec<String>,
}

impl RemoteError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            chain: Vec::new(),
        }
    }

    /// Captures an `anyhow` error including its cause chain
    pub fn from_anyhow(kind: impl Into<String>, error: &anyhow::Error) -> Self {
        Self {
            kind: kind.into(),
            message: error.to_string(),
            chain: error.chain().skip(1).map(|cause| cause.to_string()).collect(),
        }
    }
}
