//! Work and result packages
//!
//! A work package travels in two phases. [`PackedWorkPackage`] keeps the
//! callable and preflight names readable while the arguments stay packed,
//! because unpacking them may depend on an environment that only the
//! preflight hook can prepare. [`WorkPackage`] is the decoded form.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::domain::error::RemoteError;
use crate::domain::status::Status;
use crate::pack::{self, PackError};

/// Fully decoded work package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkPackage {
    /// Name of the target callable
    pub func: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    /// Name of a hook to run against the packed package before unpacking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preflight: Option<String>,
}

impl WorkPackage {
    pub fn new(func: impl Into<String>) -> Self {
        Self {
            func: func.into(),
            args: Vec::new(),
            kwargs: Map::new(),
            preflight: None,
        }
    }

    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    pub fn with_preflight(mut self, preflight: impl Into<String>) -> Self {
        self.preflight = Some(preflight.into());
        self
    }

    /// Packs the arguments, leaving names readable
    pub fn pack(&self) -> Result<PackedWorkPackage, PackError> {
        let body = pack::pack(&Arguments {
            args: self.args.clone(),
            kwargs: self.kwargs.clone(),
        })?;

        Ok(PackedWorkPackage {
            func: self.func.clone(),
            preflight: self.preflight.clone(),
            program: None,
            environment: BTreeMap::new(),
            body,
        })
    }
}

/// Work package whose arguments are still packed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedWorkPackage {
    pub func: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preflight: Option<String>,
    /// Sandbox executable to launch instead of the worker's default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    /// Variables a preflight may export before the body is unpacked
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    /// Packed positional and keyword arguments
    pub body: String,
}

impl PackedWorkPackage {
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    /// Second phase: decodes the arguments
    pub fn unpack(&self) -> Result<WorkPackage, PackError> {
        let arguments: Arguments = pack::unpack(&self.body)?;
        Ok(WorkPackage {
            func: self.func.clone(),
            args: arguments.args,
            kwargs: arguments.kwargs,
            preflight: self.preflight.clone(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Arguments {
    #[serde(default)]
    args: Vec<Value>,
    #[serde(default)]
    kwargs: Map<String, Value>,
}

/// Outcome of executing one work item
///
/// Exactly one of `result` or `exception` is set by well-behaved
/// producers. A `result` of JSON `null` is a real result, distinct from
/// an absent key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultPackage {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<RemoteError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl ResultPackage {
    pub fn complete(result: Value) -> Self {
        Self {
            result: Some(result),
            exception: None,
            status: Some(Status::Complete),
        }
    }

    pub fn failed(exception: RemoteError) -> Self {
        Self {
            result: None,
            exception: Some(exception),
            status: Some(Status::Failed),
        }
    }

    /// Reported status, `failed` when the producer did not set one
    pub fn status_or_failed(&self) -> Status {
        self.status.unwrap_or(Status::Failed)
    }
}

/// Maps a present key to `Some`, even when its value is `null`
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
