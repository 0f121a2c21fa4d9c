//! Sandbox entry point
//!
//! Runs in the child process launched by the supervisor. Reads the job
//! metadata and packed work package, runs the preflight hook against the
//! packed form, unpacks, calls the target and sends back one result
//! package. Every failure along the way, panics included, becomes a
//! `failed` result package.
//!
//! Once the result is flushed the process exits immediately, skipping
//! destructors and exit handlers that work code may have left in an
//! unusable state.

use farmfuture_core::callable::Registry;
use farmfuture_core::domain::{PackedWorkPackage, RemoteError, ResultPackage};
use serde_json::Value;
use std::any::Any;
use std::io::{Read, Write};
use std::os::fd::RawFd;
use std::panic::{self, AssertUnwindSafe};
use tracing::{error, info};

use crate::protocol::{self, ProtocolError};

/// Serves one request and terminates the process
pub fn run(registry: &Registry, request_fd: RawFd, response_fd: RawFd) -> ! {
    let code = match serve(registry, request_fd, response_fd) {
        Ok(()) => 0,
        Err(e) => {
            error!("Sandbox could not deliver its result: {}", e);
            1
        }
    };

    info!("Sandbox shutting down");
    terminate(code)
}

fn serve(registry: &Registry, request_fd: RawFd, response_fd: RawFd) -> Result<(), ProtocolError> {
    let (request, response) = protocol::open_pipes(request_fd, response_fd)?;

    let package = execute(registry, request);

    info!("Sending result package ({})", package.status_or_failed());
    protocol::write_response(response, &package)
}

/// Executes the request read from `request`; never fails
pub fn execute<R: Read>(registry: &Registry, request: R) -> ResultPackage {
    match run_request(registry, request) {
        Ok(value) => ResultPackage::complete(value),
        Err(e) => {
            error!("Work failed: {}", e);
            ResultPackage::failed(e)
        }
    }
}

fn run_request<R: Read>(registry: &Registry, request: R) -> Result<Value, RemoteError> {
    // The package stays packed until preflight has prepared the process.
    let (job, packed) = protocol::read_request(request).map_err(|e| e.to_remote())?;
    info!("Received work for job {} ({})", job.id, packed.func);

    if let Some(name) = &packed.preflight {
        info!("Running preflight {}", name);
        run_preflight(registry, name, &packed)?;
    }

    let package = packed
        .unpack()
        .map_err(|e| RemoteError::new("UnpackError", e.to_string()))?;

    let callable = registry
        .resolve_callable(&package.func)
        .map_err(|e| RemoteError::new("ResolveError", e.to_string()))?;

    info!("Calling {}({})", package.func, describe_arguments(&package.args, &package.kwargs));

    match panic::catch_unwind(AssertUnwindSafe(|| callable(&package.args, &package.kwargs))) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(RemoteError::from_anyhow("CallableError", &e)),
        Err(payload) => Err(RemoteError::new("Panic", panic_message(payload.as_ref()))),
    }
}

fn run_preflight(
    registry: &Registry,
    name: &str,
    packed: &PackedWorkPackage,
) -> Result<(), RemoteError> {
    let preflight = registry
        .resolve_preflight(name)
        .map_err(|e| RemoteError::new("ResolveError", e.to_string()))?;

    match panic::catch_unwind(AssertUnwindSafe(|| preflight(packed))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(RemoteError::from_anyhow("PreflightError", &e)),
        Err(payload) => Err(RemoteError::new("Panic", panic_message(payload.as_ref()))),
    }
}

fn describe_arguments(args: &[Value], kwargs: &serde_json::Map<String, Value>) -> String {
    args.iter()
        .map(Value::to_string)
        .chain(kwargs.iter().map(|(key, value)| format!("{}={}", key, value)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "callable panicked".to_string()
    }
}

/// Exits without running destructors or exit handlers
fn terminate(code: i32) -> ! {
    let _ = std::io::stdout().flush();
    let _ = std::io::stderr().flush();

    // SAFETY: `_exit` only ends the process. The response pipe was
    // flushed and closed by `serve` before this point.
    unsafe { libc::_exit(code) }
}
