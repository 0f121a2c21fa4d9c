//! Supervisor/sandbox pipe protocol
//!
//! The supervisor creates two pipes, launches the sandbox with the
//! child's ends as its arguments (`sandbox <request-fd> <response-fd>`)
//! and keeps only its own ends. The request pipe carries the job metadata
//! then the packed work package; the response pipe carries one result
//! package. Every descriptor is owned, so each exit path closes it.

use farmfuture_core::domain::{JobMetadata, PackedWorkPackage, RemoteError, ResultPackage};
use farmfuture_core::pack::{self, PackError, ValueReader};
use nix::fcntl::{FcntlArg, FdFlag, fcntl};
use nix::unistd;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to set up pipe: {0}")]
    Pipe(#[from] nix::Error),

    #[error("descriptor {0} is not open")]
    BadDescriptor(RawFd),

    #[error("failed to send request: {0}")]
    Send(#[source] PackError),

    #[error("failed to receive: {0}")]
    Receive(#[source] PackError),
}

impl ProtocolError {
    pub fn to_remote(&self) -> RemoteError {
        RemoteError::new("ProtocolError", self.to_string())
    }
}

/// How to launch a sandbox process
#[derive(Debug, Clone)]
pub struct SandboxLauncher {
    program: PathBuf,
    args: Vec<String>,
}

impl SandboxLauncher {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Launches sandboxes through the running executable
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?))
    }

    /// Arguments placed before the `sandbox` subcommand
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    fn command(&self, program: Option<&str>, request_fd: RawFd, response_fd: RawFd) -> Command {
        let mut command = match program {
            Some(program) => Command::new(program),
            None => Command::new(&self.program),
        };
        command
            .args(&self.args)
            .arg("sandbox")
            .arg(request_fd.to_string())
            .arg(response_fd.to_string());
        command
    }
}

/// Both pipes, before the sandbox is launched
struct SandboxPipes {
    request_read: OwnedFd,
    request_write: OwnedFd,
    response_read: OwnedFd,
    response_write: OwnedFd,
}

impl SandboxPipes {
    fn new() -> Result<Self, ProtocolError> {
        let (request_read, request_write) = unistd::pipe()?;
        let (response_read, response_write) = unistd::pipe()?;

        // Only the child's ends may survive exec.
        set_cloexec(request_write.as_raw_fd())?;
        set_cloexec(response_read.as_raw_fd())?;

        Ok(Self {
            request_read,
            request_write,
            response_read,
            response_write,
        })
    }

    fn child_fds(&self) -> (RawFd, RawFd) {
        (
            self.request_read.as_raw_fd(),
            self.response_write.as_raw_fd(),
        )
    }

    /// Closes the child's ends, leaving the child the only holder
    fn into_parent_ends(self) -> (File, File) {
        drop(self.request_read);
        drop(self.response_write);
        (File::from(self.request_write), File::from(self.response_read))
    }
}

fn set_cloexec(fd: RawFd) -> Result<(), ProtocolError> {
    fcntl(fd, FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))?;
    Ok(())
}

/// Runs one work package in a fresh sandbox and returns its result
///
/// Never fails: launch, transport and decode problems become a `failed`
/// result package. The child is always reaped once it was spawned.
pub fn run_sandbox(
    launcher: &SandboxLauncher,
    job: &JobMetadata,
    package: &PackedWorkPackage,
) -> ResultPackage {
    let pipes = match SandboxPipes::new() {
        Ok(pipes) => pipes,
        Err(e) => return ResultPackage::failed(e.to_remote()),
    };

    let (request_fd, response_fd) = pipes.child_fds();
    let mut command = launcher.command(package.program.as_deref(), request_fd, response_fd);
    info!("Spawning sandbox: {:?}", command);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("Failed to spawn sandbox: {}", e);
            return ResultPackage::failed(RemoteError::new(
                "SpawnError",
                format!("failed to spawn sandbox: {}", e),
            ));
        }
    };

    let (request, response) = pipes.into_parent_ends();

    let package = match exchange(request, response, job, package) {
        Ok(package) => package,
        Err(e) => {
            warn!("Sandbox exchange failed: {}", e);
            ResultPackage::failed(e.to_remote())
        }
    };

    match child.wait() {
        Ok(status) => debug!("Sandbox exited with {}", status),
        Err(e) => warn!("Failed to wait for sandbox: {}", e),
    }

    package
}

/// Sends the request and reads the single response
fn exchange(
    request: File,
    response: File,
    job: &JobMetadata,
    package: &PackedWorkPackage,
) -> Result<ResultPackage, ProtocolError> {
    send_request(request, job, package)?;

    let mut reader = ValueReader::new(BufReader::new(response));
    reader.read().map_err(ProtocolError::Receive)
}

fn send_request(
    request: File,
    job: &JobMetadata,
    package: &PackedWorkPackage,
) -> Result<(), ProtocolError> {
    let mut writer = BufWriter::new(request);
    pack::write_value(&mut writer, job).map_err(ProtocolError::Send)?;
    pack::write_value(&mut writer, package).map_err(ProtocolError::Send)?;
    writer
        .flush()
        .map_err(|e| ProtocolError::Send(PackError::Io(e)))?;
    Ok(())
}

/// Reads the sandbox's request: job metadata, then the packed package
pub fn read_request<R: Read>(
    request: R,
) -> Result<(JobMetadata, PackedWorkPackage), ProtocolError> {
    let mut reader = ValueReader::new(BufReader::new(request));
    let job = reader.read().map_err(ProtocolError::Receive)?;
    let package = reader.read().map_err(ProtocolError::Receive)?;
    Ok((job, package))
}

/// Writes the sandbox's response and flushes it
pub fn write_response<W: Write>(response: W, package: &ResultPackage) -> Result<(), ProtocolError> {
    let mut writer = BufWriter::new(response);
    pack::write_value(&mut writer, package).map_err(ProtocolError::Send)?;
    writer
        .flush()
        .map_err(|e| ProtocolError::Send(PackError::Io(e)))?;
    Ok(())
}

/// Takes ownership of the descriptors passed on the sandbox command line
pub fn open_pipes(request_fd: RawFd, response_fd: RawFd) -> Result<(File, File), ProtocolError> {
    for fd in [request_fd, response_fd] {
        if fd < 0 || fcntl(fd, FcntlArg::F_GETFD).is_err() {
            return Err(ProtocolError::BadDescriptor(fd));
        }
        // Keep them away from anything the work itself spawns.
        set_cloexec(fd)?;
    }

    // SAFETY: both descriptors were verified open above and were handed
    // to this process for its exclusive use; nothing else wraps them.
    let (request, response) =
        unsafe { (File::from_raw_fd(request_fd), File::from_raw_fd(response_fd)) };
    Ok((request, response))
}
