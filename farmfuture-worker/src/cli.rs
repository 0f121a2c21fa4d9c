//! Command line entry point
//!
//! Shared by the stock worker binary and by custom worker binaries that
//! register their own callables.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use farmfuture_client::{FarmClient, FarmService, WorkerSession};
use farmfuture_core::callable::Registry;
use std::os::fd::RawFd;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::WorkerConfig;
use crate::protocol::SandboxLauncher;
use crate::sandbox;
use crate::supervisor::Supervisor;

#[derive(Parser)]
#[command(name = "farmfuture-worker")]
#[command(about = "Farm-side worker for farmfuture jobs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull and execute work items for one job until none are left
    Supervise {
        /// Job service URL
        #[arg(long, env = "FARMFUTURE_URL")]
        url: String,

        /// Job to serve
        #[arg(long, env = "FARMFUTURE_JOB_ID")]
        job_id: u64,
    },

    /// Execute a single work package received over inherited pipes
    #[command(hide = true)]
    Sandbox {
        /// Descriptor to read the request from
        request_fd: RawFd,

        /// Descriptor to write the result package to
        response_fd: RawFd,
    },
}

/// Parses the command line and runs the chosen subcommand
pub fn main_with_registry(registry: Registry) -> Result<()> {
    init_logging();

    match Cli::parse().command {
        Commands::Supervise { url, job_id } => {
            let config = load_config(url, job_id)?;
            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(supervise(config))
        }
        // No runtime here: the sandbox stays single threaded.
        Commands::Sandbox {
            request_fd,
            response_fd,
        } => sandbox::run(&registry, request_fd, response_fd),
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "farmfuture_worker=info,farmfuture=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(url: String, job_id: u64) -> Result<WorkerConfig> {
    let config = WorkerConfig::new(url, job_id).with_optional_env();
    config.validate()?;
    Ok(config)
}

async fn supervise(config: WorkerConfig) -> Result<()> {
    info!(
        "Starting supervisor: job_id={}, service_url={}",
        config.job_id, config.service_url
    );

    let launcher = match &config.sandbox_program {
        Some(program) => SandboxLauncher::new(program),
        None => SandboxLauncher::current_exe().context("Failed to locate worker executable")?,
    };

    let session = WorkerSession::new(FarmClient::new(config.service_url.clone()), config.job_id);
    let service: Arc<dyn FarmService> = Arc::new(session);

    let supervisor = Supervisor::new(service, launcher, config.waiting_interval);
    match supervisor.run().await {
        Ok(status) => {
            info!("Job {} finished as {}", config.job_id, status);
            Ok(())
        }
        Err(e) => {
            error!("Supervisor error: {:#}", e);
            Err(e)
        }
    }
}
