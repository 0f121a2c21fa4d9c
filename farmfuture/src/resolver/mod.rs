//! Background resolver
//!
//! One resolver per process owns the registry of outstanding futures and
//! polls the farm for them from a dedicated thread. Callers only enqueue
//! futures and wake the loop; neither ever blocks on the loop's work.
//!
//! Shutdown and admission serialize on an admission gate: a submit either
//! lands in the queue before the gate closes, or fails its future with
//! [`JobFailure::ResolverShutdown`]. Whatever is still queued when the
//! loop exits is failed the same way. Futures already tracked are
//! released and left pending.

mod backoff;
mod global;
mod poller;
mod registry;

pub use global::{ResolverGuard, global, install_global};

use anyhow::{Context, Result};
use farmfuture_client::JobService;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use tokio::sync::Notify;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::config::ResolverConfig;
use crate::error::JobFailure;
use crate::future::RemoteFuture;
use poller::Poller;

/// Handle to a resolver; clones share the same loop
#[derive(Clone)]
pub struct Resolver {
    shared: Arc<Shared>,
}

struct Shared {
    service: Arc<dyn JobService>,
    config: ResolverConfig,

    /// Open while the resolver accepts futures
    gate: RwLock<bool>,
    admissions: UnboundedSender<RemoteFuture>,
    /// Taken by the loop thread, or by whoever fails the queue first
    receiver: Mutex<Option<UnboundedReceiver<RemoteFuture>>>,

    wake: Notify,
    reset_delay: AtomicBool,
    running: AtomicBool,
    started: AtomicBool,

    tracked: AtomicUsize,
    failure: Mutex<Option<String>>,
    thread: Mutex<Option<JoinHandle<Result<()>>>>,
}

impl Shared {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn close_gate(&self) {
        *self.gate.write().unwrap() = false;
        self.running.store(false, Ordering::SeqCst);
    }

    fn take_receiver(&self) -> Option<UnboundedReceiver<RemoteFuture>> {
        self.receiver.lock().unwrap().take()
    }
}

impl Resolver {
    /// Creates a stopped resolver; the loop starts on the first [`Resolver::wake`]
    pub fn new(service: Arc<dyn JobService>, config: ResolverConfig) -> Result<Self> {
        config.validate().context("Invalid resolver configuration")?;

        let (admissions, receiver) = mpsc::unbounded_channel();

        Ok(Self {
            shared: Arc::new(Shared {
                service,
                config,
                gate: RwLock::new(true),
                admissions,
                receiver: Mutex::new(Some(receiver)),
                wake: Notify::new(),
                reset_delay: AtomicBool::new(false),
                running: AtomicBool::new(true),
                started: AtomicBool::new(false),
                tracked: AtomicUsize::new(0),
                failure: Mutex::new(None),
                thread: Mutex::new(None),
            }),
        })
    }

    /// Hands a future to the resolver
    ///
    /// Never blocks. After shutdown the future fails immediately.
    pub fn submit(&self, future: RemoteFuture) {
        let open = self.shared.gate.read().unwrap();

        let rejected = if *open {
            match self.shared.admissions.send(future) {
                Ok(()) => return,
                Err(mpsc::error::SendError(future)) => future,
            }
        } else {
            future
        };
        drop(open);

        if rejected.set_failure(JobFailure::ResolverShutdown).is_err() {
            warn!(
                "Future {} submitted after shutdown was already resolved",
                rejected.key()
            );
        }
    }

    /// Asks the loop to poll soon, starting it on first use
    pub fn wake(&self) {
        self.shared.reset_delay.store(true, Ordering::SeqCst);
        self.shared.wake.notify_one();
        self.start();
    }

    /// Stops the loop
    ///
    /// Tracked futures are released; queued ones are failed with
    /// [`JobFailure::ResolverShutdown`]. Does not wait for the loop thread,
    /// see [`Resolver::join`].
    pub fn shutdown(&self) {
        self.shared.close_gate();
        self.shared.wake.notify_one();

        // Never started: nobody else will drain the queue.
        if let Some(receiver) = self.shared.take_receiver() {
            fail_queued(receiver, JobFailure::ResolverShutdown);
        }

        debug!("Resolver shutdown requested");
    }

    /// Waits for the loop thread to exit, returning its fatal error if any
    pub fn join(&self) -> Result<()> {
        let handle = self.shared.thread.lock().unwrap().take();
        match handle {
            Some(handle) => match handle.join() {
                Ok(result) => result,
                Err(_) => anyhow::bail!("resolver thread panicked"),
            },
            None => Ok(()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Number of live futures the loop tracked at the end of its last cycle
    pub fn tracked(&self) -> usize {
        self.shared.tracked.load(Ordering::SeqCst)
    }

    /// The fatal error that stopped the loop, if it died
    pub fn failure(&self) -> Option<String> {
        self.shared.failure.lock().unwrap().clone()
    }

    fn start(&self) {
        if !self.shared.is_running() || self.shared.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let shared = Arc::clone(&self.shared);

        info!(
            "Starting resolver (two-stage polling: {})",
            shared.config.two_stage_polling
        );

        let spawned = std::thread::Builder::new()
            .name("farmfuture-resolver".to_string())
            .spawn(move || {
                // Shutdown may have drained the queue before this thread ran.
                let Some(mut receiver) = shared.take_receiver() else {
                    return Ok(());
                };

                let mut poller = Poller::new(Arc::clone(&shared.service), &shared.config);
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    run_thread(&shared, &mut poller, &mut receiver)
                }))
                .unwrap_or_else(|payload| {
                    Err(anyhow::anyhow!(
                        "resolver loop panicked: {}",
                        panic_message(payload.as_ref())
                    ))
                });

                finish(&shared, &mut poller, receiver, &result);
                result
            });

        match spawned {
            Ok(handle) => {
                *self.shared.thread.lock().unwrap() = Some(handle);
            }
            Err(e) => abort_start(&self.shared, &e.to_string()),
        }
    }
}

/// Fails the resolver when its loop thread could not be started
fn abort_start(shared: &Shared, reason: &str) {
    error!("Failed to spawn resolver thread: {}", reason);
    *shared.failure.lock().unwrap() =
        Some(format!("failed to spawn resolver thread: {}", reason));
    shared.close_gate();

    if let Some(receiver) = shared.take_receiver() {
        fail_queued(receiver, JobFailure::ResolverFailed);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn run_thread(
    shared: &Shared,
    poller: &mut Poller,
    receiver: &mut UnboundedReceiver<RemoteFuture>,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build resolver runtime")?;

    runtime.block_on(run_loop(shared, poller, receiver))
}

/// The polling loop proper; returns on shutdown or on a fatal error
async fn run_loop(
    shared: &Shared,
    poller: &mut Poller,
    receiver: &mut UnboundedReceiver<RemoteFuture>,
) -> Result<()> {
    while shared.is_running() {
        if shared.reset_delay.swap(false, Ordering::SeqCst) {
            poller.backoff.reset();
        }

        // Either the timeout or a wake ends the wait; a pending wake is
        // consumed here.
        let delay = poller.backoff.grow();
        let _ = tokio::time::timeout(delay, shared.wake.notified()).await;

        if !admit(shared, poller, receiver).await {
            break;
        }

        let resolved = poller.poll().await?;
        if resolved > 0 {
            debug!("Resolved {} future(s)", resolved);
        }

        poller.registry.prune();
        shared.tracked.store(poller.registry.len(), Ordering::SeqCst);
    }

    Ok(())
}

/// Moves queued futures into the registry
///
/// Blocks while nothing is tracked. Returns false once shutdown is seen.
async fn admit(
    shared: &Shared,
    poller: &mut Poller,
    receiver: &mut UnboundedReceiver<RemoteFuture>,
) -> bool {
    loop {
        if !shared.is_running() {
            return false;
        }

        while let Ok(future) = receiver.try_recv() {
            poller.registry.insert(&future);
        }

        poller.registry.prune();
        shared.tracked.store(poller.registry.len(), Ordering::SeqCst);
        if !poller.registry.is_empty() {
            return true;
        }

        tokio::select! {
            received = receiver.recv() => match received {
                Some(future) => poller.registry.insert(&future),
                None => return false,
            },
            _ = shared.wake.notified() => {}
        }
    }
}

/// Releases everything once the loop has exited
fn finish(
    shared: &Shared,
    poller: &mut Poller,
    receiver: UnboundedReceiver<RemoteFuture>,
    result: &Result<()>,
) {
    shared.close_gate();

    match result {
        Ok(()) => {
            poller.registry.clear();
            fail_queued(receiver, JobFailure::ResolverShutdown);
            info!("Resolver stopped");
        }
        Err(e) => {
            error!("Resolver failed: {:#}", e);
            *shared.failure.lock().unwrap() = Some(format!("{:#}", e));

            for future in poller.registry.drain_live() {
                if future.set_failure(JobFailure::ResolverFailed).is_err() {
                    warn!("Future {} was already resolved", future.key());
                }
            }
            fail_queued(receiver, JobFailure::ResolverFailed);
        }
    }

    shared.tracked.store(0, Ordering::SeqCst);
}

fn fail_queued(mut receiver: UnboundedReceiver<RemoteFuture>, failure: JobFailure) {
    receiver.close();
    while let Ok(future) = receiver.try_recv() {
        if future.set_failure(failure.clone()).is_err() {
            debug!("Queued future {} was already resolved", future.key());
        }
    }
}
