//! Purge Task
//!
//! Background task that periodically removes expired cache entries.
//!
//! The task is owned through a [`PurgeHandle`]; dropping the handle stops it.
//! Inside a Tokio runtime the task is spawned on that runtime. Outside of one,
//! it gets a dedicated OS thread driving a current-thread runtime, so caches
//! can be created from plain synchronous code.

use std::thread;
use std::time::Duration;

use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::Result;

const PURGE_THREAD_NAME: &str = "freshcache-purge";

// == Purge Handle ==
/// Owned handle to a running purge task. Stops the task when dropped.
#[derive(Debug)]
pub struct PurgeHandle {
    shutdown: Option<oneshot::Sender<()>>,
    worker: Worker,
}

#[derive(Debug)]
enum Worker {
    Task(JoinHandle<()>),
    Thread(thread::JoinHandle<()>),
}

impl PurgeHandle {
    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        match &self.worker {
            Worker::Task(handle) => handle.is_finished(),
            Worker::Thread(handle) => handle.is_finished(),
        }
    }

    /// Signals the task to stop after its current pass.
    pub fn stop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

impl Drop for PurgeHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawns a background task that calls `purge` every `interval`.
///
/// `purge` returns the number of entries it removed, or `None` once the cache
/// it serves is gone, which ends the task. The first pass runs one full
/// interval after spawning.
///
/// # Arguments
/// * `interval` - Time between purge passes, must be non-zero
/// * `purge` - One purge pass
///
/// # Returns
/// A [`PurgeHandle`] that stops the task when dropped, or an error if no
/// worker thread could be started.
///
/// # Example
/// ```ignore
/// let handle = spawn_purge_task(Duration::from_secs(600), move || {
///     weak.upgrade().map(|shared| shared.purge_expired())
/// })?;
/// // Later, during shutdown:
/// drop(handle);
/// ```
pub fn spawn_purge_task<F>(interval: Duration, purge: F) -> Result<PurgeHandle>
where
    F: FnMut() -> Option<usize> + Send + 'static,
{
    let (shutdown, shutdown_rx) = oneshot::channel();
    let task = run_purge_loop(interval, purge, shutdown_rx);

    let worker = match Handle::try_current() {
        Ok(runtime) => Worker::Task(runtime.spawn(task)),
        Err(_) => {
            let runtime = Builder::new_current_thread().enable_time().build()?;
            let thread = thread::Builder::new()
                .name(PURGE_THREAD_NAME.to_string())
                .spawn(move || runtime.block_on(task))?;
            Worker::Thread(thread)
        }
    };

    Ok(PurgeHandle {
        shutdown: Some(shutdown),
        worker,
    })
}

async fn run_purge_loop<F>(interval: Duration, mut purge: F, mut shutdown: oneshot::Receiver<()>)
where
    F: FnMut() -> Option<usize>,
{
    info!("Starting purge task with interval of {:?}", interval);

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("Purge task shutting down");
                break;
            }
            _ = ticker.tick() => {
                match purge() {
                    Some(0) => debug!("Purge: no expired entries found"),
                    Some(removed) => info!("Purge: removed {} expired entries", removed),
                    None => {
                        debug!("Purge task stopping, cache dropped");
                        break;
                    }
                }
            }
        }
    }
}
