//! Fixed-size worker pool running the network reactor
//!
//! The pool accepts work before it runs: submissions are queued while idle and
//! spawned onto the runtime once [`WorkerPool::start`] builds it. Every worker thread
//! drives the same reactor, so any task may be polled on any worker.

use futures::future::BoxFuture;
use std::fmt;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::runtime::{Builder, Runtime};

/// Name given to every worker thread
const WORKER_THREAD_NAME: &str = "fetch-worker";

enum PoolState {
    /// Not started yet; work is queued in submission order
    Idle(Vec<BoxFuture<'static, ()>>),

    Running(Runtime),

    Stopped,
}

impl PoolState {
    fn name(&self) -> &'static str {
        match self {
            Self::Idle(_) => "idle",
            Self::Running(_) => "running",
            Self::Stopped => "stopped",
        }
    }
}

/// Result of submitting work to the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Spawned onto the running reactor
    Spawned,

    /// Held until the pool starts
    Queued,

    /// The pool was stopped; the work was dropped
    Rejected,
}

pub struct WorkerPool {
    workers: usize,
    state: Mutex<PoolState>,
}

impl WorkerPool {
    /// Creates an idle pool that will run `workers` threads once started
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            state: Mutex::new(PoolState::Idle(Vec::new())),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Hands work to the pool without blocking
    pub fn submit(&self, work: BoxFuture<'static, ()>) -> Submission {
        match &mut *self.lock() {
            PoolState::Idle(queue) => {
                queue.push(work);
                Submission::Queued
            }
            PoolState::Running(runtime) => {
                runtime.spawn(work);
                Submission::Spawned
            }
            PoolState::Stopped => Submission::Rejected,
        }
    }

    /// Builds the runtime and spawns every queued submission in order
    ///
    /// Starting a running pool is a no-op; a stopped pool cannot be restarted.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of queued submissions that were spawned
    /// * `Err(io::Error)` - The runtime could not be built or the pool was stopped
    pub fn start(&self) -> io::Result<usize> {
        let mut state = self.lock();

        let queue = match &mut *state {
            PoolState::Idle(queue) => std::mem::take(queue),
            PoolState::Running(_) => return Ok(0),
            PoolState::Stopped => {
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "worker pool was already stopped",
                ))
            }
        };

        let runtime = Builder::new_multi_thread()
            .worker_threads(self.workers)
            .thread_name(WORKER_THREAD_NAME)
            .enable_all()
            .build()?;

        let spawned = queue.len();
        for work in queue {
            runtime.spawn(work);
        }

        tracing::debug!(workers = self.workers, queued = spawned, "Worker pool started");
        *state = PoolState::Running(runtime);
        Ok(spawned)
    }

    pub fn is_running(&self) -> bool {
        matches!(&*self.lock(), PoolState::Running(_))
    }

    /// Stops the pool
    ///
    /// Callers wait for their work to finish first; whatever is still queued or
    /// running is dropped.
    ///
    /// # Returns
    ///
    /// The number of queued submissions that were dropped without running
    pub fn stop(&self) -> usize {
        let previous = std::mem::replace(&mut *self.lock(), PoolState::Stopped);

        match previous {
            PoolState::Idle(queue) => queue.len(),
            PoolState::Running(runtime) => {
                // Safe to call from inside another runtime, unlike dropping it
                runtime.shutdown_background();
                tracing::debug!("Worker pool stopped");
                0
            }
            PoolState::Stopped => 0,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("state", &self.lock().name())
            .finish()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}
