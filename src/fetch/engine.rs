//! Fetch engine
//!
//! The engine is explicitly constructed per batch. It owns the resolved endpoint,
//! the task registry and the worker pool, and hands every caller a
//! [`FetchResult`] immediately. Results handed out before [`FetchEngine::start`] are
//! fulfilled once the pool runs.

use crate::config::EngineConfig;
use crate::fetch::pool::{Submission, WorkerPool};
use crate::fetch::registry::{TaskId, TaskRegistry};
use crate::fetch::result::{self, FetchResult};
use crate::fetch::task::{FetchTask, TaskContext};
use crate::fetch::{tls, Endpoint, FetchError, FetchState, Scheme, DEFAULT_WORKERS};
use futures::FutureExt;
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Tunables of a [`FetchEngine`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Worker threads driving the reactor
    pub workers: usize,

    /// Value of the User-Agent request header
    pub user_agent: String,

    /// Upper bound for each network stage; `None` waits indefinitely
    pub stage_timeout: Option<Duration>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            user_agent: concat!("watchlist/", env!("CARGO_PKG_VERSION")).to_string(),
            stage_timeout: None,
        }
    }
}

impl From<&EngineConfig> for EngineOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            workers: config.workers,
            user_agent: config.user_agent.clone(),
            stage_timeout: config.stage_timeout(),
        }
    }
}

/// Runs fetch tasks against one endpoint on a fixed worker pool
pub struct FetchEngine {
    context: Arc<TaskContext>,
    registry: Arc<TaskRegistry>,
    pool: WorkerPool,
}

impl FetchEngine {
    /// Creates an engine for an already resolved endpoint
    ///
    /// The worker pool is not started; see [`FetchEngine::start`].
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Resolved endpoint shared by every task of this engine
    /// * `options` - Pool size, user agent and stage timeout
    ///
    /// # Returns
    ///
    /// * `Ok(FetchEngine)` - Engine ready to accept fetches
    /// * `Err(FetchError::Handshake)` - The TLS client could not be configured
    pub fn new(endpoint: Endpoint, options: EngineOptions) -> Result<Self, FetchError> {
        let tls = match endpoint.scheme() {
            Scheme::Https => Some(tls::connector().map_err(|e| FetchError::Handshake {
                target: endpoint.to_string(),
                source: Arc::new(io::Error::new(io::ErrorKind::Other, e)),
            })?),
            Scheme::Http => None,
        };

        let registry = Arc::new(TaskRegistry::new());
        let context = Arc::new(TaskContext {
            endpoint: Arc::new(endpoint),
            user_agent: options.user_agent,
            stage_timeout: options.stage_timeout,
            tls,
            registry: Arc::clone(&registry),
        });

        Ok(Self {
            context,
            registry,
            pool: WorkerPool::new(options.workers),
        })
    }

    /// Creates an engine using the `[engine]` section of the configuration
    pub fn from_config(endpoint: Endpoint, config: &EngineConfig) -> Result<Self, FetchError> {
        Self::new(endpoint, EngineOptions::from(config))
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.context.endpoint
    }

    pub fn workers(&self) -> usize {
        self.pool.workers()
    }

    /// Submits a fetch of `target` and returns its result handle
    ///
    /// Never blocks; the handle can be awaited or waited on later.
    pub fn async_fetch(&self, target: &str) -> FetchResult {
        self.submit(target).1
    }

    /// Like [`FetchEngine::async_fetch`], also returning the task identity
    pub fn submit(&self, target: &str) -> (TaskId, FetchResult) {
        let id = self.registry.register(target);
        let (resolver, handle) = result::pending(target);
        let task = FetchTask::new(id, resolver, Arc::clone(&self.context));

        match self.pool.submit(task.run().boxed()) {
            Submission::Spawned | Submission::Queued => {
                tracing::trace!(task = %id, target = %target, "Fetch submitted");
            }
            Submission::Rejected => {
                // The dropped task takes its resolver with it
                self.registry.complete(id, FetchState::Failed);
                tracing::warn!(task = %id, target = %target, "Fetch submitted after shutdown");
            }
        }

        (id, handle)
    }

    /// Starts the worker pool, spawning every fetch submitted so far
    pub fn start(&self) -> Result<(), FetchError> {
        let spawned = self.pool.start().map_err(|e| FetchError::PoolStart {
            source: Arc::new(e),
        })?;

        tracing::debug!(
            endpoint = %self.context.endpoint,
            workers = self.pool.workers(),
            spawned,
            "Fetch engine started"
        );
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.pool.is_running()
    }

    /// Number of fetches that have not resolved yet
    pub fn in_flight(&self) -> usize {
        self.registry.len()
    }

    /// State of an in-flight fetch; `None` once it resolved
    pub fn task_state(&self, id: TaskId) -> Option<FetchState> {
        self.registry.state(id)
    }

    /// Waits for in-flight fetches and stops the pool
    ///
    /// Fetches queued on an engine that never started resolve as
    /// [`FetchError::Abandoned`]. Must not be called from inside an async task.
    pub fn shutdown(&self) {
        if self.pool.is_running() {
            for (id, target, state) in self.registry.snapshot() {
                tracing::debug!(task = %id, target = %target, state = %state, "Waiting for fetch");
            }
            futures::executor::block_on(self.registry.wait_idle());
        }

        let abandoned = self.pool.stop();
        if abandoned > 0 {
            self.registry.clear();
            tracing::warn!(abandoned, "Fetch engine stopped before it was started");
        }
    }
}

impl Drop for FetchEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
