//! Registry of in-flight fetch tasks
//!
//! The engine owns the registry; a task is entered on submission and removed once
//! it has resolved its result. Shutdown waits for the registry to drain instead of
//! tasks keeping themselves alive.

use crate::fetch::FetchState;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Identity of a fetch task within one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct TaskEntry {
    target: String,
    state: FetchState,
}

/// In-flight tasks indexed by identity
#[derive(Debug, Default)]
pub struct TaskRegistry {
    next_id: AtomicU64,
    tasks: Mutex<HashMap<TaskId, TaskEntry>>,
    idle: Notify,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enters a new task in its initial state and returns its identity
    pub fn register(&self, target: &str) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.lock().insert(
            id,
            TaskEntry {
                target: target.to_string(),
                state: FetchState::Connecting,
            },
        );
        id
    }

    /// Records a state transition of a registered task
    pub fn transition(&self, id: TaskId, state: FetchState) {
        if let Some(entry) = self.lock().get_mut(&id) {
            entry.state = state;
        }
    }

    /// Removes a task that reached a terminal state
    ///
    /// # Returns
    ///
    /// The number of tasks still in flight
    pub fn complete(&self, id: TaskId, state: FetchState) -> usize {
        debug_assert!(state.is_terminal());

        let mut tasks = self.lock();
        tasks.remove(&id);
        let remaining = tasks.len();
        drop(tasks);

        if remaining == 0 {
            self.idle.notify_waiters();
        }
        remaining
    }

    /// Drops every entry; used when queued tasks are discarded without running
    pub fn clear(&self) -> usize {
        let cleared = {
            let mut tasks = self.lock();
            let cleared = tasks.len();
            tasks.clear();
            cleared
        };
        self.idle.notify_waiters();
        cleared
    }

    /// Current state of a task; `None` once it has left the registry
    pub fn state(&self, id: TaskId) -> Option<FetchState> {
        self.lock().get(&id).map(|entry| entry.state)
    }

    pub fn target(&self, id: TaskId) -> Option<String> {
        self.lock().get(&id).map(|entry| entry.target.clone())
    }

    /// Snapshot of every in-flight task, ordered by identity
    pub fn snapshot(&self) -> Vec<(TaskId, String, FetchState)> {
        let mut tasks: Vec<_> = self
            .lock()
            .iter()
            .map(|(id, entry)| (*id, entry.target.clone(), entry.state))
            .collect();
        tasks.sort_by_key(|(id, _, _)| *id);
        tasks
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Waits until no task is in flight
    pub async fn wait_idle(&self) {
        loop {
            // Registered before the check so a completion in between is not missed
            let notified = self.idle.notified();
            if self.is_empty() {
                return;
            }
            notified.await;
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, TaskEntry>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
