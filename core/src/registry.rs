//! Map from transport task ids to the handles waiting on them.
//!
//! Owned by a `Session`. Inserts come from whichever thread submits; removals
//! come from the transport's delivery thread. Entries are weak so a handle
//! nobody holds anymore is freed even if its task never reports back.

use dashmap::DashMap;

use crate::request::{RequestHandle, WeakRequestHandle};
use crate::transport::TaskId;

#[derive(Default)]
pub struct TaskRegistry {
    tasks: DashMap<TaskId, WeakRequestHandle>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `handle` under `task`. Must happen before the task is started.
    pub fn insert(&self, task: TaskId, handle: &RequestHandle) {
        if self.tasks.insert(task, handle.downgrade()).is_some() {
            tracing::warn!(%task, "task id reused while still registered; replacing entry");
        }
    }

    /// Remove the entry for `task` and return its handle if still alive.
    ///
    /// Unknown ids and released handles are logged, never a panic.
    pub fn take(&self, task: TaskId) -> Option<RequestHandle> {
        let Some((_, weak)) = self.tasks.remove(&task) else {
            tracing::warn!(%task, "delivery for unknown task ignored");
            return None;
        };
        let handle = weak.upgrade();
        if handle.is_none() {
            tracing::debug!(%task, "request handle released before delivery");
        }
        handle
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
