//! The transport capability the session drives.
//!
//! # Design
//! A transport turns a `DraftRequest` into a task, runs it when told to, and
//! reports the outcome to the delegate the session registered. Outcomes for
//! one transport are expected to arrive serialized (one delivery at a time);
//! the session does not rely on any ordering between tasks.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

use bytes::Bytes;

use crate::error::TransportError;
use crate::http::{DraftRequest, Headers};

/// Transport-assigned identity of one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Monotonic task id source for transport implementations.
#[derive(Debug, Default)]
pub struct TaskIdGenerator {
    next: AtomicU64,
}

impl TaskIdGenerator {
    pub fn next_id(&self) -> TaskId {
        TaskId(self.next.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// What a transport observed for a task.
///
/// `status` is `None` when no response arrived. A transport may report a
/// status and an error together (e.g. a body read failing mid-stream).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskOutcome {
    pub status: Option<u16>,
    pub headers: Headers,
    pub body: Bytes,
    pub error: Option<TransportError>,
}

impl TaskOutcome {
    pub fn response(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status: Some(status),
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn failed(error: TransportError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }
}

/// Receiver of task outcomes, registered with a transport by the session.
pub trait TaskDelegate: Send + Sync {
    fn task_completed(&self, task: TaskId, outcome: TaskOutcome);
}

pub trait Transport: Send + Sync {
    /// Install the receiver for outcomes. The transport must not keep the
    /// delegate alive; the session owns the transport, not the reverse.
    fn register_delegate(&self, delegate: Weak<dyn TaskDelegate>);

    /// Take ownership of `request` and allocate a task for it without
    /// starting any I/O.
    fn create_task(&self, request: DraftRequest) -> TaskId;

    /// Begin the exchange for `task`. Its outcome is delivered exactly once.
    fn start(&self, task: TaskId);
}
