//! Request handles: one per submitted route, completed at most once.
//!
//! # Design
//! A handle moves through a small state machine guarded by a mutex:
//!
//! ```text
//! Pending ──deliver──▶ Resolved ──response()──▶ Completed
//!    │                                              ▲
//!    ├──deliver (completion registered)─────────────┘
//!    └──deliver (provider swallowed the error)──▶ Abandoned
//! ```
//!
//! `Resolved` only exists because the outcome may be known before the caller
//! has registered a completion (synchronous encoding failures, or a fast
//! transport). The completion runs outside the lock. An `Abandoned` handle
//! never completes; its completion slot is dropped right away so whatever it
//! captured is released with it.
//!
//! The registry only holds handles weakly. A registered completion holds the
//! handle strongly until the outcome arrives, so `submit(..).response(..)`
//! delivers even after the caller drops the handle. A handle nobody listens
//! to is still freed as soon as its last clone goes away.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::error::ApiError;
use crate::http::{DraftRequest, Response};
use crate::provider::Provider;
use crate::transport::{TaskId, TaskOutcome};

/// Callback receiving the single result of a request.
pub type Completion = Box<dyn FnOnce(Result<Response, ApiError>) + Send>;

/// Observable lifecycle state of a `RequestHandle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Waiting for the transport.
    Pending,
    /// Outcome known, waiting for a completion to hand it to.
    Resolved,
    /// The completion has run.
    Completed,
    /// The provider swallowed the error; the completion will never run.
    Abandoned,
}

/// A registered completion plus the strong reference keeping its handle
/// reachable from the registry.
struct Listener {
    completion: Completion,
    anchor: Arc<Shared>,
}

enum Slot {
    Pending(Option<Listener>),
    Resolved(Result<Response, ApiError>),
    Completed,
    Abandoned,
}

struct Shared {
    provider: Option<Arc<dyn Provider>>,
    request: Option<DraftRequest>,
    task: Option<TaskId>,
    delivered: AtomicBool,
    slot: Mutex<Slot>,
}

/// Handle to one submitted request.
///
/// Clones share the same exchange. The session only keeps a weak reference:
/// an in-flight request with no registered completion whose handles have all
/// been dropped delivers to nobody.
#[derive(Clone)]
pub struct RequestHandle {
    shared: Arc<Shared>,
}

impl RequestHandle {
    pub(crate) fn pending(provider: Arc<dyn Provider>, request: DraftRequest, task: TaskId) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider: Some(provider),
                request: Some(request),
                task: Some(task),
                delivered: AtomicBool::new(false),
                slot: Mutex::new(Slot::Pending(None)),
            }),
        }
    }

    /// Handle for a request that failed before reaching the transport.
    pub(crate) fn rejected(
        provider: Option<Arc<dyn Provider>>,
        request: Option<DraftRequest>,
        error: ApiError,
    ) -> Self {
        tracing::debug!(%error, "request rejected before dispatch");
        Self {
            shared: Arc::new(Shared {
                provider,
                request,
                task: None,
                delivered: AtomicBool::new(true),
                slot: Mutex::new(Slot::Resolved(Err(error))),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakRequestHandle {
        WeakRequestHandle(Arc::downgrade(&self.shared))
    }

    /// Register the completion, replacing any earlier one.
    ///
    /// Runs `completion` immediately when the outcome is already known.
    /// Registering on a completed or abandoned handle drops `completion`
    /// without calling it.
    pub fn response<F>(&self, completion: F)
    where
        F: FnOnce(Result<Response, ApiError>) + Send + 'static,
    {
        let mut slot = self.shared.slot.lock();
        match std::mem::replace(&mut *slot, Slot::Completed) {
            Slot::Pending(previous) => {
                *slot = Slot::Pending(Some(Listener {
                    completion: Box::new(completion),
                    anchor: self.shared.clone(),
                }));
                drop(slot);
                drop(previous);
            }
            Slot::Resolved(result) => {
                drop(slot);
                completion(result);
            }
            Slot::Completed => {
                tracing::debug!(task = ?self.shared.task, "request already completed; completion dropped");
            }
            Slot::Abandoned => {
                *slot = Slot::Abandoned;
                tracing::debug!(task = ?self.shared.task, "request abandoned; completion dropped");
            }
        }
    }

    /// The request as handed to the transport, or as far as assembly got
    /// before failing. `None` when the URL itself could not be built.
    pub fn request(&self) -> Option<&DraftRequest> {
        self.shared.request.as_ref()
    }

    /// Transport task id; `None` for requests rejected before dispatch.
    pub fn task(&self) -> Option<TaskId> {
        self.shared.task
    }

    pub fn state(&self) -> HandleState {
        match &*self.shared.slot.lock() {
            Slot::Pending(_) => HandleState::Pending,
            Slot::Resolved(_) => HandleState::Resolved,
            Slot::Completed => HandleState::Completed,
            Slot::Abandoned => HandleState::Abandoned,
        }
    }

    /// Feed the transport outcome through validation and complete.
    ///
    /// Only the first delivery counts; later ones are ignored.
    pub(crate) fn deliver(&self, outcome: TaskOutcome) {
        if self.shared.delivered.swap(true, Ordering::AcqRel) {
            tracing::debug!(task = ?self.shared.task, "ignoring repeated delivery");
            return;
        }

        let Some(provider) = &self.shared.provider else {
            return;
        };
        let verdict = provider
            .validate(outcome.status, &outcome.body, outcome.error.as_ref())
            .and_then(|()| match outcome.status {
                Some(status) => Ok(Response {
                    status,
                    headers: outcome.headers,
                    body: outcome.body,
                }),
                None => Err(ApiError::UnknownError(
                    "transport reported neither a response nor an error".to_string(),
                )),
            });

        if let Err(error) = &verdict {
            if !provider.should_continue(error) {
                self.abandon(error);
                return;
            }
        }
        self.resolve(verdict);
    }

    fn resolve(&self, result: Result<Response, ApiError>) {
        let mut slot = self.shared.slot.lock();
        match std::mem::replace(&mut *slot, Slot::Completed) {
            Slot::Pending(Some(Listener { completion, anchor })) => {
                drop(slot);
                completion(result);
                drop(anchor);
            }
            Slot::Pending(None) => *slot = Slot::Resolved(result),
            // `delivered` admits a single resolution.
            other => *slot = other,
        }
    }

    fn abandon(&self, error: &ApiError) {
        tracing::debug!(task = ?self.shared.task, %error, "provider swallowed error; request will not complete");
        let previous = std::mem::replace(&mut *self.shared.slot.lock(), Slot::Abandoned);
        drop(previous);
    }
}

impl fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandle")
            .field("task", &self.shared.task)
            .field("request", &self.shared.request)
            .field("state", &self.state())
            .finish()
    }
}

/// Non-owning reference kept by the task registry.
#[derive(Clone)]
pub(crate) struct WeakRequestHandle(Weak<Shared>);

impl WeakRequestHandle {
    pub(crate) fn upgrade(&self) -> Option<RequestHandle> {
        self.0.upgrade().map(|shared| RequestHandle { shared })
    }
}
