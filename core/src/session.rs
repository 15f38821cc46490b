//! Session: owns a transport and the registry routing its outcomes back to
//! request handles.
//!
//! # Design
//! The session registers itself with the transport as a weak delegate, so
//! dropping every `Session` clone tears down the registry even while the
//! transport still has tasks in flight; their outcomes are then dropped.

use std::sync::{Arc, Weak};

use url::Url;

use crate::error::ApiError;
use crate::http::{DraftRequest, HttpMethod};
use crate::provider::{BareProvider, Provider};
use crate::registry::TaskRegistry;
use crate::request::RequestHandle;
use crate::transport::{TaskDelegate, TaskId, TaskOutcome, Transport};

struct SessionInner {
    transport: Arc<dyn Transport>,
    registry: TaskRegistry,
}

impl TaskDelegate for SessionInner {
    fn task_completed(&self, task: TaskId, outcome: TaskOutcome) {
        if let Some(handle) = self.registry.take(task) {
            handle.deliver(outcome);
        }
    }
}

/// Shared entry point to one transport. Cheap to clone.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let inner = Arc::new(SessionInner {
            transport,
            registry: TaskRegistry::new(),
        });
        let delegate: Weak<SessionInner> = Arc::downgrade(&inner);
        inner.transport.register_delegate(delegate);
        Self { inner }
    }

    /// Send an already assembled request.
    ///
    /// The handle is registered before the transport starts the task, so a
    /// transport that completes synchronously inside `start` still finds it.
    pub fn dispatch(&self, provider: Arc<dyn Provider>, request: DraftRequest) -> RequestHandle {
        let task = self.inner.transport.create_task(request.clone());
        tracing::debug!(%task, method = %request.method, url = %request.url, "dispatching request");
        let handle = RequestHandle::pending(provider, request, task);
        self.inner.registry.insert(task, &handle);
        self.inner.transport.start(task);
        handle
    }

    /// Request an absolute URL with no provider defaults.
    ///
    /// A malformed `url` yields a handle that completes with
    /// `InvalidUrlError` without touching the transport.
    pub fn fetch(&self, url: &str, method: HttpMethod) -> RequestHandle {
        match Url::parse(url) {
            Ok(parsed) => {
                let provider = Arc::new(BareProvider::new(parsed.clone()));
                self.dispatch(provider, DraftRequest::new(method, parsed))
            }
            Err(e) => RequestHandle::rejected(None, None, ApiError::InvalidUrlError(format!("{url}: {e}"))),
        }
    }

    /// Number of tasks submitted and not yet delivered.
    pub fn in_flight(&self) -> usize {
        self.inner.registry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::HandleState;
    use crate::transport::TaskIdGenerator;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Transport that completes every task inside `start` with a fixed status.
    struct InlineTransport {
        ids: TaskIdGenerator,
        status: u16,
        created: AtomicUsize,
        delegate: Mutex<Option<Weak<dyn TaskDelegate>>>,
    }

    impl InlineTransport {
        fn new(status: u16) -> Arc<Self> {
            Arc::new(Self {
                ids: TaskIdGenerator::default(),
                status,
                created: AtomicUsize::new(0),
                delegate: Mutex::new(None),
            })
        }
    }

    impl Transport for InlineTransport {
        fn register_delegate(&self, delegate: Weak<dyn TaskDelegate>) {
            *self.delegate.lock() = Some(delegate);
        }

        fn create_task(&self, _request: DraftRequest) -> TaskId {
            self.created.fetch_add(1, Ordering::SeqCst);
            self.ids.next_id()
        }

        fn start(&self, task: TaskId) {
            let delegate = self.delegate.lock().as_ref().and_then(Weak::upgrade);
            if let Some(delegate) = delegate {
                delegate.task_completed(task, TaskOutcome::response(self.status, "done"));
            }
        }
    }

    /// Transport whose tasks complete only when the test says so.
    #[derive(Default)]
    struct DeferredTransport {
        ids: TaskIdGenerator,
        delegate: Mutex<Option<Weak<dyn TaskDelegate>>>,
    }

    impl DeferredTransport {
        fn complete(&self, task: TaskId, outcome: TaskOutcome) {
            let delegate = self.delegate.lock().as_ref().and_then(Weak::upgrade);
            if let Some(delegate) = delegate {
                delegate.task_completed(task, outcome);
            }
        }
    }

    impl Transport for DeferredTransport {
        fn register_delegate(&self, delegate: Weak<dyn TaskDelegate>) {
            *self.delegate.lock() = Some(delegate);
        }

        fn create_task(&self, _request: DraftRequest) -> TaskId {
            self.ids.next_id()
        }

        fn start(&self, _task: TaskId) {}
    }

    #[test]
    fn fire_and_forget_completion_still_runs() {
        let transport = Arc::new(DeferredTransport::default());
        let session = Session::new(transport.clone());

        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        session
            .fetch("http://localhost/x", HttpMethod::Get)
            .response(move |result| {
                assert!(matches!(result, Err(ApiError::StatusCodeError(404))));
                seen.fetch_add(1, Ordering::SeqCst);
            });

        transport.complete(TaskId(1), TaskOutcome::response(404, ""));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.in_flight(), 0);
    }

    #[test]
    fn unobserved_dropped_handle_is_discarded() {
        let transport = Arc::new(DeferredTransport::default());
        let session = Session::new(transport.clone());
        drop(session.fetch("http://localhost/x", HttpMethod::Get));

        transport.complete(TaskId(1), TaskOutcome::response(200, ""));
        assert_eq!(session.in_flight(), 0);
    }

    #[test]
    fn synchronous_delivery_finds_registered_handle() {
        let transport = InlineTransport::new(200);
        let session = Session::new(transport.clone());
        let handle = session.fetch("http://localhost/get", HttpMethod::Get);

        assert_eq!(handle.state(), HandleState::Resolved);
        assert_eq!(session.in_flight(), 0);

        let status = Arc::new(Mutex::new(None));
        let seen = status.clone();
        handle.response(move |result| *seen.lock() = result.ok().map(|r| r.status));
        assert_eq!(*status.lock(), Some(200));
    }

    #[test]
    fn fetch_rejects_malformed_url_without_transport() {
        let transport = InlineTransport::new(200);
        let session = Session::new(transport.clone());
        let handle = session.fetch("not a url", HttpMethod::Get);

        assert_eq!(transport.created.load(Ordering::SeqCst), 0);
        let error = Arc::new(Mutex::new(None));
        let seen = error.clone();
        handle.response(move |result| *seen.lock() = result.err());
        assert!(matches!(*error.lock(), Some(ApiError::InvalidUrlError(_))));
    }

    #[test]
    fn dropped_session_stops_routing() {
        let transport = InlineTransport::new(200);
        let session = Session::new(transport.clone());
        drop(session);
        assert!(transport.delegate.lock().as_ref().and_then(Weak::upgrade).is_none());
    }
}
