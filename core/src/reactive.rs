//! Stream adapters over request handles.
//!
//! Each adapter yields at most one item: the decoded value on success or the
//! error on failure, then ends. Nothing is registered on the handle until the
//! stream is first polled. Dropping the stream does not cancel the exchange;
//! the result is simply delivered to nobody. A request whose error the
//! provider swallowed produces an empty stream.

use futures::channel::oneshot;
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::http::Response;
use crate::request::RequestHandle;

/// The raw response.
pub fn response(handle: RequestHandle) -> impl Stream<Item = Result<Response, ApiError>> + Send {
    stream::once(async move {
        let (tx, rx) = oneshot::channel();
        handle.response(move |result| {
            // The receiver is gone when the subscriber dropped the stream.
            let _ = tx.send(result);
        });
        let result = rx.await.ok();
        drop(handle);
        result
    })
    .filter_map(future::ready)
}

/// The response body decoded as `T`.
pub fn object<T>(handle: RequestHandle) -> impl Stream<Item = Result<T, ApiError>> + Send
where
    T: DeserializeOwned + Send + 'static,
{
    response(handle).map(|result| result.and_then(|r| r.json::<T>()))
}

/// A single `T` found under the dotted `root_key` path.
pub fn object_at<T>(handle: RequestHandle, root_key: &str) -> impl Stream<Item = Result<T, ApiError>> + Send
where
    T: DeserializeOwned + Send + 'static,
{
    let root_key = root_key.to_string();
    response(handle).map(move |result| result.and_then(|r| r.json_at::<T>(Some(&root_key))))
}

/// A list of `T` found under the dotted `root_key` path, or at the body
/// root when `root_key` is `None`.
pub fn list<T>(
    handle: RequestHandle,
    root_key: Option<&str>,
) -> impl Stream<Item = Result<Vec<T>, ApiError>> + Send
where
    T: DeserializeOwned + Send + 'static,
{
    let root_key = root_key.map(str::to_string);
    response(handle).map(move |result| result.and_then(|r| r.json_at::<Vec<T>>(root_key.as_deref())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{DraftRequest, HttpMethod};
    use crate::request::HandleState;
    use crate::session::Session;
    use crate::transport::{TaskDelegate, TaskId, TaskIdGenerator, TaskOutcome, Transport};
    use futures::executor::block_on;
    use futures::FutureExt;
    use parking_lot::Mutex;
    use serde::Deserialize;
    use std::sync::{Arc, Weak};

    /// Transport whose tasks complete only when the test says so.
    #[derive(Default)]
    struct ManualTransport {
        ids: TaskIdGenerator,
        delegate: Mutex<Option<Weak<dyn TaskDelegate>>>,
    }

    impl ManualTransport {
        fn complete(&self, task: TaskId, outcome: TaskOutcome) {
            let delegate = self.delegate.lock().as_ref().and_then(Weak::upgrade);
            if let Some(delegate) = delegate {
                delegate.task_completed(task, outcome);
            }
        }
    }

    impl Transport for ManualTransport {
        fn register_delegate(&self, delegate: Weak<dyn TaskDelegate>) {
            *self.delegate.lock() = Some(delegate);
        }

        fn create_task(&self, _request: DraftRequest) -> TaskId {
            self.ids.next_id()
        }

        fn start(&self, _task: TaskId) {}
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    fn setup() -> (Session, Arc<ManualTransport>) {
        let transport = Arc::new(ManualTransport::default());
        (Session::new(transport.clone()), transport)
    }

    #[test]
    fn object_yields_decoded_value_then_ends() {
        let (session, transport) = setup();
        let handle = session.fetch("http://localhost/item", HttpMethod::Get);
        let task = handle.task().unwrap();
        transport.complete(task, TaskOutcome::response(200, r#"{"id":7}"#));

        let items: Vec<Result<Item, ApiError>> = block_on(object(handle).collect());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), &Item { id: 7 });
    }

    #[test]
    fn list_navigates_root_key() {
        let (session, transport) = setup();
        let handle = session.fetch("http://localhost/items", HttpMethod::Get);
        transport.complete(
            handle.task().unwrap(),
            TaskOutcome::response(200, r#"{"data":{"items":[{"id":1},{"id":2}]}}"#),
        );

        let items: Vec<_> = block_on(list::<Item>(handle, Some("data.items")).collect());
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), &vec![Item { id: 1 }, Item { id: 2 }]);
    }

    #[test]
    fn object_at_navigates_into_array() {
        let (session, transport) = setup();
        let handle = session.fetch("http://localhost/items", HttpMethod::Get);
        transport.complete(
            handle.task().unwrap(),
            TaskOutcome::response(200, r#"{"data":{"items":[{"id":1},{"id":2}]}}"#),
        );

        let items: Vec<_> = block_on(object_at::<Item>(handle, "data.items.1").collect());
        assert_eq!(items[0].as_ref().unwrap(), &Item { id: 2 });
    }

    #[test]
    fn failure_yields_single_error() {
        let (session, transport) = setup();
        let handle = session.fetch("http://localhost/missing", HttpMethod::Get);
        transport.complete(handle.task().unwrap(), TaskOutcome::response(404, ""));

        let items: Vec<Result<Item, ApiError>> = block_on(object(handle).collect());
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(ApiError::StatusCodeError(404))));
    }

    #[test]
    fn decode_failure_is_reported() {
        let (session, transport) = setup();
        let handle = session.fetch("http://localhost/item", HttpMethod::Get);
        transport.complete(handle.task().unwrap(), TaskOutcome::response(200, "[]"));

        let items: Vec<Result<Item, ApiError>> = block_on(object(handle).collect());
        assert!(matches!(items[0], Err(ApiError::DeserializationError { .. })));
    }

    #[test]
    fn stream_is_lazy() {
        let (session, _transport) = setup();
        let handle = session.fetch("http://localhost/item", HttpMethod::Get);
        let stream = response(handle.clone());
        // Nothing registered yet: a late outcome would be buffered, not lost.
        assert_eq!(handle.state(), HandleState::Pending);
        drop(stream);
        assert_eq!(handle.state(), HandleState::Pending);
    }

    #[test]
    fn dropping_subscription_stops_delivery() {
        let (session, transport) = setup();
        let handle = session.fetch("http://localhost/item", HttpMethod::Get);
        let task = handle.task().unwrap();

        let mut stream = Box::pin(object::<Item>(handle));
        assert!(stream.next().now_or_never().is_none());
        drop(stream);

        // The receiver went away with the stream; the outcome goes nowhere.
        transport.complete(task, TaskOutcome::response(200, r#"{"id":1}"#));
        assert_eq!(session.in_flight(), 0);
    }
}
