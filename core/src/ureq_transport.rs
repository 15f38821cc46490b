//! Blocking `ureq` transport with a single delivery thread.
//!
//! # Design
//! Each started task runs on its own worker thread. Workers never call the
//! delegate themselves: they send the outcome over a channel to one delivery
//! thread, so the session sees outcomes one at a time. The agent reports
//! 4xx/5xx statuses as data so the provider's validation decides what counts
//! as a failure.

use std::collections::HashMap;
use std::io;
use std::sync::mpsc;
use std::sync::{Arc, Weak};
use std::thread;

use parking_lot::Mutex;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, RequestBuilder};

use crate::config::TransportConfig;
use crate::error::{TransportError, TransportErrorKind};
use crate::http::{DraftRequest, Headers, HttpMethod};
use crate::transport::{TaskDelegate, TaskId, TaskIdGenerator, TaskOutcome, Transport};

type DelegateSlot = Arc<Mutex<Option<Weak<dyn TaskDelegate>>>>;

pub struct UreqTransport {
    agent: Agent,
    ids: TaskIdGenerator,
    tasks: Mutex<HashMap<TaskId, DraftRequest>>,
    outcomes: mpsc::Sender<(TaskId, TaskOutcome)>,
    delegate: DelegateSlot,
}

impl UreqTransport {
    /// Build the agent and spawn the delivery thread.
    pub fn new(config: &TransportConfig) -> io::Result<Self> {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(config.timeout())
            .build()
            .new_agent();

        let delegate: DelegateSlot = Arc::new(Mutex::new(None));
        let (outcomes, inbox) = mpsc::channel::<(TaskId, TaskOutcome)>();
        let slot = delegate.clone();
        thread::Builder::new()
            .name("routekit-delivery".to_string())
            .spawn(move || {
                for (task, outcome) in inbox {
                    let target = slot.lock().as_ref().and_then(Weak::upgrade);
                    match target {
                        Some(delegate) => delegate.task_completed(task, outcome),
                        None => tracing::warn!(%task, "no live delegate; outcome dropped"),
                    }
                }
            })?;

        Ok(Self {
            agent,
            ids: TaskIdGenerator::default(),
            tasks: Mutex::new(HashMap::new()),
            outcomes,
            delegate,
        })
    }
}

impl Transport for UreqTransport {
    fn register_delegate(&self, delegate: Weak<dyn TaskDelegate>) {
        *self.delegate.lock() = Some(delegate);
    }

    fn create_task(&self, request: DraftRequest) -> TaskId {
        let task = self.ids.next_id();
        self.tasks.lock().insert(task, request);
        task
    }

    fn start(&self, task: TaskId) {
        let Some(request) = self.tasks.lock().remove(&task) else {
            tracing::warn!(%task, "start requested for unknown task");
            return;
        };

        let agent = self.agent.clone();
        let outcomes = self.outcomes.clone();
        let spawned = thread::Builder::new()
            .name(format!("routekit-{task}"))
            .spawn(move || {
                let outcome = run(&agent, &request);
                // The delivery thread only stops once every sender is gone.
                let _ = outcomes.send((task, outcome));
            });

        if let Err(e) = spawned {
            tracing::warn!(%task, error = %e, "failed to spawn worker");
            let error = TransportError::new(TransportErrorKind::Other, e.to_string());
            let _ = self.outcomes.send((task, TaskOutcome::failed(error)));
        }
    }
}

fn run(agent: &Agent, request: &DraftRequest) -> TaskOutcome {
    let mut response = match execute(agent, request) {
        Ok(response) => response,
        Err(e) => return TaskOutcome::failed(transport_error(e)),
    };

    let status = response.status().as_u16();
    let headers: Headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    match response.body_mut().read_to_vec() {
        Ok(body) => TaskOutcome {
            status: Some(status),
            headers,
            body: body.into(),
            error: None,
        },
        Err(e) => TaskOutcome {
            status: Some(status),
            headers,
            error: Some(transport_error(e)),
            ..TaskOutcome::default()
        },
    }
}

fn execute(
    agent: &Agent,
    request: &DraftRequest,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    let url = request.url.as_str();
    match request.method {
        HttpMethod::Post => send(agent.post(url), request),
        HttpMethod::Put => send(agent.put(url), request),
        HttpMethod::Patch => send(agent.patch(url), request),
        HttpMethod::Get => call(agent.get(url), request),
        HttpMethod::Delete => call(agent.delete(url), request),
        HttpMethod::Head => call(agent.head(url), request),
        HttpMethod::Options => call(agent.options(url), request),
        HttpMethod::Connect => call(agent.connect(url), request),
        HttpMethod::Trace => call(agent.trace(url), request),
    }
}

fn send(
    builder: RequestBuilder<WithBody>,
    request: &DraftRequest,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    let builder = with_headers(builder, &request.headers);
    match &request.body {
        Some(body) => builder.send(&body[..]),
        None => builder.send_empty(),
    }
}

fn call(
    builder: RequestBuilder<WithoutBody>,
    request: &DraftRequest,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    let builder = with_headers(builder, &request.headers);
    match &request.body {
        Some(body) => builder.force_send_body().send(&body[..]),
        None => builder.call(),
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn transport_error(err: ureq::Error) -> TransportError {
    let kind = match &err {
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::Io(_) => TransportErrorKind::Io,
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => TransportErrorKind::Connect,
        _ => TransportErrorKind::Other,
    };
    TransportError::new(kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_connect_failures() {
        assert_eq!(transport_error(ureq::Error::HostNotFound).kind, TransportErrorKind::Connect);
        assert_eq!(transport_error(ureq::Error::ConnectionFailed).kind, TransportErrorKind::Connect);
        let io = io::Error::new(io::ErrorKind::BrokenPipe, "pipe");
        assert_eq!(transport_error(ureq::Error::Io(io)).kind, TransportErrorKind::Io);
    }

    #[test]
    fn task_ids_are_unique() {
        let transport = UreqTransport::new(&TransportConfig::default()).unwrap();
        let url = url::Url::parse("http://127.0.0.1:1/").unwrap();
        let a = transport.create_task(DraftRequest::new(HttpMethod::Get, url.clone()));
        let b = transport.create_task(DraftRequest::new(HttpMethod::Get, url));
        assert_ne!(a, b);
        assert_eq!(transport.tasks.lock().len(), 2);
    }

    #[test]
    fn starting_unknown_task_is_ignored() {
        let transport = UreqTransport::new(&TransportConfig::default()).unwrap();
        transport.start(TaskId(99));
        assert!(transport.tasks.lock().is_empty());
    }
}
