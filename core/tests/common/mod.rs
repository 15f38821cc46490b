//! Shared helpers for the integration tests.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use routekit_core::{
    ApiError, HandleState, RequestHandle, Response, Session, TransportConfig, UreqTransport,
};

/// Start the mock server on a random port and return its base URL.
pub fn start_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

/// A session over a fresh `UreqTransport`.
pub fn session(config: &TransportConfig) -> Session {
    Session::new(Arc::new(UreqTransport::new(config).unwrap()))
}

/// Block until the handle's completion runs.
pub fn wait(handle: &RequestHandle) -> Result<Response, ApiError> {
    let (tx, rx) = mpsc::channel();
    handle.response(move |result| {
        let _ = tx.send(result);
    });
    rx.recv_timeout(Duration::from_secs(10))
        .expect("no completion within 10s")
}

/// Poll until the handle leaves `Pending`.
#[allow(dead_code)]
pub fn settle(handle: &RequestHandle) -> HandleState {
    let deadline = Instant::now() + Duration::from_secs(10);
    while handle.state() == HandleState::Pending {
        assert!(Instant::now() < deadline, "handle still pending after 10s");
        std::thread::sleep(Duration::from_millis(10));
    }
    handle.state()
}
