//! Echo server used by the client's integration tests.
//!
//! `/anything` reflects the request back as JSON, `/status/{code}` answers
//! with a chosen status, `/nested` serves a list under `data.items` and
//! `/delay/{ms}` sleeps before answering.

use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::{HeaderMap, Method, StatusCode, Uri},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::net::TcpListener;

/// What `/anything` saw.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    /// Query pairs in arrival order.
    pub args: Vec<(String, String)>,
    /// Lowercased header names; repeated headers keep the last value.
    pub headers: BTreeMap<String, String>,
    /// Body as UTF-8, lossily decoded.
    pub body: String,
    /// Body parsed as JSON, when it is JSON.
    pub json: Option<Value>,
}

impl Echo {
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

pub fn app() -> Router {
    Router::new()
        .route("/anything", any(echo))
        .route("/anything/{*rest}", any(echo))
        .route("/status/{code}", any(status))
        .route("/nested", get(nested))
        .route("/delay/{ms}", any(delay))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(
    method: Method,
    uri: Uri,
    Query(args): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    tracing::debug!(%method, %uri, bytes = body.len(), "echo");
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        args,
        headers,
        json: serde_json::from_slice(&body).ok(),
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn nested() -> Json<Value> {
    Json(json!({
        "data": {
            "items": [
                { "id": 1, "name": "first" },
                { "id": 2, "name": "second" },
            ]
        }
    }))
}

async fn delay(Path(ms): Path<u64>) -> StatusCode {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    StatusCode::OK
}
