//! Declarative HTTP request building on top of a pluggable transport.
//!
//! # Overview
//! A `Route` describes one endpoint: path, method, parameters, headers and
//! an optional encoding or multipart form. A `Provider` supplies the base URL
//! and the defaults shared by every route of one API, and decides which
//! responses count as failures. `ApiClient` combines the two into a
//! `DraftRequest` and hands it to a `Session`, which sends it through a
//! `Transport` and routes the outcome back to the returned `RequestHandle`.
//!
//! # Design
//! - Assembly is pure: `ApiClient::prepare` performs no I/O, so encoders and
//!   merge rules are testable without a network.
//! - The transport is a trait. The crate ships a blocking `ureq` transport
//!   behind the default `ureq` feature; tests plug in in-memory transports.
//! - The session's registry holds handles weakly. Dropping every clone of a
//!   handle before its outcome arrives means the outcome is discarded.
//! - `reactive` exposes a handle as a single-item `futures::Stream`.

pub mod client;
pub mod config;
pub mod encoding;
pub mod error;
pub mod http;
pub mod multipart;
pub mod params;
pub mod provider;
pub mod reactive;
mod registry;
pub mod request;
pub mod route;
pub mod session;
pub mod transport;
#[cfg(feature = "ureq")]
pub mod ureq_transport;

pub use client::ApiClient;
pub use config::{load_config, ClientConfig, ConfigError, ConfiguredProvider, TransportConfig};
pub use encoding::ParameterEncoding;
pub use error::{ApiError, TransportError, TransportErrorKind};
pub use http::{DraftRequest, Headers, HttpMethod, Response};
pub use multipart::{MultipartForm, MultipartPart};
pub use params::{ParamValue, Parameters};
pub use provider::{BareProvider, Provider};
pub use request::{HandleState, RequestHandle};
pub use route::Route;
pub use session::Session;
pub use transport::{TaskDelegate, TaskId, TaskOutcome, Transport};
#[cfg(feature = "ureq")]
pub use ureq_transport::UreqTransport;
