//! Error types surfaced through request completions.
//!
//! # Design
//! Every failure reaches the caller through the same completion channel,
//! whether it was detected before the request left the process (encoding,
//! URL resolution) or after (transport, status validation, decoding). The
//! variant tells the two apart.

use thiserror::Error;

use crate::params::Parameters;

/// Errors delivered to request completions.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The parameters cannot be represented in the chosen encoding.
    #[error("failed to encode parameters: {reason}")]
    ParameterEncodingError { params: Parameters, reason: String },

    /// The target URL could not be built.
    #[error("invalid URL: {0}")]
    InvalidUrlError(String),

    /// The transport failed before a response was received.
    #[error("networking error: {0}")]
    NetworkingError(#[from] TransportError),

    /// The server answered with a failure status.
    #[error("request failed with HTTP status {0}")]
    StatusCodeError(u16),

    /// Neither a response nor a transport error was produced.
    #[error("unknown error: {0}")]
    UnknownError(String),

    /// The response body did not decode into the requested type.
    #[error("failed to deserialize response at `{path}`: {reason}")]
    DeserializationError { path: String, reason: String },
}

/// Category of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Connect,
    Timeout,
    Io,
    Other,
}

/// A lower-level failure reported by a `Transport`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind:?}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_convert_into_networking_errors() {
        let err: ApiError = TransportError::new(TransportErrorKind::Timeout, "timed out").into();
        assert!(matches!(err, ApiError::NetworkingError(ref e) if e.kind == TransportErrorKind::Timeout));
        assert_eq!(err.to_string(), "networking error: Timeout: timed out");
    }

    #[test]
    fn status_error_mentions_code() {
        assert!(ApiError::StatusCodeError(404).to_string().contains("404"));
    }
}
