//! The provider contract: shared defaults and validation policy for one API.
//!
//! # Design
//! Implementors only have to supply `base_url`; every other hook has a
//! default. Providers are shared behind an `Arc` by the client and by every
//! request handle they produce, so they carry no per-request state.

use url::Url;

use crate::encoding::ParameterEncoding;
use crate::error::{ApiError, TransportError};
use crate::http::{Headers, HttpMethod};
use crate::params::Parameters;

/// Defaults and policy applied to every route sent through an `ApiClient`.
pub trait Provider: Send + Sync {
    /// Base URL that route paths are appended to.
    fn base_url(&self) -> &Url;

    /// Headers sent with every request. Route headers win on collision.
    fn additional_headers(&self) -> Headers {
        Headers::new()
    }

    /// Parameters sent with every request. Route parameters win on collision.
    fn additional_params(&self) -> Parameters {
        Parameters::new()
    }

    /// Encoding used when a route does not pick one.
    fn default_encoding(&self, method: HttpMethod) -> ParameterEncoding {
        ParameterEncoding::for_method(method)
    }

    /// Decide whether an exchange succeeded.
    fn validate(
        &self,
        status: Option<u16>,
        body: &[u8],
        transport_error: Option<&TransportError>,
    ) -> Result<(), ApiError> {
        validate_default(status, body, transport_error)
    }

    /// Returning `false` swallows `error`: the request's completion never
    /// fires. Providers use this to divert failures into their own flows.
    fn should_continue(&self, _error: &ApiError) -> bool {
        true
    }
}

/// Transport failures become `NetworkingError`, statuses above 399 become
/// `StatusCodeError`, everything else passes.
pub fn validate_default(
    status: Option<u16>,
    _body: &[u8],
    transport_error: Option<&TransportError>,
) -> Result<(), ApiError> {
    if let Some(err) = transport_error {
        return Err(ApiError::NetworkingError(err.clone()));
    }
    match status {
        Some(code) if code > 399 => Err(ApiError::StatusCodeError(code)),
        _ => Ok(()),
    }
}

/// Provider with nothing but a base URL. Backs `Session::fetch`.
#[derive(Debug, Clone)]
pub struct BareProvider {
    base_url: Url,
}

impl BareProvider {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }
}

impl Provider for BareProvider {
    fn base_url(&self) -> &Url {
        &self.base_url
    }
}
