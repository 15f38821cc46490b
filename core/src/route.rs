//! Declarative description of one HTTP exchange.

use crate::encoding::ParameterEncoding;
use crate::http::{Headers, HttpMethod};
use crate::multipart::MultipartForm;
use crate::params::{ParamValue, Parameters};

/// What to request, relative to a provider's base URL.
///
/// Built with the `with_*` methods and never mutated afterwards. Left unset,
/// `encoding` falls back to the provider's default for the method; a
/// multipart form replaces parameter encoding altogether.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    path: String,
    method: HttpMethod,
    params: Parameters,
    headers: Headers,
    encoding: Option<ParameterEncoding>,
    multipart: Option<MultipartForm>,
}

impl Route {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            params: Parameters::new(),
            headers: Vec::new(),
            encoding: None,
            multipart: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_params(mut self, params: Parameters) -> Self {
        self.params = params;
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(key, value);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_encoding(mut self, encoding: ParameterEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn with_multipart(mut self, form: MultipartForm) -> Self {
        self.multipart = Some(form);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn encoding(&self) -> Option<ParameterEncoding> {
        self.encoding
    }

    pub fn multipart(&self) -> Option<&MultipartForm> {
        self.multipart.as_ref()
    }
}
