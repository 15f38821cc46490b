//! Parameter encoding into a draft request.
//!
//! # Design
//! Each mode mutates exactly one part of the request: the URL query for
//! `UrlQuery`, the body (plus a default `Content-Type`) for the two body
//! modes. Keys and values are always percent-encoded with the
//! `application/x-www-form-urlencoded` rules, so a value containing `&` or
//! `=` cannot split into extra pairs.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::error::ApiError;
use crate::http::{DraftRequest, HttpMethod};
use crate::params::Parameters;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Where and how route parameters are written into a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterEncoding {
    UrlQuery,
    JsonBody,
    UrlEncodedBody,
}

impl ParameterEncoding {
    /// Default mode for a method: bodies for `POST`/`PUT`, the query for
    /// everything else.
    pub fn for_method(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Post | HttpMethod::Put => ParameterEncoding::JsonBody,
            HttpMethod::Get
            | HttpMethod::Connect
            | HttpMethod::Head
            | HttpMethod::Options
            | HttpMethod::Patch
            | HttpMethod::Delete
            | HttpMethod::Trace => ParameterEncoding::UrlQuery,
        }
    }

    /// Write `params` into `request`. Empty parameters leave it untouched.
    pub fn encode(self, request: &mut DraftRequest, params: &Parameters) -> Result<(), ApiError> {
        if params.is_empty() {
            return Ok(());
        }
        tracing::trace!(mode = ?self, count = params.len(), "encoding parameters");

        match self {
            ParameterEncoding::UrlQuery => {
                let mut pairs = request.url.query_pairs_mut();
                for (key, value) in params.iter() {
                    pairs.append_pair(key, &value.to_string());
                }
            }
            ParameterEncoding::JsonBody => {
                let json = params.to_json().map_err(|reason| ApiError::ParameterEncodingError {
                    params: params.clone(),
                    reason,
                })?;
                let body = serde_json::to_vec(&json).map_err(|e| ApiError::ParameterEncodingError {
                    params: params.clone(),
                    reason: e.to_string(),
                })?;
                request.body = Some(Bytes::from(body));
                request.set_header_if_absent(CONTENT_TYPE, JSON_CONTENT_TYPE);
            }
            ParameterEncoding::UrlEncodedBody => {
                request.body = Some(Bytes::from(form_string(params)));
                request.set_header_if_absent(CONTENT_TYPE, FORM_CONTENT_TYPE);
            }
        }
        Ok(())
    }
}

/// `key=value` pairs joined by `&`, percent-encoded.
pub fn form_string(params: &Parameters) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params.iter() {
        serializer.append_pair(key, &value.to_string());
    }
    serializer.finish()
}
