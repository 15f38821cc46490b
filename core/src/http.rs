//! HTTP data types shared by the encoder, the session and the transports.
//!
//! # Design
//! Requests and responses are plain data. The assembly code mutates a
//! `DraftRequest` in place, then hands it to a `Transport`, which owns the
//! actual I/O. Headers are kept as an ordered list of pairs so the order in
//! which they were applied is preserved on the wire; lookups are
//! case-insensitive as HTTP requires.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ApiError;

/// Ordered header list. Names compare case-insensitively.
pub type Headers = Vec<(String, String)>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Connect,
    Trace,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            "CONNECT" => Ok(HttpMethod::Connect),
            "TRACE" => Ok(HttpMethod::Trace),
            other => Err(format!("unknown HTTP method: {other}")),
        }
    }
}

/// Look up a header value by case-insensitive name.
pub fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Set a header, replacing an existing entry with the same name in place.
pub fn set_header(headers: &mut Headers, name: &str, value: &str) {
    match headers.iter_mut().find(|(key, _)| key.eq_ignore_ascii_case(name)) {
        Some(entry) => entry.1 = value.to_string(),
        None => headers.push((name.to_string(), value.to_string())),
    }
}

/// A request under construction.
///
/// Built by `ApiClient` from a `Route`; the encoders mutate it in place and
/// the session hands it to the transport once assembly succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<Bytes>,
}

impl DraftRequest {
    pub fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header(&self.headers, name)
    }

    pub fn set_header(&mut self, name: &str, value: &str) {
        set_header(&mut self.headers, name, value);
    }

    /// Set `name` only when the request does not carry it yet.
    pub fn set_header_if_absent(&mut self, name: &str, value: &str) {
        if self.header(name).is_none() {
            self.headers.push((name.to_string(), value.to_string()));
        }
    }
}

/// A validated HTTP response handed to completions.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

impl Response {
    pub fn header(&self, name: &str) -> Option<&str> {
        header(&self.headers, name)
    }

    /// Body as UTF-8 text, lossy.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the whole body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, ApiError> {
        self.json_at(None)
    }

    /// Decode the JSON value found under a dotted `root_key` path.
    ///
    /// Each segment selects an object member, or an array element when the
    /// segment is a number (`"data.items.0"`).
    pub fn json_at<T: serde::de::DeserializeOwned>(
        &self,
        root_key: Option<&str>,
    ) -> Result<T, ApiError> {
        let path = root_key.unwrap_or("$");
        let root: serde_json::Value = serde_json::from_slice(&self.body).map_err(|e| {
            ApiError::DeserializationError {
                path: path.to_string(),
                reason: e.to_string(),
            }
        })?;

        let mut node = &root;
        if let Some(key_path) = root_key {
            for segment in key_path.split('.').filter(|s| !s.is_empty()) {
                let next = match node {
                    serde_json::Value::Object(map) => map.get(segment),
                    serde_json::Value::Array(items) => {
                        segment.parse::<usize>().ok().and_then(|i| items.get(i))
                    }
                    _ => None,
                };
                node = next.ok_or_else(|| ApiError::DeserializationError {
                    path: path.to_string(),
                    reason: format!("key `{segment}` not found"),
                })?;
            }
        }

        T::deserialize(node).map_err(|e| ApiError::DeserializationError {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}
