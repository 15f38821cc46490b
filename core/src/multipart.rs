//! `multipart/form-data` bodies.
//!
//! A route carrying a `MultipartForm` skips parameter encoding entirely; the
//! merged parameters are written as leading text fields instead.

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::encoding::CONTENT_TYPE;
use crate::http::DraftRequest;
use crate::params::Parameters;

/// One named part of a multipart form.
#[derive(Debug, Clone, PartialEq)]
pub enum MultipartPart {
    Field {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        mime_type: String,
        data: Bytes,
    },
}

impl MultipartPart {
    pub fn field(name: impl Into<String>, value: impl Into<String>) -> Self {
        MultipartPart::Field {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn file(
        name: impl Into<String>,
        filename: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        MultipartPart::File {
            name: name.into(),
            filename: filename.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultipartForm {
    boundary: String,
    parts: Vec<MultipartPart>,
}

impl Default for MultipartForm {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartForm {
    /// Empty form with a random boundary.
    pub fn new() -> Self {
        Self::with_boundary(format!("routekit-{}", Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    pub fn part(mut self, part: MultipartPart) -> Self {
        self.parts.push(part);
        self
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn parts(&self) -> &[MultipartPart] {
        &self.parts
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Write the form into `request`, replacing any body and `Content-Type`.
    pub fn encode(&self, request: &mut DraftRequest, params: &Parameters) {
        let mut body = BytesMut::new();
        for (name, value) in params.iter() {
            self.write_field(&mut body, name, &value.to_string());
        }
        for part in &self.parts {
            match part {
                MultipartPart::Field { name, value } => self.write_field(&mut body, name, value),
                MultipartPart::File {
                    name,
                    filename,
                    mime_type,
                    data,
                } => {
                    self.write_delimiter(&mut body);
                    body.put_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                            escape_quotes(name),
                            escape_quotes(filename)
                        )
                        .as_bytes(),
                    );
                    body.put_slice(format!("Content-Type: {mime_type}\r\n\r\n").as_bytes());
                    body.put_slice(data);
                    body.put_slice(b"\r\n");
                }
            }
        }
        body.put_slice(format!("--{}--\r\n", self.boundary).as_bytes());

        request.body = Some(body.freeze());
        request.set_header(CONTENT_TYPE, &self.content_type());
    }

    fn write_delimiter(&self, body: &mut BytesMut) {
        body.put_slice(format!("--{}\r\n", self.boundary).as_bytes());
    }

    fn write_field(&self, body: &mut BytesMut, name: &str, value: &str) {
        self.write_delimiter(body);
        body.put_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                escape_quotes(name)
            )
            .as_bytes(),
        );
        body.put_slice(value.as_bytes());
        body.put_slice(b"\r\n");
    }
}

fn escape_quotes(value: &str) -> String {
    value.replace('"', "%22")
}
