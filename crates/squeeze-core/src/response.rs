//! Response builder and utilities

use crate::{body, Body, Result};
use bytes::Bytes;
use http::{header, Response, StatusCode};
use serde::Serialize;

/// Response builder for convenient response construction
#[derive(Debug)]
pub struct ResponseBuilder {
    status: StatusCode,
    headers: Vec<(header::HeaderName, String)>,
}

impl ResponseBuilder {
    /// Create a new response builder
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    /// Set a header
    pub fn header(mut self, name: header::HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Build response with empty body
    pub fn build(self) -> Result<Response<Body>> {
        self.finish(None, body::empty())
    }

    /// Build response with text body
    pub fn text(self, text: impl Into<String>) -> Result<Response<Body>> {
        let bytes = Bytes::from(text.into());
        self.sized("text/plain; charset=utf-8", bytes)
    }

    /// Build response with JSON body
    pub fn json_body<T: Serialize>(self, value: &T) -> Result<Response<Body>> {
        let bytes = Bytes::from(serde_json::to_vec(value)?);
        self.sized("application/json", bytes)
    }

    /// Build response with raw bytes and the given content type
    pub fn bytes(self, content_type: &str, bytes: impl Into<Bytes>) -> Result<Response<Body>> {
        self.sized(content_type, bytes.into())
    }

    /// Build response with a streaming body of unknown length
    pub fn stream(self, content_type: &str, body: Body) -> Result<Response<Body>> {
        self.finish(Some(content_type), body)
    }

    fn sized(self, content_type: &str, bytes: Bytes) -> Result<Response<Body>> {
        let len = bytes.len();
        let mut response = self.finish(Some(content_type), body::full(bytes))?;
        response
            .headers_mut()
            .insert(header::CONTENT_LENGTH, header::HeaderValue::from(len));
        Ok(response)
    }

    fn finish(self, content_type: Option<&str>, body: Body) -> Result<Response<Body>> {
        let mut response = Response::builder().status(self.status);

        if let Some(content_type) = content_type {
            response = response.header(header::CONTENT_TYPE, content_type);
        }

        for (name, value) in self.headers {
            response = response.header(name, value);
        }

        Ok(response.body(body)?)
    }
}

/// Convenience functions for common responses
pub mod responses {
    use super::*;

    /// 200 OK
    pub fn ok() -> ResponseBuilder {
        ResponseBuilder::new(StatusCode::OK)
    }

    /// 404 Not Found
    pub fn not_found(message: impl Into<String>) -> Result<Response<Body>> {
        ResponseBuilder::new(StatusCode::NOT_FOUND).text(message)
    }
}
