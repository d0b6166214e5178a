//! View of one request/response pair handed to eligibility checks

use crate::rules;
use http::{Method, Response};
use squeeze_core::{Body, RequestHead};
use std::sync::Arc;

/// Custom eligibility predicate
///
/// When configured it replaces every built-in eligibility check.
pub type CompressionFilter = Arc<dyn Fn(&CompressionContext<'_>) -> bool + Send + Sync>;

/// Request head plus the response produced by the rest of the chain
#[derive(Debug)]
pub struct CompressionContext<'a> {
    /// Request as seen before the chain ran
    pub request: &'a RequestHead,
    /// Response produced by the chain
    pub response: &'a Response<Body>,
}

impl<'a> CompressionContext<'a> {
    /// Create a new context
    pub fn new(request: &'a RequestHead, response: &'a Response<Body>) -> Self {
        Self { request, response }
    }

    /// Request method
    pub fn method(&self) -> &Method {
        &self.request.method
    }

    /// `Accept-Encoding` list joined across header lines, `None` when the
    /// client sent no header
    pub fn accept_encoding(&self) -> Option<String> {
        rules::accept_encoding(&self.request.headers)
    }
}
