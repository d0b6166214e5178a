//! Request head captured for middleware decisions

use http::{HeaderMap, Method, Request, Uri};

/// Read-only view of a request, kept after the request itself has been
/// handed to the rest of the chain
#[derive(Debug, Clone)]
pub struct RequestHead {
    /// HTTP method
    pub method: Method,

    /// Request URI
    pub uri: Uri,

    /// Request headers
    pub headers: HeaderMap,
}

impl RequestHead {
    /// Capture the head of a request
    pub fn capture<B>(req: &Request<B>) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            headers: req.headers().clone(),
        }
    }
}
