//! Response rewriting once a transform has been resolved

use crate::backend::CompressionTransform;
use crate::rules;
use http::header::{CONTENT_ENCODING, CONTENT_LENGTH};
use http::{HeaderMap, HeaderValue, Response};
use squeeze_core::{body, Body, Result};

/// How the compressed body is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    /// Encode lazily as the body is polled, length unknown
    Streaming,
    /// Encode the whole body up front and send an exact length
    Buffered,
}

impl RewriteMode {
    /// Mode for a response; chunked responses always stream
    pub(crate) fn select(streaming: bool, headers: &HeaderMap) -> Self {
        if streaming || rules::is_chunked(headers) {
            RewriteMode::Streaming
        } else {
            RewriteMode::Buffered
        }
    }
}

/// Splice `transform` into the response body
///
/// Only `Content-Encoding` and `Content-Length` change. Status, extensions
/// and every other header are carried over as they are.
pub(crate) async fn rewrite(
    response: Response<Body>,
    transform: CompressionTransform,
    mode: RewriteMode,
) -> Result<Response<Body>> {
    let (mut parts, inner) = response.into_parts();
    let encoding = transform.encoding();
    let encoded = transform.apply(inner);

    parts
        .headers
        .insert(CONTENT_ENCODING, HeaderValue::from_static(encoding.as_str()));

    let body = match mode {
        RewriteMode::Streaming => {
            parts.headers.remove(CONTENT_LENGTH);
            encoded
        }
        RewriteMode::Buffered => {
            let bytes = body::collect(encoded).await?;
            parts
                .headers
                .insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
            body::full(bytes)
        }
    };

    Ok(Response::from_parts(parts, body))
}
