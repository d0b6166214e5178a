//! Streaming body type shared by every middleware in the chain

use crate::{Error, Result};
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use http_body::Frame;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};

/// Body type alias
///
/// Boxed so that middleware can swap a buffered body for a lazily produced one
/// without changing the chain's signature.
pub type Body = UnsyncBoxBody<Bytes, Error>;

/// Create a body holding the given bytes
pub fn full(data: impl Into<Bytes>) -> Body {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Create a body without any content
pub fn empty() -> Body {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Create a body from a stream of data chunks
pub fn from_stream<S>(stream: S) -> Body
where
    S: Stream<Item = Result<Bytes>> + Send + 'static,
{
    StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync()
}

/// Create a body from a stream of frames
pub fn from_frames<S>(stream: S) -> Body
where
    S: Stream<Item = Result<Frame<Bytes>>> + Send + 'static,
{
    StreamBody::new(stream).boxed_unsync()
}

/// Read a body to completion
pub async fn collect(body: Body) -> Result<Bytes> {
    Ok(body.collect().await?.to_bytes())
}

/// Map a foreign body error into [`Error::Body`]
pub fn body_error(err: impl std::fmt::Display) -> Error {
    Error::Body(err.to_string())
}
