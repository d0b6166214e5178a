//! Size probing for bodies of unknown length

use bytes::Bytes;
use futures::StreamExt;
use http_body::Frame;
use http_body_util::{BodyExt, BodyStream};
use squeeze_core::{body, Body, Result};

/// Body after probing, with the probed frames replayed in front
pub(crate) struct Peeked {
    pub(crate) body: Body,
    /// Data bytes read while probing
    pub(crate) seen: u64,
    /// Whether the body ended (or failed) while probing
    pub(crate) ended: bool,
}

/// Read frames until `limit` data bytes have been seen or the body ends
///
/// Nothing is lost: every frame read, including a trailing error, is handed
/// back in order through [`Peeked::body`].
pub(crate) async fn peek(mut inner: Body, limit: u64) -> Peeked {
    let mut frames: Vec<Result<Frame<Bytes>>> = Vec::new();
    let mut seen = 0u64;
    let mut ended = false;

    while seen < limit {
        match inner.frame().await {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    seen += data.len() as u64;
                }
                frames.push(Ok(frame));
            }
            Some(Err(e)) => {
                frames.push(Err(e));
                ended = true;
                break;
            }
            None => {
                ended = true;
                break;
            }
        }
    }

    let replay = futures::stream::iter(frames);
    let body = if ended {
        body::from_frames(replay)
    } else {
        body::from_frames(replay.chain(BodyStream::new(inner)))
    };

    Peeked { body, seen, ended }
}
