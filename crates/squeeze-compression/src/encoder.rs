//! Body encoders driven by the backend tiers

use crate::config::EncoderOptions;
use crate::encoding::Encoding;
use async_compression::tokio::bufread::{BrotliEncoder, GzipEncoder, ZlibEncoder, ZstdEncoder};
use async_compression::Level;
use bytes::Bytes;
use futures::TryStreamExt;
use http::HeaderMap;
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::BodyExt;
use pin_project::pin_project;
use squeeze_core::{body, Body, Error};
use std::io::{self, Write};
use std::mem;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::AsyncRead;
use tokio_util::io::{ReaderStream, StreamReader};

/// Pipe a body through one of the async-compression encoders
///
/// The encoder only pulls input when it needs more and only produces output
/// when polled, so backpressure flows from the sink to the source.
pub(crate) fn encode_async(body: Body, encoding: Encoding, level: i32) -> Body {
    let input = body
        .into_data_stream()
        .map_err(io::Error::other);
    let reader = StreamReader::new(input);
    let quality = Level::Precise(level);

    let encoder: Pin<Box<dyn AsyncRead + Send>> = match encoding {
        Encoding::Zstd => Box::pin(ZstdEncoder::with_quality(reader, quality)),
        Encoding::Brotli => Box::pin(BrotliEncoder::with_quality(reader, quality)),
        Encoding::Gzip => Box::pin(GzipEncoder::with_quality(reader, quality)),
        Encoding::Deflate => Box::pin(ZlibEncoder::with_quality(reader, quality)),
    };

    body::from_stream(ReaderStream::new(encoder).map_err(unwrap_source_error))
}

/// Recover an upstream body error that travelled through the encoder as I/O
fn unwrap_source_error(err: io::Error) -> Error {
    if !err.get_ref().is_some_and(|inner| inner.is::<Error>()) {
        return Error::Io(err);
    }
    match err.into_inner().map(|inner| inner.downcast::<Error>()) {
        Some(Ok(source)) => *source,
        Some(Err(other)) => Error::Io(io::Error::other(other)),
        None => Error::Body("body stream failed".to_string()),
    }
}

/// Synchronous streaming encoder from the flate2, brotli and zstd crates
///
/// Compressed output accumulates in the encoder's own buffer until drained.
pub(crate) enum SyncEncoder {
    Gzip(flate2::write::GzEncoder<Vec<u8>>),
    Deflate(flate2::write::ZlibEncoder<Vec<u8>>),
    Brotli(Box<brotli::CompressorWriter<Vec<u8>>>),
    Zstd(zstd::stream::write::Encoder<'static, Vec<u8>>),
}

impl SyncEncoder {
    /// Options must already have been validated by the owning tier.
    pub(crate) fn new(encoding: Encoding, options: &EncoderOptions) -> io::Result<Self> {
        let level = options.level;
        let encoder = match encoding {
            Encoding::Gzip => Self::Gzip(flate2::write::GzEncoder::new(
                Vec::new(),
                flate2::Compression::new(level as u32),
            )),
            Encoding::Deflate => Self::Deflate(flate2::write::ZlibEncoder::new(
                Vec::new(),
                flate2::Compression::new(level as u32),
            )),
            Encoding::Brotli => {
                let lgwin = options.tuning.window_bits.unwrap_or(22);
                Self::Brotli(Box::new(brotli::CompressorWriter::new(
                    Vec::new(),
                    4096,
                    level as u32,
                    lgwin,
                )))
            }
            Encoding::Zstd => {
                let mut encoder = zstd::stream::write::Encoder::new(Vec::new(), level)?;
                if let Some(window_log) = options.tuning.window_bits {
                    encoder.set_parameter(zstd::zstd_safe::CParameter::WindowLog(window_log))?;
                }
                if let Some(checksum) = options.tuning.checksum {
                    encoder.include_checksum(checksum)?;
                }
                Self::Zstd(encoder)
            }
        };
        Ok(encoder)
    }

    /// Compress a chunk and flush it into the output buffer
    fn write_chunk(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            Self::Gzip(e) => e.write_all(data).and_then(|_| e.flush()),
            Self::Deflate(e) => e.write_all(data).and_then(|_| e.flush()),
            Self::Brotli(e) => e.write_all(data).and_then(|_| e.flush()),
            Self::Zstd(e) => e.write_all(data).and_then(|_| e.flush()),
        }
    }

    /// Drain the output produced so far
    fn take_output(&mut self) -> Bytes {
        let buf = match self {
            Self::Gzip(e) => e.get_mut(),
            Self::Deflate(e) => e.get_mut(),
            Self::Brotli(e) => e.get_mut(),
            Self::Zstd(e) => e.get_mut(),
        };
        Bytes::from(mem::take(buf))
    }

    /// Write the stream trailer and return the remaining output
    fn finish(self) -> io::Result<Bytes> {
        let buf = match self {
            Self::Gzip(e) => e.finish()?,
            Self::Deflate(e) => e.finish()?,
            Self::Brotli(e) => e.into_inner(),
            Self::Zstd(e) => e.finish()?,
        };
        Ok(Bytes::from(buf))
    }
}

/// Body that compresses each data frame of the inner body as it arrives
///
/// Every frame is flushed through the encoder so output is never held back
/// waiting for more input. Trailers are forwarded after the final block.
#[pin_project]
pub(crate) struct EncodeBody {
    #[pin]
    inner: Body,
    encoder: Option<SyncEncoder>,
    trailers: Option<HeaderMap>,
}

impl EncodeBody {
    pub(crate) fn new(inner: Body, encoder: SyncEncoder) -> Self {
        Self {
            inner,
            encoder: Some(encoder),
            trailers: None,
        }
    }
}

impl HttpBody for EncodeBody {
    type Data = Bytes;
    type Error = Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let mut this = self.project();

        loop {
            let Some(encoder) = this.encoder.as_mut() else {
                return Poll::Ready(this.trailers.take().map(|t| Ok(Frame::trailers(t))));
            };

            match ready!(this.inner.as_mut().poll_frame(cx)) {
                Some(Ok(frame)) => match frame.into_data() {
                    Ok(data) => {
                        encoder.write_chunk(&data)?;
                        let out = encoder.take_output();
                        if !out.is_empty() {
                            return Poll::Ready(Some(Ok(Frame::data(out))));
                        }
                    }
                    Err(frame) => {
                        if let Ok(trailers) = frame.into_trailers() {
                            *this.trailers = Some(trailers);
                        }
                    }
                },
                Some(Err(e)) => return Poll::Ready(Some(Err(e))),
                None => {
                    if let Some(encoder) = this.encoder.take() {
                        let out = encoder.finish()?;
                        if !out.is_empty() {
                            return Poll::Ready(Some(Ok(Frame::data(out))));
                        }
                    }
                }
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.encoder.is_none() && self.trailers.is_none()
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::default()
    }
}
