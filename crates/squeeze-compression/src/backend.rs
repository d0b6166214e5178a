//! Compression backend tiers
//!
//! Each tier declares statically which encodings it handles and validates the
//! options it is given. A tier that cannot honour the options declines with
//! [`BackendError::InvalidOptions`] and the resolver moves on to the next one.

use crate::config::EncoderOptions;
use crate::encoder::{self, EncodeBody, SyncEncoder};
use crate::encoding::Encoding;
use http_body_util::BodyExt;
use squeeze_core::{Body, Error};
use std::fmt;

/// Error raised while constructing a transform
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Options are not valid for this tier; recoverable
    #[error("{backend} backend cannot encode {encoding} with these options: {reason}")]
    InvalidOptions {
        /// Backend tier name
        backend: &'static str,
        /// Requested encoding
        encoding: Encoding,
        /// Why the options were declined
        reason: String,
    },

    /// Encoder failed for any other reason; aborts the request
    #[error("{backend} backend failed to build a {encoding} encoder: {source}")]
    Failed {
        /// Backend tier name
        backend: &'static str,
        /// Requested encoding
        encoding: Encoding,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl BackendError {
    /// Whether the resolver may fall through to the next tier
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BackendError::InvalidOptions { .. })
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        let backend = match &err {
            BackendError::InvalidOptions { backend, .. } | BackendError::Failed { backend, .. } => {
                *backend
            }
        };
        Error::compression(backend, err.to_string())
    }
}

/// Capability interface shared by every backend tier
pub trait CompressionBackend: Send + Sync + fmt::Debug {
    /// Tier name used in logs
    fn name(&self) -> &'static str;

    /// Whether this tier can encode `encoding`; must be free of side effects
    fn can_handle(&self, encoding: Encoding) -> bool;

    /// Build a single-use transform for one response body
    fn construct(
        &self,
        encoding: Encoding,
        options: &EncoderOptions,
    ) -> Result<CompressionTransform, BackendError>;
}

enum TransformKind {
    Async { level: i32 },
    Sync(SyncEncoder),
    Custom(Box<dyn FnOnce(Body) -> Body + Send>),
}

/// Body transformer bound to one encoding and one options set
pub struct CompressionTransform {
    encoding: Encoding,
    backend: &'static str,
    kind: TransformKind,
}

impl CompressionTransform {
    /// Transform backed by an arbitrary body mapping
    pub fn from_fn<F>(encoding: Encoding, backend: &'static str, f: F) -> Self
    where
        F: FnOnce(Body) -> Body + Send + 'static,
    {
        Self {
            encoding,
            backend,
            kind: TransformKind::Custom(Box::new(f)),
        }
    }

    /// Encoding produced by this transform
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Name of the tier that built this transform
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    /// Pipe `body` through the encoder
    pub fn apply(self, body: Body) -> Body {
        match self.kind {
            TransformKind::Async { level } => encoder::encode_async(body, self.encoding, level),
            TransformKind::Sync(encoder) => EncodeBody::new(body, encoder).boxed_unsync(),
            TransformKind::Custom(f) => f(body),
        }
    }
}

impl fmt::Debug for CompressionTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressionTransform")
            .field("encoding", &self.encoding)
            .field("backend", &self.backend)
            .finish()
    }
}

/// Built-in backend tiers, in default preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Async streaming encoders driven by the tokio runtime
    Accelerated,
    /// General-purpose encoders from the flate2, brotli and zstd crates
    Library,
    /// Baseline deflate primitive, gzip and deflate only
    Standard,
}

const ALL_ENCODINGS: &[Encoding] = &[
    Encoding::Zstd,
    Encoding::Brotli,
    Encoding::Gzip,
    Encoding::Deflate,
];
const DEFLATE_FAMILY: &[Encoding] = &[Encoding::Gzip, Encoding::Deflate];

impl Backend {
    /// Every built-in tier, in default preference order
    pub const ALL: [Backend; 3] = [Backend::Accelerated, Backend::Library, Backend::Standard];

    /// Encodings this tier can produce
    pub fn encodings(&self) -> &'static [Encoding] {
        match self {
            Backend::Accelerated | Backend::Library => ALL_ENCODINGS,
            Backend::Standard => DEFLATE_FAMILY,
        }
    }

    /// Whether the current execution environment offers this tier
    ///
    /// The accelerated tier needs a tokio runtime to drive its encoders.
    pub fn is_available(&self) -> bool {
        match self {
            Backend::Accelerated => tokio::runtime::Handle::try_current().is_ok(),
            Backend::Library | Backend::Standard => true,
        }
    }

    fn invalid(&self, encoding: Encoding, reason: impl Into<String>) -> BackendError {
        BackendError::InvalidOptions {
            backend: self.name(),
            encoding,
            reason: reason.into(),
        }
    }

    pub(crate) fn check_options(&self, encoding: Encoding, options: &EncoderOptions) -> Result<(), BackendError> {
        if !self.can_handle(encoding) {
            return Err(self.invalid(encoding, "encoding not supported"));
        }

        let range = encoding.level_range();
        if !range.contains(&options.level) {
            return Err(self.invalid(
                encoding,
                format!(
                    "level {} outside {}-{}",
                    options.level,
                    range.start(),
                    range.end()
                ),
            ));
        }

        let tuning = &options.tuning;
        match (self, encoding) {
            (Backend::Accelerated | Backend::Standard, _) => {
                if !tuning.is_empty() {
                    return Err(self.invalid(encoding, "only a compression level is accepted"));
                }
            }
            (Backend::Library, Encoding::Brotli) => {
                if tuning.checksum.is_some() {
                    return Err(self.invalid(encoding, "checksum is not supported"));
                }
                if let Some(bits) = tuning.window_bits {
                    if !(10..=24).contains(&bits) {
                        return Err(self.invalid(encoding, format!("window_bits {bits} outside 10-24")));
                    }
                }
            }
            (Backend::Library, Encoding::Zstd) => {
                if let Some(bits) = tuning.window_bits {
                    if !(10..=30).contains(&bits) {
                        return Err(self.invalid(encoding, format!("window_bits {bits} outside 10-30")));
                    }
                }
            }
            (Backend::Library, Encoding::Gzip | Encoding::Deflate) => {
                if !tuning.is_empty() {
                    return Err(self.invalid(encoding, "only a compression level is accepted"));
                }
            }
        }

        Ok(())
    }
}

impl CompressionBackend for Backend {
    fn name(&self) -> &'static str {
        match self {
            Backend::Accelerated => "accelerated",
            Backend::Library => "library",
            Backend::Standard => "standard",
        }
    }

    fn can_handle(&self, encoding: Encoding) -> bool {
        self.encodings().contains(&encoding)
    }

    fn construct(
        &self,
        encoding: Encoding,
        options: &EncoderOptions,
    ) -> Result<CompressionTransform, BackendError> {
        self.check_options(encoding, options)?;

        let kind = match self {
            Backend::Accelerated => TransformKind::Async {
                level: options.level,
            },
            Backend::Library | Backend::Standard => {
                let encoder = SyncEncoder::new(encoding, options).map_err(|source| {
                    BackendError::Failed {
                        backend: self.name(),
                        encoding,
                        source,
                    }
                })?;
                TransformKind::Sync(encoder)
            }
        };

        Ok(CompressionTransform {
            encoding,
            backend: self.name(),
            kind,
        })
    }
}
