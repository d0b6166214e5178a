//! Negotiated response compression middleware for squeeze
//!
//! Compresses response bodies with zstd, brotli, gzip or deflate:
//! - `Accept-Encoding` negotiation with quality values and `*`
//! - Eligibility checks (method, size threshold, content type,
//!   `Cache-Control: no-transform`, existing codings, client opt-out)
//! - Tiered backends: an accelerated async tier, a general-purpose library
//!   tier and a standard deflate tier, tried in order
//! - Streaming or buffered rewriting that only touches `Content-Encoding`
//!   and `Content-Length`
//!
//! # Example
//!
//! ```no_run
//! use squeeze_compression::{CompressionBuilder, Encoding};
//!
//! # fn main() -> squeeze_core::Result<()> {
//! let middleware = CompressionBuilder::new()
//!     .encodings([Encoding::Brotli, Encoding::Gzip])
//!     .threshold(512)
//!     .build()?;
//! # let _ = middleware;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod accept;
pub mod backend;
pub mod builder;
pub mod config;
pub mod context;
mod encoder;
pub mod encoding;
pub mod environment;
pub mod loader;
pub mod middleware;
pub mod negotiator;
mod peek;
pub mod registry;
pub mod rewriter;
mod rules;

#[cfg(test)]
mod test_util;

pub use accept::AcceptEncoding;
pub use backend::{Backend, BackendError, CompressionBackend, CompressionTransform};
pub use builder::CompressionBuilder;
pub use config::{CompressionConfig, CompressionSettings, EncoderOptions, EncodingOptions};
pub use context::{CompressionContext, CompressionFilter};
pub use encoding::{Encoding, ACCEPTED_ENCODINGS};
pub use environment::{Environment, Platform};
pub use loader::{load_from_file, load_from_str, ConfigFormat};
pub use middleware::CompressionMiddleware;
pub use negotiator::{SkipReason, NO_COMPRESSION_HEADER};
pub use registry::CapabilityRegistry;
pub use rewriter::RewriteMode;
pub use rules::COMPRESSIBLE_CONTENT_TYPE_PATTERN;

/// Build a compression middleware from a configuration
pub fn compress(config: CompressionConfig) -> squeeze_core::Result<CompressionMiddleware> {
    CompressionMiddleware::with_config(config)
}
