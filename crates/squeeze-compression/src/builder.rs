//! Fluent construction of [`CompressionMiddleware`]

use crate::config::{CompressionConfig, EncodingOptions};
use crate::context::CompressionContext;
use crate::encoding::Encoding;
use crate::middleware::CompressionMiddleware;
use crate::registry::CapabilityRegistry;
use squeeze_core::Result;
use std::sync::Arc;

/// Compression middleware builder
#[derive(Debug, Default)]
pub struct CompressionBuilder {
    config: CompressionConfig,
    registry: Option<Arc<CapabilityRegistry>>,
}

impl CompressionBuilder {
    /// Create a builder with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    #[must_use]
    pub fn from_config(config: CompressionConfig) -> Self {
        Self {
            config,
            registry: None,
        }
    }

    /// Always use a single encoding
    #[must_use]
    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.config.encoding = Some(encoding);
        self
    }

    /// Allowed encodings in order of preference
    #[must_use]
    pub fn encodings(mut self, encodings: impl IntoIterator<Item = Encoding>) -> Self {
        self.config.encodings = encodings.into_iter().collect();
        self
    }

    /// Encoding for clients that send no `Accept-Encoding`
    #[must_use]
    pub fn fallback(mut self, encoding: Encoding) -> Self {
        self.config.fallback = Some(encoding);
        self
    }

    /// Compress regardless of content type and `no-transform`
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.config.force = force;
        self
    }

    /// Honour `x-no-compression`
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.config.strict = strict;
        self
    }

    /// Stream or buffer compressed bodies
    #[must_use]
    pub fn streaming(mut self, streaming: bool) -> Self {
        self.config.streaming = streaming;
        self
    }

    /// Minimum body size in bytes
    #[must_use]
    pub fn threshold(mut self, threshold: u64) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// Custom compressible content-type pattern
    #[must_use]
    pub fn compressible_types(mut self, pattern: impl Into<String>) -> Self {
        self.config.compressible_types = Some(pattern.into());
        self
    }

    /// Enable or disable the accelerated tier
    #[must_use]
    pub fn accelerated(mut self, enabled: bool) -> Self {
        self.config.accelerated = enabled;
        self
    }

    /// Enable or disable the library tier
    #[must_use]
    pub fn library(mut self, enabled: bool) -> Self {
        self.config.library = enabled;
        self
    }

    /// Compression level for one encoding
    #[must_use]
    pub fn level(mut self, encoding: Encoding, level: i32) -> Self {
        let slot = match encoding {
            Encoding::Zstd => &mut self.config.zstd_level,
            Encoding::Brotli => &mut self.config.brotli_level,
            Encoding::Gzip => &mut self.config.gzip_level,
            Encoding::Deflate => &mut self.config.deflate_level,
        };
        *slot = Some(level);
        self
    }

    /// Encoder tuning for one encoding
    #[must_use]
    pub fn options(mut self, encoding: Encoding, options: EncodingOptions) -> Self {
        let slot = match encoding {
            Encoding::Zstd => &mut self.config.zstd_options,
            Encoding::Brotli => &mut self.config.brotli_options,
            Encoding::Gzip => &mut self.config.gzip_options,
            Encoding::Deflate => &mut self.config.deflate_options,
        };
        *slot = options;
        self
    }

    /// Replace the built-in eligibility checks with a predicate
    #[must_use]
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&CompressionContext<'_>) -> bool + Send + Sync + 'static,
    {
        self.config.filter = Some(Arc::new(filter));
        self
    }

    /// Use a specific capability registry instead of the process-wide one
    #[must_use]
    pub fn registry(mut self, registry: Arc<CapabilityRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Validate and build the middleware
    pub fn build(self) -> Result<CompressionMiddleware> {
        match self.registry {
            Some(registry) => CompressionMiddleware::with_registry(self.config, registry),
            None => CompressionMiddleware::with_config(self.config),
        }
    }
}
