//! Compression middleware implementation

use crate::config::{CompressionConfig, CompressionSettings};
use crate::context::CompressionContext;
use crate::negotiator::{Eligibility, Negotiator, SkipReason};
use crate::peek;
use crate::registry::CapabilityRegistry;
use crate::rewriter::{self, RewriteMode};
use async_trait::async_trait;
use http::{Request, Response};
use squeeze_core::{Body, Middleware, Next, RequestHead, Result};
use std::sync::Arc;
use tracing::debug;

/// Compression middleware
///
/// Negotiates an encoding with the client, resolves it against the backend
/// tiers of its [`CapabilityRegistry`] and rewrites the response body.
#[derive(Debug, Clone)]
pub struct CompressionMiddleware {
    settings: Arc<CompressionSettings>,
    registry: Arc<CapabilityRegistry>,
}

impl CompressionMiddleware {
    /// Middleware with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(CompressionConfig::default())
    }

    /// Middleware with a custom configuration and the process-wide registry
    pub fn with_config(config: CompressionConfig) -> Result<Self> {
        Self::with_registry(config, CapabilityRegistry::global())
    }

    /// Middleware with a custom configuration and registry
    pub fn with_registry(config: CompressionConfig, registry: Arc<CapabilityRegistry>) -> Result<Self> {
        let settings = config.validate()?;
        debug!(
            encodings = ?settings.encodings(),
            threshold = settings.threshold(),
            "Compression middleware configured"
        );
        Ok(Self {
            settings: Arc::new(settings),
            registry,
        })
    }

    /// Validated settings
    pub fn settings(&self) -> &CompressionSettings {
        &self.settings
    }

    async fn process(&self, request: &RequestHead, response: Response<Body>) -> Result<Response<Body>> {
        let negotiator = Negotiator::new(&self.settings, self.registry.environment());

        let eligibility = negotiator.eligibility(&CompressionContext::new(request, &response));
        let response = match eligibility {
            Eligibility::Skip(reason) => return Ok(skip(response, reason)),
            Eligibility::Eligible => response,
            Eligibility::Probe(limit) => {
                let (parts, body) = response.into_parts();
                let peeked = peek::peek(body, limit).await;
                let response = Response::from_parts(parts, peeked.body);
                if peeked.ended && peeked.seen < limit {
                    let reason = if peeked.seen == 0 {
                        SkipReason::NoBody
                    } else {
                        SkipReason::BelowThreshold
                    };
                    return Ok(skip(response, reason));
                }
                response
            }
        };

        let candidates = match negotiator.candidates(request) {
            Ok(candidates) => candidates,
            Err(reason) => return Ok(skip(response, reason)),
        };

        let Some(transform) = self.registry.resolve(&candidates, &self.settings)? else {
            return Ok(skip(response, SkipReason::NoBackend));
        };

        let mode = RewriteMode::select(self.settings.streaming, response.headers());
        debug!(
            encoding = %transform.encoding(),
            backend = transform.backend(),
            mode = ?mode,
            path = %request.uri.path(),
            "Compressing response"
        );

        rewriter::rewrite(response, transform, mode).await
    }
}

fn skip(response: Response<Body>, reason: SkipReason) -> Response<Body> {
    debug!(reason = reason.as_str(), "Compression skipped");
    response
}

#[async_trait]
impl Middleware for CompressionMiddleware {
    async fn call(&self, req: Request<Body>, next: Next) -> Result<Response<Body>> {
        let request = RequestHead::capture(&req);
        let response = next.run(req).await?;
        self.process(&request, response).await
    }
}
