//! Eligibility checks and encoding selection

use crate::accept::AcceptEncoding;
use crate::config::CompressionSettings;
use crate::context::CompressionContext;
use crate::encoding::Encoding;
use crate::environment::Environment;
use crate::rules;
use http::{Method, StatusCode};
use http_body::Body as _;
use squeeze_core::RequestHead;
use std::fmt;

/// Client header opting out of compression
pub const NO_COMPRESSION_HEADER: &str = "x-no-compression";

/// Why a response was left untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `HEAD` request
    HeadRequest,
    /// Client sent `x-no-compression`
    ClientOptOut,
    /// Response carries no body
    NoBody,
    /// Body smaller than the threshold
    BelowThreshold,
    /// Response already has a content or transfer coding
    AlreadyEncoded,
    /// Content type not in the compressible policy
    NotCompressible,
    /// `Cache-Control: no-transform`
    NoTransform,
    /// Hosting platform compresses responses itself
    PlatformCompresses,
    /// Custom filter returned false
    Filtered,
    /// Client accepts none of the allowed encodings
    NotAcceptable,
    /// No backend tier could encode any candidate
    NoBackend,
}

impl SkipReason {
    /// Short name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::HeadRequest => "head_request",
            SkipReason::ClientOptOut => "client_opt_out",
            SkipReason::NoBody => "no_body",
            SkipReason::BelowThreshold => "below_threshold",
            SkipReason::AlreadyEncoded => "already_encoded",
            SkipReason::NotCompressible => "not_compressible",
            SkipReason::NoTransform => "no_transform",
            SkipReason::PlatformCompresses => "platform_compresses",
            SkipReason::Filtered => "filtered",
            SkipReason::NotAcceptable => "not_acceptable",
            SkipReason::NoBackend => "no_backend",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the checks that only need headers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Eligibility {
    /// Leave the response as is
    Skip(SkipReason),
    /// Compress; the body length is known or irrelevant
    Eligible,
    /// Compress if at least this many bytes turn up in the body
    Probe(u64),
}

/// Decides whether and how one response gets compressed
pub(crate) struct Negotiator<'a> {
    settings: &'a CompressionSettings,
    environment: Environment,
}

impl<'a> Negotiator<'a> {
    pub(crate) fn new(settings: &'a CompressionSettings, environment: Environment) -> Self {
        Self {
            settings,
            environment,
        }
    }

    /// Run the eligibility checks in order, stopping at the first veto
    ///
    /// A configured filter replaces every check except the empty-body one.
    pub(crate) fn eligibility(&self, ctx: &CompressionContext<'_>) -> Eligibility {
        let response = ctx.response;

        if let Some(filter) = &self.settings.filter {
            if response.body().is_end_stream() {
                return Eligibility::Skip(SkipReason::NoBody);
            }
            return if filter(ctx) {
                Eligibility::Eligible
            } else {
                Eligibility::Skip(SkipReason::Filtered)
            };
        }

        if *ctx.method() == Method::HEAD {
            return Eligibility::Skip(SkipReason::HeadRequest);
        }

        if self.settings.strict && ctx.request.headers.contains_key(NO_COMPRESSION_HEADER) {
            return Eligibility::Skip(SkipReason::ClientOptOut);
        }

        let status = response.status();
        if status == StatusCode::NO_CONTENT
            || status == StatusCode::NOT_MODIFIED
            || response.body().is_end_stream()
        {
            return Eligibility::Skip(SkipReason::NoBody);
        }

        let headers = response.headers();
        let length =
            rules::declared_length(headers).or_else(|| response.body().size_hint().exact());
        match length {
            Some(0) => return Eligibility::Skip(SkipReason::NoBody),
            Some(len) if len < self.settings.threshold => {
                return Eligibility::Skip(SkipReason::BelowThreshold)
            }
            _ => {}
        }

        if !rules::is_encodable(headers) {
            return Eligibility::Skip(SkipReason::AlreadyEncoded);
        }

        if !self.settings.force {
            if !rules::is_compressible(headers, &self.settings.compressible_types) {
                return Eligibility::Skip(SkipReason::NotCompressible);
            }
            if !rules::is_transformable(headers) {
                return Eligibility::Skip(SkipReason::NoTransform);
            }
        }

        if self.environment.compresses_responses() {
            return Eligibility::Skip(SkipReason::PlatformCompresses);
        }

        match length {
            Some(_) => Eligibility::Eligible,
            None => Eligibility::Probe(self.settings.threshold.max(1)),
        }
    }

    /// Encodings to try, in order, for this client
    ///
    /// The configured order wins over the client's quality values. The
    /// fallback is only used when the client sent no `Accept-Encoding` at
    /// all, or when compression is forced.
    pub(crate) fn candidates(&self, request: &RequestHead) -> Result<Vec<Encoding>, SkipReason> {
        if let Some(raw) = rules::accept_encoding(&request.headers) {
            let accept = AcceptEncoding::parse(&raw);
            let accepted: Vec<Encoding> = self
                .settings
                .encodings
                .iter()
                .copied()
                .filter(|encoding| accept.accepts(*encoding))
                .collect();
            if !accepted.is_empty() {
                return Ok(accepted);
            }
            if !self.settings.force {
                return Err(SkipReason::NotAcceptable);
            }
        }

        self.settings
            .fallback
            .map(|encoding| vec![encoding])
            .ok_or(SkipReason::NotAcceptable)
    }
}
