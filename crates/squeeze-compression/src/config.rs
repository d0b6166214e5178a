//! Configuration for compression middleware

use crate::backend::Backend;
use crate::context::CompressionFilter;
use crate::encoding::{Encoding, ACCEPTED_ENCODINGS};
use crate::rules;
use regex::Regex;
use serde::{Deserialize, Serialize};
use squeeze_core::{Error, Result};
use std::fmt;

/// Encoder tuning beyond the compression level
///
/// Which fields a backend tier accepts differs per tier; a tier that cannot
/// honour a field declines the request and the next tier is tried. Tuning
/// that no enabled built-in tier honours is rejected by validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncodingOptions {
    /// Base-two logarithm of the window size (brotli `lgwin`, zstd `windowLog`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_bits: Option<u32>,

    /// Append a content checksum to each frame (zstd)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<bool>,
}

impl EncodingOptions {
    /// Whether no tuning field is set
    pub fn is_empty(&self) -> bool {
        self.window_bits.is_none() && self.checksum.is_none()
    }
}

/// Level and tuning handed to a backend when a transform is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderOptions {
    /// Compression level, within the encoding's valid range
    pub level: i32,
    /// Extra tuning
    pub tuning: EncodingOptions,
}

impl EncoderOptions {
    /// Default level, no tuning
    pub fn defaults(encoding: Encoding) -> Self {
        Self {
            level: encoding.default_level(),
            tuning: EncodingOptions::default(),
        }
    }
}

/// Compression configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Force a single encoding, overrides `encodings`
    #[serde(default)]
    pub encoding: Option<Encoding>,

    /// Allowed encodings in order of preference
    #[serde(default = "default_encodings")]
    pub encodings: Vec<Encoding>,

    /// Encoding used when the client sends no `Accept-Encoding` header
    #[serde(default)]
    pub fallback: Option<Encoding>,

    /// Skip content-type and `Cache-Control: no-transform` checks
    #[serde(default)]
    pub force: bool,

    /// Honour the client's `x-no-compression` opt-out header
    #[serde(default = "default_true")]
    pub strict: bool,

    /// Stream compressed bodies instead of buffering them
    #[serde(default = "default_true")]
    pub streaming: bool,

    /// Allow the runtime-accelerated backend tier
    #[serde(default = "default_true")]
    pub accelerated: bool,

    /// Allow the general-purpose library backend tier
    #[serde(default = "default_true")]
    pub library: bool,

    /// Minimum response size to compress (in bytes)
    #[serde(default = "default_threshold")]
    pub threshold: u64,

    /// Custom pattern of compressible content types (case-insensitive)
    #[serde(default)]
    pub compressible_types: Option<String>,

    /// Zstandard level (1-22)
    #[serde(default)]
    pub zstd_level: Option<i32>,

    /// Zstandard tuning
    #[serde(default)]
    pub zstd_options: EncodingOptions,

    /// Brotli quality (0-11)
    #[serde(default)]
    pub brotli_level: Option<i32>,

    /// Brotli tuning
    #[serde(default)]
    pub brotli_options: EncodingOptions,

    /// Gzip level (0-9)
    #[serde(default)]
    pub gzip_level: Option<i32>,

    /// Gzip tuning
    #[serde(default)]
    pub gzip_options: EncodingOptions,

    /// Deflate level (0-9)
    #[serde(default)]
    pub deflate_level: Option<i32>,

    /// Deflate tuning
    #[serde(default)]
    pub deflate_options: EncodingOptions,

    /// Custom eligibility predicate, replaces the built-in checks
    #[serde(skip)]
    pub filter: Option<CompressionFilter>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            encoding: None,
            encodings: default_encodings(),
            fallback: None,
            force: false,
            strict: true,
            streaming: true,
            accelerated: true,
            library: true,
            threshold: default_threshold(),
            compressible_types: None,
            zstd_level: None,
            zstd_options: EncodingOptions::default(),
            brotli_level: None,
            brotli_options: EncodingOptions::default(),
            gzip_level: None,
            gzip_options: EncodingOptions::default(),
            deflate_level: None,
            deflate_options: EncodingOptions::default(),
            filter: None,
        }
    }
}

impl fmt::Debug for CompressionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressionConfig")
            .field("encoding", &self.encoding)
            .field("encodings", &self.encodings)
            .field("fallback", &self.fallback)
            .field("force", &self.force)
            .field("strict", &self.strict)
            .field("streaming", &self.streaming)
            .field("accelerated", &self.accelerated)
            .field("library", &self.library)
            .field("threshold", &self.threshold)
            .field("compressible_types", &self.compressible_types)
            .field("filter", &self.filter.as_ref().map(|_| "<fn>"))
            .finish_non_exhaustive()
    }
}

fn default_true() -> bool {
    true
}

fn default_threshold() -> u64 {
    1024
}

fn default_encodings() -> Vec<Encoding> {
    ACCEPTED_ENCODINGS.to_vec()
}

impl CompressionConfig {
    /// Configured level and tuning for an encoding
    fn tuning(&self, encoding: Encoding) -> (Option<i32>, EncodingOptions) {
        match encoding {
            Encoding::Zstd => (self.zstd_level, self.zstd_options),
            Encoding::Brotli => (self.brotli_level, self.brotli_options),
            Encoding::Gzip => (self.gzip_level, self.gzip_options),
            Encoding::Deflate => (self.deflate_level, self.deflate_options),
        }
    }

    /// Some enabled built-in tier accepts these options
    fn tuning_supported(&self, encoding: Encoding, options: &EncoderOptions) -> bool {
        Backend::ALL
            .into_iter()
            .filter(|backend| match backend {
                Backend::Accelerated => self.accelerated,
                Backend::Library => self.library,
                Backend::Standard => true,
            })
            .any(|backend| backend.check_options(encoding, options).is_ok())
    }

    /// Validate the configuration and freeze it
    pub fn validate(&self) -> Result<CompressionSettings> {
        let encodings = match self.encoding {
            Some(encoding) => vec![encoding],
            None => {
                if self.encodings.is_empty() {
                    return Err(Error::Config(
                        "encodings must list at least one encoding".to_string(),
                    ));
                }
                let mut seen = Vec::with_capacity(self.encodings.len());
                for encoding in &self.encodings {
                    if seen.contains(encoding) {
                        return Err(Error::Config(format!(
                            "encoding '{encoding}' is listed more than once"
                        )));
                    }
                    seen.push(*encoding);
                }
                seen
            }
        };

        let mut options = [EncoderOptions::defaults(Encoding::Zstd); 4];
        for (slot, encoding) in options.iter_mut().zip(ACCEPTED_ENCODINGS) {
            let (level, tuning) = self.tuning(encoding);
            let level = level.unwrap_or_else(|| encoding.default_level());
            if !encoding.level_range().contains(&level) {
                let range = encoding.level_range();
                return Err(Error::Config(format!(
                    "{encoding} level {level} is out of range ({}-{})",
                    range.start(),
                    range.end()
                )));
            }
            let encoder_options = EncoderOptions { level, tuning };
            if !tuning.is_empty() && !self.tuning_supported(encoding, &encoder_options) {
                return Err(Error::Config(format!(
                    "{encoding} options {tuning:?} are not supported by any enabled backend"
                )));
            }
            *slot = encoder_options;
        }

        let compressible_types = match &self.compressible_types {
            Some(pattern) => Regex::new(&format!("(?i){pattern}")).map_err(|e| {
                Error::Config(format!("Invalid compressible_types pattern: {e}"))
            })?,
            None => rules::default_compressible_types(),
        };

        if self.threshold > 64 * 1024 * 1024 {
            tracing::warn!(
                threshold = self.threshold,
                "Compression threshold is very high, most responses will be teed in memory"
            );
        }

        Ok(CompressionSettings {
            encodings,
            fallback: self.fallback,
            force: self.force,
            strict: self.strict,
            streaming: self.streaming,
            accelerated: self.accelerated,
            library: self.library,
            threshold: self.threshold,
            compressible_types,
            options,
            filter: self.filter.clone(),
        })
    }
}

/// Validated, immutable form of [`CompressionConfig`]
///
/// Shared read-only by every request served through one middleware.
#[derive(Clone)]
pub struct CompressionSettings {
    pub(crate) encodings: Vec<Encoding>,
    pub(crate) fallback: Option<Encoding>,
    pub(crate) force: bool,
    pub(crate) strict: bool,
    pub(crate) streaming: bool,
    pub(crate) accelerated: bool,
    pub(crate) library: bool,
    pub(crate) threshold: u64,
    pub(crate) compressible_types: Regex,
    options: [EncoderOptions; 4],
    pub(crate) filter: Option<CompressionFilter>,
}

impl CompressionSettings {
    /// Allowed encodings in preference order
    pub fn encodings(&self) -> &[Encoding] {
        &self.encodings
    }

    /// Level and tuning for an encoding
    pub fn options(&self, encoding: Encoding) -> EncoderOptions {
        let index = ACCEPTED_ENCODINGS
            .iter()
            .position(|e| *e == encoding)
            .unwrap_or_default();
        self.options[index]
    }

    /// Minimum size, in bytes, of a compressed response
    pub fn threshold(&self) -> u64 {
        self.threshold
    }
}

impl fmt::Debug for CompressionSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompressionSettings")
            .field("encodings", &self.encodings)
            .field("fallback", &self.fallback)
            .field("force", &self.force)
            .field("strict", &self.strict)
            .field("streaming", &self.streaming)
            .field("threshold", &self.threshold)
            .field("has_filter", &self.filter.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompressionConfig::default();
        assert_eq!(config.threshold, 1024);
        assert!(config.strict);
        assert!(config.streaming);
        assert!(!config.force);
        assert_eq!(config.encodings.len(), 4);

        let settings = config.validate().unwrap();
        assert_eq!(settings.encodings(), &ACCEPTED_ENCODINGS);
        assert_eq!(settings.options(Encoding::Zstd).level, 2);
        assert_eq!(settings.options(Encoding::Brotli).level, 4);
        assert_eq!(settings.options(Encoding::Gzip).level, 6);
        assert_eq!(settings.options(Encoding::Deflate).level, 6);
    }

    #[test]
    fn test_forced_encoding_overrides_list() {
        let config = CompressionConfig {
            encoding: Some(Encoding::Deflate),
            encodings: vec![Encoding::Gzip, Encoding::Brotli],
            ..Default::default()
        };
        let settings = config.validate().unwrap();
        assert_eq!(settings.encodings(), &[Encoding::Deflate]);
    }

    #[test]
    fn test_level_out_of_range() {
        let config = CompressionConfig {
            brotli_level: Some(12),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("br level 12"));

        let config = CompressionConfig {
            gzip_level: Some(-1),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CompressionConfig {
            zstd_level: Some(22),
            deflate_level: Some(0),
            ..Default::default()
        };
        let settings = config.validate().unwrap();
        assert_eq!(settings.options(Encoding::Zstd).level, 22);
        assert_eq!(settings.options(Encoding::Deflate).level, 0);
    }

    #[test]
    fn test_unsupported_tuning_rejected() {
        let config = CompressionConfig {
            encodings: vec![Encoding::Gzip],
            gzip_options: EncodingOptions {
                window_bits: Some(15),
                checksum: None,
            },
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("gzip options"));

        let config = CompressionConfig {
            brotli_options: EncodingOptions {
                window_bits: Some(30),
                checksum: None,
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let tuned = EncodingOptions {
            window_bits: Some(20),
            checksum: Some(true),
        };
        let config = CompressionConfig {
            zstd_options: tuned,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap().options(Encoding::Zstd).tuning, tuned);

        let config = CompressionConfig {
            zstd_options: tuned,
            library: false,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_and_duplicate_encodings() {
        let config = CompressionConfig {
            encodings: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = CompressionConfig {
            encodings: vec![Encoding::Gzip, Encoding::Gzip],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_content_type_pattern() {
        let config = CompressionConfig {
            compressible_types: Some("text/(".to_string()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_custom_content_type_pattern() {
        let config = CompressionConfig {
            compressible_types: Some("^application/x-ndjson".to_string()),
            ..Default::default()
        };
        let settings = config.validate().unwrap();
        assert!(settings.compressible_types.is_match("Application/X-NDJSON"));
        assert!(!settings.compressible_types.is_match("text/html"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: CompressionConfig = serde_json::from_str(
            r#"{"encodings": ["gzip", "br"], "threshold": 0, "brotli_level": 9,
                "zstd_options": {"window_bits": 20, "checksum": true}}"#,
        )
        .unwrap();

        assert_eq!(config.encodings, vec![Encoding::Gzip, Encoding::Brotli]);
        assert_eq!(config.threshold, 0);
        assert!(config.strict);
        assert_eq!(config.zstd_options.window_bits, Some(20));
        assert_eq!(config.zstd_options.checksum, Some(true));
        assert!(config.gzip_options.is_empty());

        let settings = config.validate().unwrap();
        assert_eq!(settings.options(Encoding::Brotli).level, 9);
    }

    #[test]
    fn test_deserialize_rejects_unknown_encoding() {
        let result: std::result::Result<CompressionConfig, _> =
            serde_json::from_str(r#"{"encodings": ["gzip", "lzma"]}"#);
        assert!(result.is_err());

        let result: std::result::Result<CompressionConfig, _> =
            serde_json::from_str(r#"{"gzip_options": {"memory": 8}}"#);
        assert!(result.is_err());
    }
}
