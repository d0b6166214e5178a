//! Capability registry and tier resolution

use crate::backend::{Backend, BackendError, CompressionBackend, CompressionTransform};
use crate::config::CompressionSettings;
use crate::encoding::Encoding;
use crate::environment::Environment;
use once_cell::sync::OnceCell;
use squeeze_core::Result;
use std::fmt;
use std::sync::Arc;

static GLOBAL: OnceCell<Arc<CapabilityRegistry>> = OnceCell::new();

/// Backend tiers and execution environment, probed once and read-only after
pub struct CapabilityRegistry {
    tiers: Vec<Arc<dyn CompressionBackend>>,
    environment: Environment,
}

impl CapabilityRegistry {
    /// Registry with explicit tiers, in preference order
    pub fn new(tiers: Vec<Arc<dyn CompressionBackend>>, environment: Environment) -> Self {
        Self { tiers, environment }
    }

    /// Probe the built-in tiers and the process environment
    pub fn detect() -> Self {
        let tiers = Backend::ALL
            .into_iter()
            .filter(|backend| backend.is_available())
            .map(|backend| Arc::new(backend) as Arc<dyn CompressionBackend>)
            .collect();
        Self::new(tiers, Environment::detect())
    }

    /// Process-wide registry, initialised on first use
    ///
    /// The first call should happen inside a tokio runtime, otherwise the
    /// accelerated tier is left out for the life of the process.
    pub fn global() -> Arc<Self> {
        GLOBAL
            .get_or_init(|| {
                let registry = Self::detect();
                tracing::info!(
                    tiers = ?registry.tier_names(),
                    platform = ?registry.environment.platform().map(|p| p.to_string()),
                    "Compression capability registry initialised"
                );
                Arc::new(registry)
            })
            .clone()
    }

    /// Tiers in preference order
    pub fn tiers(&self) -> &[Arc<dyn CompressionBackend>] {
        &self.tiers
    }

    /// Detected execution environment
    pub fn environment(&self) -> Environment {
        self.environment
    }

    fn tier_names(&self) -> Vec<&'static str> {
        self.tiers.iter().map(|t| t.name()).collect()
    }

    /// Build a transform for the first candidate encoding some tier can serve
    ///
    /// Tiers declining the options are skipped with a warning. Any other
    /// backend error aborts resolution. `Ok(None)` means every candidate
    /// was exhausted.
    pub fn resolve(
        &self,
        candidates: &[Encoding],
        settings: &CompressionSettings,
    ) -> Result<Option<CompressionTransform>> {
        for &encoding in candidates {
            if let Some(transform) = self.resolve_encoding(encoding, settings)? {
                return Ok(Some(transform));
            }
            tracing::warn!(
                encoding = %encoding,
                "No compression backend could encode, trying next accepted encoding"
            );
        }
        Ok(None)
    }

    fn resolve_encoding(
        &self,
        encoding: Encoding,
        settings: &CompressionSettings,
    ) -> Result<Option<CompressionTransform>, BackendError> {
        let options = settings.options(encoding);

        for tier in self.enabled_tiers(settings) {
            if !tier.can_handle(encoding) {
                continue;
            }
            match tier.construct(encoding, &options) {
                Ok(transform) => return Ok(Some(transform)),
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(backend = tier.name(), error = %err, "Falling back to next compression backend");
                }
                Err(err) => return Err(err),
            }
        }

        Ok(None)
    }

    fn enabled_tiers<'a>(
        &'a self,
        settings: &'a CompressionSettings,
    ) -> impl Iterator<Item = &'a Arc<dyn CompressionBackend>> + 'a {
        self.tiers.iter().filter(move |tier| match tier.name() {
            name if name == Backend::Accelerated.name() => settings.accelerated,
            name if name == Backend::Library.name() => settings.library,
            _ => true,
        })
    }
}

impl fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("tiers", &self.tier_names())
            .field("environment", &self.environment)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompressionConfig, EncoderOptions};
    use squeeze_core::{body, Error};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Copy)]
    enum Outcome {
        Build,
        Decline,
        Fail,
    }

    #[derive(Debug)]
    struct FakeBackend {
        name: &'static str,
        encodings: Vec<Encoding>,
        outcome: Outcome,
        calls: AtomicUsize,
    }

    impl FakeBackend {
        fn new(name: &'static str, encodings: &[Encoding], outcome: Outcome) -> Arc<Self> {
            Arc::new(Self {
                name,
                encodings: encodings.to_vec(),
                outcome,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl CompressionBackend for FakeBackend {
        fn name(&self) -> &'static str {
            self.name
        }

        fn can_handle(&self, encoding: Encoding) -> bool {
            self.encodings.contains(&encoding)
        }

        fn construct(
            &self,
            encoding: Encoding,
            _options: &EncoderOptions,
        ) -> Result<CompressionTransform, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcome {
                Outcome::Build => Ok(CompressionTransform::from_fn(encoding, self.name, |b| b)),
                Outcome::Decline => Err(BackendError::InvalidOptions {
                    backend: self.name,
                    encoding,
                    reason: "declined".to_string(),
                }),
                Outcome::Fail => Err(BackendError::Failed {
                    backend: self.name,
                    encoding,
                    source: std::io::Error::other("boom"),
                }),
            }
        }
    }

    fn registry(tiers: Vec<Arc<dyn CompressionBackend>>) -> CapabilityRegistry {
        CapabilityRegistry::new(tiers, Environment::default())
    }

    fn settings() -> CompressionSettings {
        CompressionConfig::default().validate().unwrap()
    }

    #[test]
    fn test_first_capable_tier_wins() {
        let first = FakeBackend::new("first", &[Encoding::Gzip], Outcome::Build);
        let second = FakeBackend::new("second", &[Encoding::Brotli, Encoding::Gzip], Outcome::Build);
        let registry = registry(vec![first.clone() as Arc<dyn CompressionBackend>, second.clone()]);

        let transform = registry
            .resolve(&[Encoding::Brotli, Encoding::Gzip], &settings())
            .unwrap()
            .unwrap();
        assert_eq!(transform.encoding(), Encoding::Brotli);
        assert_eq!(transform.backend(), "second");
        assert_eq!(first.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_declining_tier_falls_through() {
        let picky = FakeBackend::new("picky", &[Encoding::Zstd], Outcome::Decline);
        let plain = FakeBackend::new("plain", &[Encoding::Zstd], Outcome::Build);
        let registry = registry(vec![picky.clone() as Arc<dyn CompressionBackend>, plain]);

        let transform = registry.resolve(&[Encoding::Zstd], &settings()).unwrap().unwrap();
        assert_eq!(transform.backend(), "plain");
        assert_eq!(picky.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exhausted_encoding_moves_to_next_candidate() {
        let picky = FakeBackend::new("picky", &[Encoding::Zstd], Outcome::Decline);
        let gzip = FakeBackend::new("gzip-only", &[Encoding::Gzip], Outcome::Build);
        let registry = registry(vec![picky as Arc<dyn CompressionBackend>, gzip]);

        let transform = registry
            .resolve(&[Encoding::Zstd, Encoding::Gzip], &settings())
            .unwrap()
            .unwrap();
        assert_eq!(transform.encoding(), Encoding::Gzip);

        let none = registry.resolve(&[Encoding::Deflate], &settings()).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_unexpected_error_propagates() {
        let broken = FakeBackend::new("broken", &[Encoding::Gzip], Outcome::Fail);
        let spare = FakeBackend::new("spare", &[Encoding::Gzip], Outcome::Build);
        let registry = registry(vec![broken as Arc<dyn CompressionBackend>, spare.clone()]);

        let err = registry.resolve(&[Encoding::Gzip], &settings()).unwrap_err();
        assert!(matches!(err, Error::Compression { ref backend, .. } if backend == "broken"));
        assert_eq!(spare.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_disabled_tiers_are_skipped() {
        let registry = registry(vec![
            Arc::new(Backend::Library) as Arc<dyn CompressionBackend>,
            Arc::new(Backend::Standard),
        ]);

        let settings = CompressionConfig {
            library: false,
            ..Default::default()
        }
        .validate()
        .unwrap();

        let transform = registry
            .resolve(&[Encoding::Brotli, Encoding::Gzip], &settings)
            .unwrap()
            .unwrap();
        assert_eq!(transform.encoding(), Encoding::Gzip);
        assert_eq!(transform.backend(), "standard");
    }

    #[test]
    fn test_tuning_skips_accelerated_tier() {
        let registry = registry(
            Backend::ALL
                .into_iter()
                .map(|b| Arc::new(b) as Arc<dyn CompressionBackend>)
                .collect(),
        );
        let settings = CompressionConfig {
            zstd_options: crate::config::EncodingOptions {
                window_bits: Some(20),
                checksum: None,
            },
            ..Default::default()
        }
        .validate()
        .unwrap();

        let transform = registry.resolve(&[Encoding::Zstd], &settings).unwrap().unwrap();
        assert_eq!(transform.backend(), "library");
    }

    #[tokio::test]
    async fn test_detect_inside_runtime() {
        let registry = CapabilityRegistry::detect();
        let names = registry.tier_names();
        assert_eq!(names, vec!["accelerated", "library", "standard"]);

        let global = CapabilityRegistry::global();
        assert!(Arc::ptr_eq(&global, &CapabilityRegistry::global()));

        let transform = registry
            .resolve(&[Encoding::Gzip], &settings())
            .unwrap()
            .unwrap();
        let encoded = body::collect(transform.apply(body::full("x".repeat(64)))).await.unwrap();
        assert!(!encoded.is_empty());
    }
}
