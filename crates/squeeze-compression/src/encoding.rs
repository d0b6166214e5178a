//! Content codings understood by the middleware

use serde::{Deserialize, Serialize};
use squeeze_core::Error;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Supported compression encodings
///
/// Declaration order is the default preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Encoding {
    /// Zstandard
    Zstd,
    /// Brotli
    Brotli,
    /// Gzip
    Gzip,
    /// Zlib-wrapped deflate (the `deflate` HTTP coding)
    Deflate,
}

/// Every known encoding in default preference order
pub const ACCEPTED_ENCODINGS: [Encoding; 4] = [
    Encoding::Zstd,
    Encoding::Brotli,
    Encoding::Gzip,
    Encoding::Deflate,
];

impl Encoding {
    /// Get the Content-Encoding header value
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Zstd => "zstd",
            Self::Brotli => "br",
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
        }
    }

    /// Valid compression levels for this encoding
    pub fn level_range(&self) -> RangeInclusive<i32> {
        match self {
            Self::Zstd => 1..=22,
            Self::Brotli => 0..=11,
            Self::Gzip | Self::Deflate => 0..=9,
        }
    }

    /// Level used when none is configured
    pub fn default_level(&self) -> i32 {
        match self {
            Self::Zstd => 2,
            Self::Brotli => 4,
            Self::Gzip | Self::Deflate => 6,
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zstd" => Ok(Self::Zstd),
            "br" => Ok(Self::Brotli),
            "gzip" => Ok(Self::Gzip),
            "deflate" => Ok(Self::Deflate),
            other => Err(Error::Config(format!(
                "Invalid compression encoding: '{other}' (expected one of zstd, br, gzip, deflate)"
            ))),
        }
    }
}

impl TryFrom<String> for Encoding {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Encoding> for String {
    fn from(encoding: Encoding) -> Self {
        encoding.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_name() {
        assert_eq!(Encoding::Zstd.as_str(), "zstd");
        assert_eq!(Encoding::Brotli.as_str(), "br");
        assert_eq!(Encoding::Gzip.as_str(), "gzip");
        assert_eq!(Encoding::Deflate.as_str(), "deflate");
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("gzip".parse::<Encoding>().unwrap(), Encoding::Gzip);
        assert_eq!(" BR ".parse::<Encoding>().unwrap(), Encoding::Brotli);
        assert_eq!("Zstd".parse::<Encoding>().unwrap(), Encoding::Zstd);
        assert_eq!("deflate".parse::<Encoding>().unwrap(), Encoding::Deflate);

        let err = "lzma".parse::<Encoding>().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("lzma"));
    }

    #[test]
    fn test_default_levels_in_range() {
        for encoding in ACCEPTED_ENCODINGS {
            assert!(encoding.level_range().contains(&encoding.default_level()));
        }
    }

    #[test]
    fn test_serde_uses_header_names() {
        let json = serde_json::to_string(&vec![Encoding::Brotli, Encoding::Gzip]).unwrap();
        assert_eq!(json, r#"["br","gzip"]"#);

        let parsed: Vec<Encoding> = serde_json::from_str(r#"["zstd","deflate"]"#).unwrap();
        assert_eq!(parsed, vec![Encoding::Zstd, Encoding::Deflate]);

        assert!(serde_json::from_str::<Encoding>(r#""compress""#).is_err());
    }
}
