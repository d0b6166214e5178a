//! `Accept-Encoding` parsing

use crate::encoding::Encoding;

/// One coding listed by the client
#[derive(Debug, Clone, PartialEq)]
struct Coding {
    name: String,
    quality: f32,
}

/// Parsed `Accept-Encoding` header
///
/// Quality values only decide acceptance (`q=0` rejects a coding). The
/// server's configured order decides preference among accepted codings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcceptEncoding {
    codings: Vec<Coding>,
}

impl AcceptEncoding {
    /// Parse a header value such as `gzip, deflate;q=0.5, br;q=0`
    pub fn parse(header: &str) -> Self {
        let codings = header
            .split(',')
            .filter_map(|item| {
                let mut parts = item.split(';');
                let name = parts.next()?.trim().to_ascii_lowercase();
                if name.is_empty() {
                    return None;
                }
                let quality = parts
                    .filter_map(|param| {
                        let (key, value) = param.split_once('=')?;
                        key.trim()
                            .eq_ignore_ascii_case("q")
                            .then(|| value.trim().parse::<f32>().ok())
                            .flatten()
                    })
                    .next()
                    .unwrap_or(1.0);
                Some(Coding { name, quality })
            })
            .collect();

        Self { codings }
    }

    /// Whether the client accepts the given encoding
    pub fn accepts(&self, encoding: Encoding) -> bool {
        if let Some(coding) = self.find(encoding.as_str()) {
            return coding.quality > 0.0;
        }
        self.find("*").is_some_and(|wildcard| wildcard.quality > 0.0)
    }

    /// Whether the header listed no codings at all
    pub fn is_empty(&self) -> bool {
        self.codings.is_empty()
    }

    fn find(&self, name: &str) -> Option<&Coding> {
        self.codings.iter().find(|c| c.name == name)
    }
}
