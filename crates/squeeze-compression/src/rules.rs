//! Header predicates used by the negotiator

use http::header::{
    HeaderName, ACCEPT_ENCODING, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, TRANSFER_ENCODING,
};
use http::HeaderMap;
use once_cell::sync::Lazy;
use regex::Regex;

/// Default policy for content types worth compressing
pub const COMPRESSIBLE_CONTENT_TYPE_PATTERN: &str = r"(?i)^\s*(?:text/[^;\s]+|application/(?:javascript|json|xml|xml-dtd|ecmascript|dart|postscript|rtf|tar|toml|vnd\.dart|vnd\.ms-fontobject|vnd\.ms-opentype|wasm|x-httpd-php|x-javascript|x-ns-proxy-autoconfig|x-sh|x-tar|x-virtualbox-hdd|x-virtualbox-ova|x-virtualbox-ovf|x-virtualbox-vbox|x-virtualbox-vdi|x-virtualbox-vhd|x-virtualbox-vmdk|x-www-form-urlencoded)|font/(?:otf|ttf)|image/(?:bmp|vnd\.adobe\.photoshop|vnd\.microsoft\.icon|vnd\.ms-dds|x-icon|x-ms-bmp)|message/rfc822|model/gltf-binary|x-shader/x-fragment|x-shader/x-vertex|[^;\s]+?\+(?:json|text|xml|yaml))(?:[;\s]|$)";

// RFC 9111 5.2.2.6
static NO_TRANSFORM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|,)\s*no-transform\s*(?:,|$)").expect("valid no-transform pattern")
});

static NO_COMPRESS_TRANSFER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|,)\s*(?:identity|gzip|x-gzip|deflate|compress|br|zstd)\s*(?:,|$)")
        .expect("valid transfer-encoding pattern")
});

static EVENT_STREAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*text/event-stream(?:[;\s]|$)").expect("valid event-stream pattern")
});

/// Default compressible content-type policy
pub(crate) fn default_compressible_types() -> Regex {
    static DEFAULT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(COMPRESSIBLE_CONTENT_TYPE_PATTERN).expect("valid content-type pattern")
    });
    DEFAULT.clone()
}

/// All values of a header joined into one comma-separated list
pub(crate) fn header_list(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    (!values.is_empty()).then(|| values.join(","))
}

/// Client `Accept-Encoding` list across every header line
///
/// `None` only when the header is absent. Lines that are not valid text
/// contribute no codings, so a header present but unreadable yields an
/// empty list.
pub(crate) fn accept_encoding(headers: &HeaderMap) -> Option<String> {
    headers
        .contains_key(ACCEPT_ENCODING)
        .then(|| header_list(headers, ACCEPT_ENCODING).unwrap_or_default())
}

/// Declared body length, if any
pub(crate) fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Content type matches the compressible policy
///
/// Server-sent event streams are never compressible: the encoder would hold
/// back events until its buffers fill.
pub(crate) fn is_compressible(headers: &HeaderMap, policy: &Regex) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| policy.is_match(ct) && !EVENT_STREAM.is_match(ct))
}

/// `Cache-Control` does not forbid transformations
pub(crate) fn is_transformable(headers: &HeaderMap) -> bool {
    header_list(headers, CACHE_CONTROL).map_or(true, |cc| !NO_TRANSFORM.is_match(&cc))
}

/// Response is neither content-encoded nor marked as not to be compressed
/// at the transfer layer
pub(crate) fn is_encodable(headers: &HeaderMap) -> bool {
    if headers.contains_key(CONTENT_ENCODING) {
        return false;
    }
    header_list(headers, TRANSFER_ENCODING).map_or(true, |te| !NO_COMPRESS_TRANSFER.is_match(&te))
}

/// Response is itself sent with chunked transfer coding
pub(crate) fn is_chunked(headers: &HeaderMap) -> bool {
    header_list(headers, TRANSFER_ENCODING)
        .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use proptest::prelude::*;

    fn headers(pairs: &[(HeaderName, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(name.clone(), HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_compressible_content_types() {
        let policy = default_compressible_types();
        let check = |ct: &'static str| is_compressible(&headers(&[(CONTENT_TYPE, ct)]), &policy);

        // Should compress
        assert!(check("text/html"));
        assert!(check("text/plain; charset=utf-8"));
        assert!(check("application/json"));
        assert!(check("Application/JSON;charset=UTF-8"));
        assert!(check("application/javascript"));
        assert!(check("image/svg+xml"));
        assert!(check("application/vnd.api+json"));
        assert!(check("application/wasm"));

        // Should not compress
        assert!(!check("image/png"));
        assert!(!check("image/jpeg"));
        assert!(!check("video/mp4"));
        assert!(!check("application/octet-stream"));
        assert!(!check("application/zip"));
        assert!(!check("text/event-stream"));
        assert!(!is_compressible(&HeaderMap::new(), &policy));
    }

    #[test]
    fn test_no_transform() {
        assert!(is_transformable(&HeaderMap::new()));
        assert!(is_transformable(&headers(&[(CACHE_CONTROL, "public, max-age=60")])));
        assert!(!is_transformable(&headers(&[(CACHE_CONTROL, "no-transform")])));
        assert!(!is_transformable(&headers(&[(CACHE_CONTROL, "public,  No-Transform ,max-age=1")])));
        assert!(!is_transformable(&headers(&[
            (CACHE_CONTROL, "public"),
            (CACHE_CONTROL, "no-transform"),
        ])));
        // Not a standalone directive
        assert!(is_transformable(&headers(&[(CACHE_CONTROL, "x-no-transform-ish")])));
    }

    #[test]
    fn test_encodable() {
        assert!(is_encodable(&HeaderMap::new()));
        assert!(is_encodable(&headers(&[(TRANSFER_ENCODING, "chunked")])));
        assert!(!is_encodable(&headers(&[(CONTENT_ENCODING, "gzip")])));
        assert!(!is_encodable(&headers(&[(TRANSFER_ENCODING, "gzip, chunked")])));
        assert!(!is_encodable(&headers(&[(TRANSFER_ENCODING, "Identity")])));
    }

    #[test]
    fn test_accept_encoding_lines_are_joined() {
        let mut headers = HeaderMap::new();
        assert_eq!(accept_encoding(&headers), None);

        headers.append(ACCEPT_ENCODING, HeaderValue::from_static("br"));
        headers.append(ACCEPT_ENCODING, HeaderValue::from_static("gzip;q=0.5"));
        assert_eq!(accept_encoding(&headers).as_deref(), Some("br,gzip;q=0.5"));

        let mut opaque = HeaderMap::new();
        opaque.insert(ACCEPT_ENCODING, HeaderValue::from_bytes(b"gz\xffip").unwrap());
        assert_eq!(accept_encoding(&opaque).as_deref(), Some(""));
    }

    #[test]
    fn test_chunked_and_length() {
        assert!(is_chunked(&headers(&[(TRANSFER_ENCODING, "Chunked")])));
        assert!(!is_chunked(&HeaderMap::new()));

        assert_eq!(declared_length(&headers(&[(CONTENT_LENGTH, "2048")])), Some(2048));
        assert_eq!(declared_length(&headers(&[(CONTENT_LENGTH, "lots")])), None);
        assert_eq!(declared_length(&HeaderMap::new()), None);
    }

    proptest! {
        #[test]
        fn prop_no_transform_detected_anywhere(
            before in proptest::collection::vec("[a-z]{1,8}(=[0-9]{1,4})?", 0..3),
            after in proptest::collection::vec("[a-z]{1,8}(=[0-9]{1,4})?", 0..3),
            pad_left in "[ ]{0,3}",
            pad_right in "[ ]{0,3}",
            upper in any::<bool>(),
        ) {
            let token = if upper { "NO-TRANSFORM" } else { "no-transform" };
            let mut directives = before.clone();
            directives.push(format!("{pad_left}{token}{pad_right}"));
            directives.extend(after.iter().cloned());
            let value = directives.join(",");

            let mut map = HeaderMap::new();
            map.insert(CACHE_CONTROL, HeaderValue::from_str(&value).unwrap());
            prop_assert!(!is_transformable(&map));
        }
    }
}
