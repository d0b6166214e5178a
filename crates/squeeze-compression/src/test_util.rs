use crate::encoding::Encoding;
use std::io::Read;

/// Decode a compressed body with the reference decoder for `encoding`
pub(crate) fn decode(encoding: Encoding, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    match encoding {
        Encoding::Gzip => {
            flate2::read::GzDecoder::new(data).read_to_end(&mut out).unwrap();
        }
        Encoding::Deflate => {
            flate2::read::ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
        }
        Encoding::Brotli => {
            brotli::Decompressor::new(data, 4096).read_to_end(&mut out).unwrap();
        }
        Encoding::Zstd => {
            out = zstd::decode_all(data).unwrap();
        }
    }
    out
}
