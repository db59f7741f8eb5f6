//! Codec utilities: MD5/base64 hashing, gzip, base64 transport encoding, and
//! fixed-size byte chunking.
//!
//! These are thin wrappers over real crates (`md-5`, `base64`, `flate2`) —
//! the wire format only cares about the *behavioural contract*, not a custom
//! implementation of any of these algorithms.

use base64::{Engine, engine::general_purpose::STANDARD};
use md5::{Digest, Md5};
use std::io::{self, Read, Write};
use thiserror::Error;

/// Errors from codec operations.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Base64 payload failed charset/length validation before decode was
    /// even attempted.
    #[error("invalid base64: {0}")]
    InvalidBase64(String),

    /// gzip decompression failed.
    #[error("gunzip failed: {0}")]
    Gunzip(String),
}

/// MD5 of `bytes`, base-64 encoded with the traditional alphabet (24 chars
/// including `=` padding per [`MD5_B64_LEN`](crate::MD5_B64_LEN)).
#[must_use]
pub fn md5_base64(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    STANDARD.encode(hasher.finalize())
}

/// Encode `bytes` with the traditional base-64 alphabet and `=` padding.
#[must_use]
pub fn b64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Validate that `s` is a well-formed base-64 string (traditional alphabet,
/// length a multiple of 4) before attempting to decode it.
///
/// Per the wire grammar, a validation failure must yield "drop packet", never
/// a panic or a session-fatal error — callers should treat `Err` as a signal
/// to silently discard the enclosing frame.
pub fn b64_decode_validated(s: &str) -> Result<Vec<u8>, CodecError> {
    if s.len() % 4 != 0 {
        return Err(CodecError::InvalidBase64(format!(
            "length {} is not a multiple of 4",
            s.len()
        )));
    }
    if !s
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
    {
        return Err(CodecError::InvalidBase64("disallowed character".to_string()));
    }
    STANDARD
        .decode(s)
        .map_err(|e| CodecError::InvalidBase64(e.to_string()))
}

/// Gzip-compress `bytes` at the default compression level.
#[must_use]
pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    use flate2::{Compression, write::GzEncoder};

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    // Writing to an in-memory Vec cannot fail.
    #[allow(clippy::expect_used)]
    encoder.write_all(bytes).expect("in-memory gzip write cannot fail");
    #[allow(clippy::expect_used)]
    encoder.finish().expect("in-memory gzip finish cannot fail")
}

/// Gunzip `bytes`. Callers should fall back to the raw bytes on failure per
/// the `C` flag recovery policy (§7 of the spec).
pub fn gunzip(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    use flate2::read::GzDecoder;

    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e: io::Error| CodecError::Gunzip(e.to_string()))?;
    Ok(out)
}

/// Split `bytes` into chunks of at most `size` bytes, in order. The last
/// chunk may be shorter than `size`. An empty input yields a single empty
/// chunk so that zero-length messages still produce `total == 1`.
#[must_use]
pub fn chunk(bytes: &[u8], size: usize) -> Vec<&[u8]> {
    if bytes.is_empty() {
        return vec![&bytes[0..0]];
    }
    bytes.chunks(size).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md5_base64_matches_known_vector() {
        // MD5("") = d41d8cd98f00b204e9800998ecf8427e
        assert_eq!(md5_base64(b""), "1B2M2Y8AsgTpgAmY7PhCfg==");
    }

    #[test]
    fn b64_roundtrip() {
        let data = b"hello world, this is chunk data";
        let encoded = b64_encode(data);
        assert_eq!(encoded.len() % 4, 0);
        let decoded = b64_decode_validated(&encoded).expect("valid base64");
        assert_eq!(decoded, data);
    }

    #[test]
    fn b64_decode_rejects_bad_length() {
        assert!(b64_decode_validated("abc").is_err());
    }

    #[test]
    fn b64_decode_rejects_bad_charset() {
        assert!(b64_decode_validated("abc$").is_err());
    }

    #[test]
    fn gzip_roundtrip() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let compressed = gzip(&data);
        let restored = gunzip(&compressed).expect("valid gzip");
        assert_eq!(restored, data);
    }

    #[test]
    fn gunzip_rejects_garbage() {
        assert!(gunzip(b"not gzip data").is_err());
    }

    #[test]
    fn chunk_splits_with_short_tail() {
        let data = vec![0u8; 181];
        let chunks = chunk(&data, 75);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 75);
        assert_eq!(chunks[1].len(), 75);
        assert_eq!(chunks[2].len(), 31);
    }

    #[test]
    fn chunk_empty_input_yields_one_empty_chunk() {
        let chunks = chunk(&[], 75);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_empty());
    }
}
