//! Hex and UTF-8 conversions for transports that need text

use crate::{CryptoError, CryptoResult};

/// Lowercase hex encoding
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode hex; odd length or a non-hex character is an error, never truncated
pub fn from_hex(s: &str) -> CryptoResult<Vec<u8>> {
    hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))
}

/// Decode hex into a fixed-size array, checking the decoded length
pub fn from_hex_array<const N: usize>(s: &str) -> CryptoResult<[u8; N]> {
    let bytes = from_hex(s)?;
    to_array(&bytes, "hex value")
}

pub fn utf8_to_bytes(text: &str) -> Vec<u8> {
    text.as_bytes().to_vec()
}

pub fn bytes_to_utf8(bytes: &[u8]) -> CryptoResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| CryptoError::InvalidUtf8)
}

/// Copy a slice into a fixed-size array, naming the field on mismatch
pub(crate) fn to_array<const N: usize>(bytes: &[u8], what: &'static str) -> CryptoResult<[u8; N]> {
    bytes.try_into().map_err(|_| CryptoError::InvalidLength {
        what,
        expected: N,
        actual: bytes.len(),
    })
}
