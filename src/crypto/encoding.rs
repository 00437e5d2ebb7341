//! Canonical hex encoding for every persisted cryptographic quantity.
//!
//! Output is always lowercase, two characters per byte.  Decoding is
//! strict: odd lengths, non-hex characters and uppercase digits are all
//! rejected, so `bytes_to_hex(hex_to_bytes(s)?) == s` holds for every
//! accepted `s`.

use serde::Deserialize;

use crate::errors::{BastionError, Result};

/// Encode bytes as lowercase hex.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decode canonical lowercase hex into bytes.
pub fn hex_to_bytes(s: &str) -> Result<Vec<u8>> {
    if s.len() % 2 != 0 {
        return Err(BastionError::Format(format!(
            "hex string has odd length {}",
            s.len()
        )));
    }

    if let Some(c) = s.chars().find(|c| !matches!(c, '0'..='9' | 'a'..='f')) {
        return Err(BastionError::Format(format!(
            "invalid hex character {c:?} (expected lowercase 0-9a-f)"
        )));
    }

    hex::decode(s).map_err(|e| BastionError::Format(format!("invalid hex: {e}")))
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

pub(crate) fn hex_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&bytes_to_hex(data))
}

pub(crate) fn hex_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    hex_to_bytes(&s).map_err(serde::de::Error::custom)
}
