//! AES-256-GCM authenticated envelopes.
//!
//! Each call to `seal` generates a fresh random 12-byte nonce and
//! prepends it to the ciphertext.  Callers never choose nonces.
//!
//! Layout of an envelope:
//!   [ 12-byte nonce | ciphertext (N bytes) | 16-byte auth tag ]
//!
//! No associated data is bound.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::encoding::{bytes_to_hex, hex_to_bytes};
use super::keys::KEY_LEN;
use crate::errors::{AuthenticationError, BastionError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Smallest well-formed envelope (empty plaintext).
pub const MIN_ENVELOPE_LEN: usize = NONCE_LEN + TAG_LEN;

/// A sealed, self-contained `nonce || ciphertext || tag` blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope(Vec<u8>);

impl Envelope {
    /// Wrap raw envelope bytes (e.g. read back from storage).
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Parse a hex-encoded envelope.
    ///
    /// Only the encoding is checked here; a short or tampered envelope
    /// is reported by `open` as an authentication failure.
    pub fn from_hex(s: &str) -> Result<Self> {
        hex_to_bytes(s).map(Self)
    }

    pub fn to_hex(&self) -> String {
        bytes_to_hex(&self.0)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Envelopes travel as lowercase hex strings.

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        super::encoding::hex_encode(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        super::encoding::hex_decode(deserializer).map(Self)
    }
}

/// Seal `plaintext` under a 32-byte `key`.
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Envelope> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| BastionError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    // aes-gcm appends the tag to the ciphertext.
    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| BastionError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(Envelope(output))
}

/// Open an envelope produced by `seal`.
///
/// Fails with `AuthenticationError` on a short envelope, a wrong key or
/// any modified byte.  Nothing is returned unless the tag verifies.
pub fn open(
    key: &[u8; KEY_LEN],
    envelope: &Envelope,
) -> std::result::Result<Vec<u8>, AuthenticationError> {
    let bytes = envelope.as_bytes();
    if bytes.len() < MIN_ENVELOPE_LEN {
        return Err(AuthenticationError);
    }

    let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| AuthenticationError)?;

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| AuthenticationError)
}
