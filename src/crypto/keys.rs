//! Typed key material for the wrap chain.
//!
//! Every layer of the hierarchy gets its own type so a KEK can never be
//! passed where a data key is expected (and vice versa):
//!
//! ```text
//! password --Argon2id--> Kek --seal--> MasterKey --seal--> DataKey --seal--> secret
//! ```
//!
//! All three wrap a 32-byte buffer that is zeroized when dropped.
//! Zeroization is best-effort: copies made by the allocator or swapped
//! out by the OS are beyond our reach.

use std::fmt;

use rand::rngs::OsRng;
use rand::TryRngCore;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{BastionError, Result};

/// Length of every symmetric key in the hierarchy (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Fill `buf` from the operating system CSPRNG.
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| BastionError::Rng(e.to_string()))
}

/// Raw 32-byte key buffer shared by the typed wrappers below.
#[derive(Zeroize, ZeroizeOnDrop)]
struct KeyBytes([u8; KEY_LEN]);

impl KeyBytes {
    fn random() -> Result<Self> {
        let mut bytes = [0u8; KEY_LEN];
        fill_random(&mut bytes)?;
        let key = Self(bytes);
        bytes.zeroize();
        Ok(key)
    }

    fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            BastionError::Format(format!(
                "key must be exactly {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(arr))
    }

    fn ct_eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

/// Key-encryption key derived from a password.  Only produced by the KDF.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Kek(KeyBytes);

impl Kek {
    pub(crate) fn from_array(mut bytes: [u8; KEY_LEN]) -> Self {
        let kek = Self(KeyBytes(bytes));
        bytes.zeroize();
        kek
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0 .0
    }
}

/// The vault-wide root key.  Generated once by `initialize_vault`.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey(KeyBytes);

impl MasterKey {
    /// Generate a fresh random master key.
    pub fn generate() -> Result<Self> {
        KeyBytes::random().map(Self)
    }

    /// Rebuild a master key from unwrapped bytes.
    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self> {
        KeyBytes::from_slice(bytes).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0 .0
    }
}

/// A project's data key.  Never derived, always random.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DataKey(KeyBytes);

impl DataKey {
    /// Generate a fresh random data key.
    pub fn generate() -> Result<Self> {
        KeyBytes::random().map(Self)
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self> {
        KeyBytes::from_slice(bytes).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0 .0
    }
}

// Constant-time equality and redacted Debug for every key type.

impl PartialEq for Kek {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0)
    }
}

impl PartialEq for MasterKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0)
    }
}

impl PartialEq for DataKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0)
    }
}

impl Eq for Kek {}
impl Eq for MasterKey {}
impl Eq for DataKey {}

impl fmt::Debug for Kek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Kek([REDACTED])")
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey([REDACTED])")
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DataKey([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_distinct() {
        let a = DataKey::generate().unwrap();
        let b = DataKey::generate().unwrap();
        assert_ne!(a, b);

        let m1 = MasterKey::generate().unwrap();
        let m2 = MasterKey::generate().unwrap();
        assert_ne!(m1, m2);
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        assert!(matches!(
            DataKey::from_slice(&[0u8; 16]),
            Err(BastionError::Format(_))
        ));
        assert!(MasterKey::from_slice(&[7u8; KEY_LEN]).is_ok());
    }

    #[test]
    fn equality_compares_bytes() {
        let a = DataKey::from_slice(&[1u8; KEY_LEN]).unwrap();
        let b = DataKey::from_slice(&[1u8; KEY_LEN]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn debug_never_prints_key_bytes() {
        let key = DataKey::from_slice(&[0xAB; KEY_LEN]).unwrap();
        let printed = format!("{key:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("171"));
        assert!(!printed.to_lowercase().contains("ab, "));
    }

    #[test]
    fn zeroize_clears_buffer() {
        let mut key = MasterKey::from_slice(&[0x5A; KEY_LEN]).unwrap();
        key.zeroize();
        assert_eq!(key.as_bytes(), &[0u8; KEY_LEN]);
    }
}
