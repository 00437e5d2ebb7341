//! Password-based key derivation using Argon2id.
//!
//! Every principal (admin or collaborator) turns its password into a
//! key-encryption key with the *same* fixed parameters.  They are not
//! configurable: a wrap produced under one parameter set could only be
//! opened under that set, and a mismatch would show up as nothing more
//! than an authentication failure.

use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

use super::keys::{fill_random, Kek, KEY_LEN};
use crate::errors::{BastionError, Result};

/// Length of a freshly generated salt (128 bits).
pub const SALT_LEN: usize = 16;

/// Shortest salt `derive_key` accepts.
pub const MIN_SALT_LEN: usize = 16;

/// Argon2id cost parameters shared by every caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes.
    pub iterations: u32,
    /// Parallelism lanes.
    pub parallelism: u32,
}

impl KdfParams {
    /// 1 pass, 64 MiB, 4 lanes.
    pub const FIXED: Self = Self {
        memory_kib: 65_536,
        iterations: 1,
        parallelism: 4,
    };
}

/// Derive a 32-byte KEK from a password and salt.
///
/// Deterministic for a fixed `(password, salt)` pair.  Fails with
/// `BastionError::Kdf` if the salt is shorter than 16 bytes.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<Kek> {
    if salt.len() < MIN_SALT_LEN {
        return Err(BastionError::Kdf(format!(
            "salt must be at least {MIN_SALT_LEN} bytes (got {})",
            salt.len()
        )));
    }

    let p = KdfParams::FIXED;
    let params = Params::new(p.memory_kib, p.iterations, p.parallelism, Some(KEY_LEN))
        .map_err(|e| BastionError::Kdf(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(password, salt, key.as_mut())
        .map_err(|e| BastionError::Kdf(format!("Argon2id hashing failed: {e}")))?;

    Ok(Kek::from_array(*key))
}

/// Derive a KEK on the blocking thread pool.
///
/// Argon2id at these settings takes hundreds of milliseconds, so async
/// callers hand it to `spawn_blocking`.  If the awaiting future is
/// dropped the derivation still runs to completion and its output is
/// zeroized on drop; the caller sees either a whole key or nothing.
pub async fn derive_key_async(password: Zeroizing<Vec<u8>>, salt: Vec<u8>) -> Result<Kek> {
    tokio::task::spawn_blocking(move || derive_key(&password, &salt))
        .await
        .map_err(|e| BastionError::Kdf(format!("key derivation task failed: {e}")))?
}

/// Generate a cryptographically random 16-byte salt.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    fill_random(&mut salt)?;
    Ok(salt)
}
