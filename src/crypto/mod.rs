//! Cryptographic primitives for Bastion.
//!
//! This module provides:
//! - Canonical lowercase hex encoding (`encoding`)
//! - Argon2id password-based key derivation (`kdf`)
//! - AES-256-GCM sealed envelopes (`envelope`)
//! - Typed, zeroize-on-drop key material (`keys`)

pub mod encoding;
pub mod envelope;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{seal, open, derive_key, ...};
pub use encoding::{bytes_to_hex, hex_to_bytes};
pub use envelope::{open, seal, Envelope};
pub use kdf::{derive_key, derive_key_async, generate_salt, KdfParams};
pub use keys::{DataKey, Kek, MasterKey, KEY_LEN};
