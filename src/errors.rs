use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// An AEAD tag did not verify, or the envelope was too short to hold one.
///
/// Carries no detail about which byte was wrong or whether the key or the
/// data was at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("authentication failed — envelope could not be verified")]
pub struct AuthenticationError;

/// All errors that can occur in Bastion.
#[derive(Debug, Error)]
pub enum BastionError {
    // --- Crypto errors ---
    #[error("Malformed input: {0}")]
    Format(String),

    #[error("Key derivation failed: {0}")]
    Kdf(String),

    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error("Unlock failed — wrong password or corrupted vault")]
    Unlock(#[source] AuthenticationError),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Random number generator failure: {0}")]
    Rng(String),

    // --- Session errors ---
    #[error("Vault session is locked — unlock it first")]
    SessionLocked,

    #[error("Project {0} is not unlocked in this session")]
    ProjectNotUnlocked(Uuid),

    // --- Store errors ---
    #[error("Vault already initialized at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Vault not initialized — run `bastion init` first")]
    NotInitialized,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Record store error: {0}")]
    Store(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Child process exited with code {0}")]
    ChildProcessFailed(i32),

    #[error("Audit error: {0}")]
    Audit(String),
}

/// Convenience type alias for Bastion results.
pub type Result<T> = std::result::Result<T, BastionError>;
