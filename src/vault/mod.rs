//! Vault module: key hierarchy, sessions and blind record storage.
//!
//! This module provides:
//! - The wrap chain and collaborator re-wrapping (`hierarchy`)
//! - Record shapes handed to storage (`records`)
//! - `VaultSession`, the holder of unwrapped keys (`session`)
//! - `RecordStore` and its JSON-file implementation (`store`)

pub mod hierarchy;
pub mod records;
pub mod session;
pub mod store;

// Re-export the most commonly used items.
pub use hierarchy::{PrincipalWrap, ProjectKey, WrappedMasterKey};
pub use records::{GrantRecord, ProjectRecord, SecretRecord, VaultRecord, ADMIN_PRINCIPAL};
pub use session::{SessionState, VaultSession};
pub use store::{JsonFileStore, RecordStore};
