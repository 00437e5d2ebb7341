//! The key hierarchy: every wrap and unwrap in the chain
//!
//! ```text
//! password --KDF--> KEK --wraps--> MasterKey --wraps--> DataKey --seals--> secret value
//!                   KEK(collaborator) ---------wraps--> DataKey
//! ```
//!
//! All functions here are pure with respect to storage: they take wrap
//! records in and hand wrap records back, and the caller decides where
//! those records live.  Unwrapped keys only ever exist as `MasterKey` /
//! `DataKey` values, which zeroize themselves on drop.
//!
//! The `_async` variants run the KDF on the blocking pool and are what
//! `VaultSession` uses.

use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::{Zeroize, Zeroizing};

use crate::crypto::envelope::{open, seal, Envelope};
use crate::crypto::kdf::{derive_key, derive_key_async, generate_salt};
use crate::crypto::keys::{DataKey, Kek, MasterKey};
use crate::errors::{AuthenticationError, BastionError, Result};

use super::records::SecretRecord;

/// Output of `initialize_vault`: everything needed to unlock the master
/// key later, and nothing that reveals it.
#[derive(Debug, Clone)]
pub struct WrappedMasterKey {
    pub salt: Vec<u8>,
    pub wrapped_master_key: Envelope,
}

/// A freshly generated project data key plus its wrap under the master key.
#[derive(Debug)]
pub struct ProjectKey {
    pub data_key: DataKey,
    pub wrapped_data_key: Envelope,
}

/// A data key wrapped for one principal under that principal's own KEK.
#[derive(Debug, Clone)]
pub struct PrincipalWrap {
    pub salt: Vec<u8>,
    pub wrapped_data_key: Envelope,
}

// ---------------------------------------------------------------------------
// Master key
// ---------------------------------------------------------------------------

/// Generate the vault's master key and wrap it under `password`.
///
/// Must run once per vault.  Calling it again produces an unrelated master
/// key and orphans every data key wrapped under the old one; the record
/// store refuses a second vault record to prevent that.
pub fn initialize_vault(password: &[u8]) -> Result<WrappedMasterKey> {
    let master_key = MasterKey::generate()?;
    let salt = generate_salt()?;
    let kek = derive_key(password, &salt)?;
    let wrapped = wrap_master_key(&kek, salt.to_vec(), &master_key)?;
    info!("vault master key generated");
    Ok(wrapped)
}

/// Async form of `initialize_vault`.
pub async fn initialize_vault_async(password: Zeroizing<Vec<u8>>) -> Result<WrappedMasterKey> {
    let master_key = MasterKey::generate()?;
    let salt = generate_salt()?.to_vec();
    let kek = derive_key_async(password, salt.clone()).await?;
    let wrapped = wrap_master_key(&kek, salt, &master_key)?;
    info!("vault master key generated");
    Ok(wrapped)
}

pub(crate) fn wrap_master_key(
    kek: &Kek,
    salt: Vec<u8>,
    master_key: &MasterKey,
) -> Result<WrappedMasterKey> {
    let wrapped_master_key = seal(kek.as_bytes(), master_key.as_bytes())?;
    Ok(WrappedMasterKey {
        salt,
        wrapped_master_key,
    })
}

/// Recover the master key from the admin password and the vault record.
///
/// A wrong password and a corrupted record both surface as
/// `BastionError::Unlock`.
pub fn unlock_master(password: &[u8], salt: &[u8], wrapped: &Envelope) -> Result<MasterKey> {
    let kek = derive_key(password, salt)?;
    open_master_with_kek(&kek, wrapped)
}

/// Async form of `unlock_master`.
pub async fn unlock_master_async(
    password: Zeroizing<Vec<u8>>,
    salt: Vec<u8>,
    wrapped: &Envelope,
) -> Result<MasterKey> {
    let kek = derive_key_async(password, salt).await?;
    open_master_with_kek(&kek, wrapped)
}

fn open_master_with_kek(kek: &Kek, wrapped: &Envelope) -> Result<MasterKey> {
    let bytes = Zeroizing::new(open(kek.as_bytes(), wrapped).map_err(unlock_failed)?);
    // An authentic blob of the wrong size is still a corrupted vault.
    MasterKey::from_slice(&bytes).map_err(|_| BastionError::Unlock(AuthenticationError))
}

// ---------------------------------------------------------------------------
// Project data keys
// ---------------------------------------------------------------------------

/// Generate a new random data key and wrap it under the master key.
///
/// Data keys are never derived from the master key, so two calls with the
/// same master key always yield unrelated keys.
pub fn create_project_key(master_key: &MasterKey) -> Result<ProjectKey> {
    let data_key = DataKey::generate()?;
    let wrapped_data_key = seal(master_key.as_bytes(), data_key.as_bytes())?;
    debug!("project data key generated");
    Ok(ProjectKey {
        data_key,
        wrapped_data_key,
    })
}

/// Unwrap a project's data key with the (already unlocked) master key.
pub fn open_project_key(master_key: &MasterKey, wrapped: &Envelope) -> Result<DataKey> {
    let bytes = Zeroizing::new(open(master_key.as_bytes(), wrapped).map_err(unlock_failed)?);
    DataKey::from_slice(&bytes).map_err(|_| BastionError::Unlock(AuthenticationError))
}

// ---------------------------------------------------------------------------
// Collaborator grants
// ---------------------------------------------------------------------------

/// Re-wrap an unlocked data key under a collaborator's password.
///
/// The `DataKey` argument can only come from `open_project_key`,
/// `unlock_project_key` or `create_project_key`, so a grant always wraps the
/// real key.  Each call draws a fresh salt.
pub fn grant_collaborator_access(data_key: &DataKey, password: &[u8]) -> Result<PrincipalWrap> {
    let salt = generate_salt()?;
    let kek = derive_key(password, &salt)?;
    wrap_for_principal(&kek, salt.to_vec(), data_key)
}

/// Async form of `grant_collaborator_access`.
pub async fn grant_collaborator_access_async(
    data_key: &DataKey,
    password: Zeroizing<Vec<u8>>,
) -> Result<PrincipalWrap> {
    let salt = generate_salt()?.to_vec();
    let kek = derive_key_async(password, salt.clone()).await?;
    wrap_for_principal(&kek, salt, data_key)
}

fn wrap_for_principal(kek: &Kek, salt: Vec<u8>, data_key: &DataKey) -> Result<PrincipalWrap> {
    let wrapped_data_key = seal(kek.as_bytes(), data_key.as_bytes())?;
    debug!("data key wrapped for principal");
    Ok(PrincipalWrap {
        salt,
        wrapped_data_key,
    })
}

/// Unlock a data key directly from a principal's own wrap record.
pub fn unlock_project_key(password: &[u8], salt: &[u8], wrapped: &Envelope) -> Result<DataKey> {
    let kek = derive_key(password, salt)?;
    open_data_key_with_kek(&kek, wrapped)
}

/// Async form of `unlock_project_key`.
pub async fn unlock_project_key_async(
    password: Zeroizing<Vec<u8>>,
    salt: Vec<u8>,
    wrapped: &Envelope,
) -> Result<DataKey> {
    let kek = derive_key_async(password, salt).await?;
    open_data_key_with_kek(&kek, wrapped)
}

fn open_data_key_with_kek(kek: &Kek, wrapped: &Envelope) -> Result<DataKey> {
    let bytes = Zeroizing::new(open(kek.as_bytes(), wrapped).map_err(unlock_failed)?);
    DataKey::from_slice(&bytes).map_err(|_| BastionError::Unlock(AuthenticationError))
}

// ---------------------------------------------------------------------------
// Secret values
// ---------------------------------------------------------------------------

/// Seal a UTF-8 secret value under a project's data key.
pub fn seal_secret(data_key: &DataKey, plaintext: &str) -> Result<Envelope> {
    seal(data_key.as_bytes(), plaintext.as_bytes())
}

/// Open a secret value sealed with `seal_secret`.
pub fn open_secret(data_key: &DataKey, wrapped_value: &Envelope) -> Result<String> {
    let plaintext = open(data_key.as_bytes(), wrapped_value)?;

    String::from_utf8(plaintext).map_err(|e| {
        let mut bad_bytes = e.into_bytes();
        bad_bytes.zeroize();
        BastionError::Format("secret value is not valid UTF-8".to_string())
    })
}

/// Decrypt a batch of secrets, one result per record.
///
/// A record that fails to open does not stop the others.
pub fn open_secrets(data_key: &DataKey, records: &[SecretRecord]) -> Vec<(Uuid, Result<String>)> {
    records
        .iter()
        .map(|record| {
            let result = open_secret(data_key, &record.value);
            if let Err(ref e) = result {
                warn!(secret_id = %record.id, key = %record.key, error = %e, "secret could not be decrypted");
            }
            (record.id, result)
        })
        .collect()
}

fn unlock_failed(e: AuthenticationError) -> BastionError {
    BastionError::Unlock(e)
}
