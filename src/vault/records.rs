//! Record shapes exchanged with the (blind) record store.
//!
//! Every field here is safe to hand to storage: salts, wrapped keys and
//! sealed values only.  Binary fields serialize as lowercase hex.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::encoding::{hex_decode, hex_encode};
use crate::crypto::envelope::Envelope;
use crate::errors::{BastionError, Result};

use super::hierarchy::{PrincipalWrap, WrappedMasterKey};

/// Principal id used for the vault administrator.
pub const ADMIN_PRINCIPAL: &str = "admin";

/// The vault's wrapped master key.  Exactly one per vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultRecord {
    #[serde(serialize_with = "hex_encode", deserialize_with = "hex_decode")]
    pub master_key_salt: Vec<u8>,

    pub wrapped_master_key: Envelope,

    pub created_at: DateTime<Utc>,
}

impl VaultRecord {
    pub fn new(wrapped: WrappedMasterKey) -> Self {
        Self {
            master_key_salt: wrapped.salt,
            wrapped_master_key: wrapped.wrapped_master_key,
            created_at: Utc::now(),
        }
    }
}

/// A project and its data key wrapped under the master key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: Uuid,
    pub name: String,
    pub wrapped_data_key: Envelope,
    pub created_at: DateTime<Utc>,
}

impl ProjectRecord {
    pub fn new(name: &str, wrapped_data_key: Envelope) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            wrapped_data_key,
            created_at: Utc::now(),
        }
    }
}

/// A project's data key wrapped for one collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantRecord {
    pub project_id: Uuid,
    pub principal_id: String,

    #[serde(serialize_with = "hex_encode", deserialize_with = "hex_decode")]
    pub salt: Vec<u8>,

    pub wrapped_data_key: Envelope,

    pub created_at: DateTime<Utc>,
}

impl GrantRecord {
    pub fn new(project_id: Uuid, principal_id: &str, wrap: PrincipalWrap) -> Self {
        Self {
            project_id,
            principal_id: principal_id.to_string(),
            salt: wrap.salt,
            wrapped_data_key: wrap.wrapped_data_key,
            created_at: Utc::now(),
        }
    }
}

/// One version of a sealed secret value.
///
/// Updates create a new record with `version + 1`; older versions stay in
/// the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub key: String,
    pub value: Envelope,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SecretRecord {
    /// First version of a secret.
    pub fn new(project_id: Uuid, key: &str, value: Envelope) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            project_id,
            key: key.to_string(),
            value,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// The record that supersedes `self`.  Keeps `id` and `created_at`.
    ///
    /// Fails with `Store` if the version counter is exhausted.
    pub fn next_version(&self, value: Envelope) -> Result<Self> {
        Ok(Self {
            id: self.id,
            project_id: self.project_id,
            key: self.key.clone(),
            value,
            version: self.following_version()?,
            created_at: self.created_at,
            updated_at: Utc::now(),
        })
    }

    /// `version + 1`, or a `Store` error on overflow.
    pub(crate) fn following_version(&self) -> Result<u32> {
        self.version.checked_add(1).ok_or_else(|| {
            BastionError::Store(format!("secret '{}' has no versions left", self.key))
        })
    }
}
