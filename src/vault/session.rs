//! `VaultSession`: the only place unwrapped keys live between calls.
//!
//! ```text
//!            unlock_master                unlock_project
//!   Locked ----------------> MasterUnlocked ----------------> ProjectUnlocked(P)
//!     |                                                            ^
//!     +------------------- unlock_project_with_grant --------------+
//!
//!   lock() / idle timeout / drop  ==>  Locked  (key buffers zeroized)
//! ```
//!
//! The master key and each project's data key sit in their own slot behind
//! their own async mutex.  An unlock or seal holds its slot for the whole
//! operation (including the KDF), so two operations never race on one
//! key, while different projects proceed independently.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::keys::{DataKey, MasterKey};
use crate::errors::{BastionError, Result};

use super::hierarchy;
use super::records::{GrantRecord, ProjectRecord, SecretRecord, VaultRecord};

type ProjectSlot = Arc<Mutex<Option<DataKey>>>;

/// Observable state of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No key material held.
    Locked,
    /// Master key held; `projects` lists data keys unlocked through it.
    MasterUnlocked { projects: Vec<Uuid> },
    /// Only project data keys held (collaborator path).
    ProjectUnlocked { projects: Vec<Uuid> },
}

/// Bounded-lifetime holder of unwrapped keys for one interactive unlock.
pub struct VaultSession {
    master: Mutex<Option<MasterKey>>,
    projects: Mutex<HashMap<Uuid, ProjectSlot>>,
    idle_timeout: Duration,
    last_used: Mutex<Instant>,
}

impl VaultSession {
    /// Create a locked session that re-locks after `idle_timeout` without use.
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            master: Mutex::new(None),
            projects: Mutex::new(HashMap::new()),
            idle_timeout,
            last_used: Mutex::new(Instant::now()),
        }
    }

    /// Create a locked session using the configured idle timeout.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.session_idle_timeout())
    }

    // ------------------------------------------------------------------
    // Unlocking
    // ------------------------------------------------------------------

    /// Admin path, step one: unlock the master key.
    ///
    /// A failed attempt leaves the session exactly as it was.
    pub async fn unlock_master(
        &self,
        password: Zeroizing<Vec<u8>>,
        vault: &VaultRecord,
    ) -> Result<()> {
        self.expire_if_idle().await;

        let mut slot = self.master.lock().await;
        let key = hierarchy::unlock_master_async(
            password,
            vault.master_key_salt.clone(),
            &vault.wrapped_master_key,
        )
        .await?;
        *slot = Some(key);
        drop(slot);

        self.touch().await;
        info!("master key unlocked");
        Ok(())
    }

    /// Admin path, step two: unwrap a project's data key with the master key.
    pub async fn unlock_project(&self, project: &ProjectRecord) -> Result<()> {
        self.check_alive().await?;

        let master = self.master.lock().await;
        let master_key = master.as_ref().ok_or(BastionError::SessionLocked)?;

        let slot = self.slot(project.id).await;
        let mut data_key = slot.lock().await;
        *data_key = Some(hierarchy::open_project_key(
            master_key,
            &project.wrapped_data_key,
        )?);
        drop(data_key);
        drop(master);

        self.touch().await;
        debug!(project_id = %project.id, "project unlocked via master key");
        Ok(())
    }

    /// Collaborator path: unlock a data key from the principal's own grant,
    /// without ever touching the master key.
    pub async fn unlock_project_with_grant(
        &self,
        password: Zeroizing<Vec<u8>>,
        grant: &GrantRecord,
    ) -> Result<()> {
        self.expire_if_idle().await;

        let slot = self.slot(grant.project_id).await;
        let mut data_key = slot.lock().await;
        let key = hierarchy::unlock_project_key_async(
            password,
            grant.salt.clone(),
            &grant.wrapped_data_key,
        )
        .await?;
        *data_key = Some(key);
        drop(data_key);

        self.touch().await;
        info!(project_id = %grant.project_id, principal = %grant.principal_id, "project unlocked via grant");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Operations on unlocked keys
    // ------------------------------------------------------------------

    /// Create a project: fresh data key, wrapped under the master key, and
    /// left unlocked in this session.
    pub async fn create_project(&self, name: &str) -> Result<ProjectRecord> {
        self.check_alive().await?;

        let master = self.master.lock().await;
        let master_key = master.as_ref().ok_or(BastionError::SessionLocked)?;
        let project_key = hierarchy::create_project_key(master_key)?;
        drop(master);

        let record = ProjectRecord::new(name, project_key.wrapped_data_key);
        let slot = self.slot(record.id).await;
        *slot.lock().await = Some(project_key.data_key);

        self.touch().await;
        info!(project_id = %record.id, "project created");
        Ok(record)
    }

    /// Wrap an unlocked project's data key for a collaborator.
    pub async fn grant_access(
        &self,
        project_id: Uuid,
        principal_id: &str,
        collaborator_password: Zeroizing<Vec<u8>>,
    ) -> Result<GrantRecord> {
        self.check_alive().await?;

        let slot = self.existing_slot(project_id).await?;
        let data_key = slot.lock().await;
        let key = data_key
            .as_ref()
            .ok_or(BastionError::ProjectNotUnlocked(project_id))?;
        let wrap = hierarchy::grant_collaborator_access_async(key, collaborator_password).await?;
        drop(data_key);

        self.touch().await;
        info!(project_id = %project_id, principal = %principal_id, "collaborator access granted");
        Ok(GrantRecord::new(project_id, principal_id, wrap))
    }

    /// Seal a secret value.  Pass the current record to produce the next
    /// version of it, or `None` for a brand-new secret.  `previous` must
    /// belong to the same project and key.
    pub async fn seal_secret(
        &self,
        project_id: Uuid,
        key: &str,
        plaintext: &str,
        previous: Option<&SecretRecord>,
    ) -> Result<SecretRecord> {
        self.check_alive().await?;

        if let Some(prev) = previous {
            if prev.project_id != project_id || prev.key != key {
                return Err(BastionError::Store(format!(
                    "previous record is '{}' in project {}, not '{key}' in project {project_id}",
                    prev.key, prev.project_id
                )));
            }
        }

        let slot = self.existing_slot(project_id).await?;
        let data_key = slot.lock().await;
        let dk = data_key
            .as_ref()
            .ok_or(BastionError::ProjectNotUnlocked(project_id))?;
        let value = hierarchy::seal_secret(dk, plaintext)?;
        drop(data_key);

        self.touch().await;
        match previous {
            Some(prev) => prev.next_version(value),
            None => Ok(SecretRecord::new(project_id, key, value)),
        }
    }

    /// Decrypt one secret.
    pub async fn open_secret(&self, record: &SecretRecord) -> Result<String> {
        self.check_alive().await?;

        let slot = self.existing_slot(record.project_id).await?;
        let data_key = slot.lock().await;
        let dk = data_key
            .as_ref()
            .ok_or(BastionError::ProjectNotUnlocked(record.project_id))?;
        let value = hierarchy::open_secret(dk, &record.value);
        drop(data_key);

        self.touch().await;
        value
    }

    /// Decrypt every secret of one project, best-effort per item.
    pub async fn open_secrets(
        &self,
        project_id: Uuid,
        records: &[SecretRecord],
    ) -> Result<Vec<(Uuid, Result<String>)>> {
        self.check_alive().await?;

        let slot = self.existing_slot(project_id).await?;
        let data_key = slot.lock().await;
        let dk = data_key
            .as_ref()
            .ok_or(BastionError::ProjectNotUnlocked(project_id))?;
        let results = hierarchy::open_secrets(dk, records);
        drop(data_key);

        self.touch().await;
        Ok(results)
    }

    // ------------------------------------------------------------------
    // Locking
    // ------------------------------------------------------------------

    /// Drop every held key.  Buffers are zeroized as they are released.
    pub async fn lock(&self) {
        self.master.lock().await.take();

        let slots: Vec<ProjectSlot> = self.projects.lock().await.drain().map(|(_, s)| s).collect();
        for slot in slots {
            slot.lock().await.take();
        }
        debug!("session locked");
    }

    /// Drop one project's data key.
    pub async fn lock_project(&self, project_id: Uuid) {
        let slot = self.projects.lock().await.remove(&project_id);
        if let Some(slot) = slot {
            slot.lock().await.take();
            debug!(project_id = %project_id, "project locked");
        }
    }

    /// Report which keys this session currently holds.
    pub async fn state(&self) -> SessionState {
        let has_master = self.master.lock().await.is_some();

        let slots: Vec<(Uuid, ProjectSlot)> = self
            .projects
            .lock()
            .await
            .iter()
            .map(|(id, s)| (*id, Arc::clone(s)))
            .collect();

        let mut projects = Vec::new();
        for (id, slot) in slots {
            if slot.lock().await.is_some() {
                projects.push(id);
            }
        }
        projects.sort();

        match (has_master, projects.is_empty()) {
            (true, _) => SessionState::MasterUnlocked { projects },
            (false, false) => SessionState::ProjectUnlocked { projects },
            (false, true) => SessionState::Locked,
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    async fn slot(&self, project_id: Uuid) -> ProjectSlot {
        Arc::clone(self.projects.lock().await.entry(project_id).or_default())
    }

    async fn existing_slot(&self, project_id: Uuid) -> Result<ProjectSlot> {
        self.projects
            .lock()
            .await
            .get(&project_id)
            .cloned()
            .ok_or(BastionError::ProjectNotUnlocked(project_id))
    }

    async fn touch(&self) {
        *self.last_used.lock().await = Instant::now();
    }

    /// Lock the session if it has been idle too long.  Returns `true` if it
    /// was expired.
    async fn expire_if_idle(&self) -> bool {
        let idle = self.last_used.lock().await.elapsed();
        if idle >= self.idle_timeout {
            self.lock().await;
            return true;
        }
        false
    }

    async fn check_alive(&self) -> Result<()> {
        if self.expire_if_idle().await {
            return Err(BastionError::SessionLocked);
        }
        Ok(())
    }
}

impl std::fmt::Debug for VaultSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSession")
            .field("keys", &"[REDACTED]")
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}
