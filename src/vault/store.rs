//! Record persistence.
//!
//! The store is "blind": it only ever sees the records from
//! `vault::records`, i.e. salts, wrapped keys and sealed values.
//! `RecordStore` is the seam; `JsonFileStore` keeps everything in one
//! JSON document written atomically (temp file + rename).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::errors::{BastionError, Result};

use super::records::{GrantRecord, ProjectRecord, SecretRecord, VaultRecord};

/// Storage operations the vault needs.  Implementations never receive
/// plaintext or unwrapped keys.
pub trait RecordStore {
    /// The vault's wrapped master key, if the vault was initialized.
    fn vault(&self) -> Option<&VaultRecord>;

    /// Store the vault record.  Fails with `AlreadyInitialized` if one
    /// exists: a second master key would orphan every existing wrap.
    fn init_vault(&mut self, record: VaultRecord) -> Result<()>;

    fn insert_project(&mut self, record: ProjectRecord) -> Result<()>;

    fn project(&self, id: Uuid) -> Result<&ProjectRecord>;

    fn projects(&self) -> Vec<&ProjectRecord>;

    /// Add or replace the grant for `(project_id, principal_id)`.
    fn insert_grant(&mut self, record: GrantRecord) -> Result<()>;

    fn grant(&self, project_id: Uuid, principal_id: &str) -> Result<&GrantRecord>;

    /// Append a secret version.  The version must be exactly one more than
    /// the latest stored version of that key (or 1 for a new key).
    fn put_secret(&mut self, record: SecretRecord) -> Result<()>;

    /// Latest version of every secret in a project, sorted by key.
    fn latest_secrets(&self, project_id: Uuid) -> Vec<&SecretRecord>;

    /// Latest version of one secret.
    fn latest_secret(&self, project_id: Uuid, key: &str) -> Option<&SecretRecord>;

    /// Every stored version of one secret, oldest first.
    fn secret_history(&self, project_id: Uuid, key: &str) -> Vec<&SecretRecord>;

    /// Persist pending changes.
    fn save(&mut self) -> Result<()>;
}

/// On-disk document layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vault: Option<VaultRecord>,
    #[serde(default)]
    projects: Vec<ProjectRecord>,
    #[serde(default)]
    grants: Vec<GrantRecord>,
    #[serde(default)]
    secrets: Vec<SecretRecord>,
}

/// A `RecordStore` backed by a single JSON file.
pub struct JsonFileStore {
    path: PathBuf,
    doc: Document,
}

impl JsonFileStore {
    /// Open the store at `path`, or start an empty one if the file does
    /// not exist yet (nothing is written until `save`).
    pub fn open(path: &Path) -> Result<Self> {
        let doc = if path.exists() {
            let bytes = fs::read(path)?;
            serde_json::from_slice(&bytes).map_err(|e| {
                BastionError::Serialization(format!("{}: {e}", path.display()))
            })?
        } else {
            Document::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            doc,
        })
    }

    /// Open an existing store, failing if it was never initialized.
    pub fn open_initialized(path: &Path) -> Result<Self> {
        let store = Self::open(path)?;
        if store.doc.vault.is_none() {
            return Err(BastionError::NotInitialized);
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RecordStore for JsonFileStore {
    fn vault(&self) -> Option<&VaultRecord> {
        self.doc.vault.as_ref()
    }

    fn init_vault(&mut self, record: VaultRecord) -> Result<()> {
        if self.doc.vault.is_some() {
            return Err(BastionError::AlreadyInitialized(self.path.clone()));
        }
        self.doc.vault = Some(record);
        Ok(())
    }

    fn insert_project(&mut self, record: ProjectRecord) -> Result<()> {
        if self.doc.projects.iter().any(|p| p.id == record.id) {
            return Err(BastionError::Store(format!(
                "project {} already exists",
                record.id
            )));
        }
        self.doc.projects.push(record);
        Ok(())
    }

    fn project(&self, id: Uuid) -> Result<&ProjectRecord> {
        self.doc
            .projects
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| BastionError::NotFound(format!("project {id}")))
    }

    fn projects(&self) -> Vec<&ProjectRecord> {
        let mut list: Vec<&ProjectRecord> = self.doc.projects.iter().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    fn insert_grant(&mut self, record: GrantRecord) -> Result<()> {
        self.project(record.project_id)?;
        self.doc
            .grants
            .retain(|g| !(g.project_id == record.project_id && g.principal_id == record.principal_id));
        self.doc.grants.push(record);
        Ok(())
    }

    fn grant(&self, project_id: Uuid, principal_id: &str) -> Result<&GrantRecord> {
        self.doc
            .grants
            .iter()
            .find(|g| g.project_id == project_id && g.principal_id == principal_id)
            .ok_or_else(|| {
                BastionError::NotFound(format!(
                    "grant for '{principal_id}' on project {project_id}"
                ))
            })
    }

    fn put_secret(&mut self, record: SecretRecord) -> Result<()> {
        self.project(record.project_id)?;

        let expected = match self.latest_secret(record.project_id, &record.key) {
            Some(latest) => latest.following_version()?,
            None => 1,
        };
        if record.version != expected {
            return Err(BastionError::Store(format!(
                "secret '{}' version conflict: expected {expected}, got {}",
                record.key, record.version
            )));
        }

        debug!(project_id = %record.project_id, version = record.version, "secret version stored");
        self.doc.secrets.push(record);
        Ok(())
    }

    fn latest_secrets(&self, project_id: Uuid) -> Vec<&SecretRecord> {
        let mut latest: Vec<&SecretRecord> = Vec::new();
        for s in self.doc.secrets.iter().filter(|s| s.project_id == project_id) {
            match latest.iter_mut().find(|l| l.key == s.key) {
                Some(slot) if slot.version < s.version => *slot = s,
                Some(_) => {}
                None => latest.push(s),
            }
        }
        latest.sort_by(|a, b| a.key.cmp(&b.key));
        latest
    }

    fn latest_secret(&self, project_id: Uuid, key: &str) -> Option<&SecretRecord> {
        self.doc
            .secrets
            .iter()
            .filter(|s| s.project_id == project_id && s.key == key)
            .max_by_key(|s| s.version)
    }

    fn secret_history(&self, project_id: Uuid, key: &str) -> Vec<&SecretRecord> {
        let mut history: Vec<&SecretRecord> = self
            .doc
            .secrets
            .iter()
            .filter(|s| s.project_id == project_id && s.key == key)
            .collect();
        history.sort_by_key(|s| s.version);
        history
    }

    /// Serialize the document and write it atomically.
    fn save(&mut self) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.doc)
            .map_err(|e| BastionError::Serialization(format!("store: {e}")))?;

        let parent = self.path.parent().unwrap_or(Path::new("."));
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }

        // The temp file is in the same directory so rename is atomic.
        let tmp_path = parent.join(format!(
            ".{}.tmp",
            self.path.file_name().unwrap_or_default().to_string_lossy()
        ));

        fs::write(&tmp_path, &bytes)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
