use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{BastionError, Result};

/// Project-level configuration, loaded from `.bastion.toml`.
///
/// Every field has a sensible default so Bastion works out-of-the-box
/// without any config file at all.  KDF parameters are not
/// configurable: they are fixed for every principal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path (relative to project root) of the record store file.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Seconds a session may sit idle before it locks itself.
    #[serde(default = "default_session_idle_timeout_secs")]
    pub session_idle_timeout_secs: u64,

    /// Minimum length for newly chosen passwords.
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_store_path() -> String {
    ".bastion/vault.json".to_string()
}

fn default_session_idle_timeout_secs() -> u64 {
    900 // 15 minutes
}

fn default_min_password_len() -> usize {
    8
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            session_idle_timeout_secs: default_session_idle_timeout_secs(),
            min_password_len: default_min_password_len(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    const FILE_NAME: &'static str = ".bastion.toml";

    /// Load settings from `<project_dir>/.bastion.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            BastionError::Config(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        if settings.min_password_len == 0 {
            return Err(BastionError::Config(
                "min_password_len must be at least 1".into(),
            ));
        }

        Ok(settings)
    }

    /// Resolve the record store path against the project directory.
    pub fn store_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.store_path)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs)
    }
}

// ── Tests ────────────────────────────────────────────────────────────
