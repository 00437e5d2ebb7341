//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{BastionError, Result};
use crate::vault::{ProjectRecord, RecordStore, VaultSession, ADMIN_PRINCIPAL};

/// Bastion CLI: blind-backend secret vault.
#[derive(Parser)]
#[command(
    name = "bastion",
    about = "Blind-backend secret vault with per-project keys",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Record store file (default: from .bastion.toml, else .bastion/vault.json)
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Principal to act as; anything other than "admin" uses that
    /// collaborator's own grant
    #[arg(long = "as", default_value = ADMIN_PRINCIPAL, global = true)]
    pub principal: String,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Initialize a new vault (generates and wraps the master key)
    Init,

    /// Manage projects
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Give a collaborator their own wrap of a project's data key
    Grant {
        /// Project name or id
        project: String,
        /// Collaborator principal id (e.g. a username)
        principal: String,
    },

    /// Set a secret (new secrets start at version 1, updates add a version)
    Set {
        /// Project name or id
        project: String,
        /// Secret name (e.g. DATABASE_URL)
        key: String,
        /// Secret value (omit for interactive prompt)
        value: Option<String>,
    },

    /// Get a secret's value (latest unless --version is given)
    Get {
        /// Project name or id
        project: String,
        /// Secret name
        key: String,
        /// Read this stored version instead of the latest
        #[arg(long)]
        version: Option<u32>,
    },

    /// Show every stored version of a secret (metadata only, no password needed)
    History {
        /// Project name or id
        project: String,
        /// Secret name
        key: String,
    },

    /// List a project's secrets (names and versions only, no password needed)
    List {
        /// Project name or id
        project: String,
    },

    /// Run a command with a project's secrets injected
    Run {
        /// Project name or id
        project: String,

        /// Command and arguments (after --)
        #[arg(trailing_var_arg = true, required = true)]
        command: Vec<String>,
    },
}

/// Project subcommands.
#[derive(clap::Subcommand)]
pub enum ProjectAction {
    /// Create a project with a fresh data key
    Create {
        /// Project name
        name: String,
    },

    /// List projects
    List,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the acting principal's password, trying in order:
/// 1. `BASTION_PASSWORD` env var (CI/CD)
/// 2. Interactive prompt
///
/// Returned as zeroizing bytes, ready for the KDF.
pub fn prompt_password(principal: &str) -> Result<Zeroizing<Vec<u8>>> {
    if let Ok(pw) = std::env::var("BASTION_PASSWORD") {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw.into_bytes()));
        }
    }

    let pw = dialoguer::Password::new()
        .with_prompt(format!("Password for '{principal}'"))
        .interact()
        .map_err(|e| BastionError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw.into_bytes()))
}

/// Prompt for a new password with confirmation.
///
/// `env_var` lets scripts supply it (`BASTION_PASSWORD` for `init`,
/// `BASTION_COLLABORATOR_PASSWORD` for `grant`).  Enforces the configured
/// minimum length.
pub fn prompt_new_password(
    env_var: &str,
    prompt: &str,
    min_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if let Ok(pw) = std::env::var(env_var) {
        if !pw.is_empty() {
            if pw.chars().count() < min_len {
                return Err(BastionError::CommandFailed(format!(
                    "password must be at least {min_len} characters"
                )));
            }
            return Ok(Zeroizing::new(pw.into_bytes()));
        }
    }

    loop {
        let password = dialoguer::Password::new()
            .with_prompt(prompt)
            .with_confirmation("Confirm password", "Passwords do not match, try again")
            .interact()
            .map_err(|e| BastionError::CommandFailed(format!("password prompt: {e}")))?;

        if password.chars().count() < min_len {
            output::warning(&format!(
                "Password must be at least {min_len} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(password.into_bytes()));
    }
}

/// Load settings from the current directory.
pub fn settings() -> Result<Settings> {
    let cwd = std::env::current_dir()?;
    Settings::load(&cwd)
}

/// Resolve the record store path: `--store` wins over `.bastion.toml`.
pub fn store_path(cli: &Cli, settings: &Settings) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(match &cli.store {
        Some(p) => cwd.join(p),
        None => settings.store_path(&cwd),
    })
}

/// Find a project by id, falling back to an exact name match.
pub fn resolve_project<'a>(store: &'a impl RecordStore, project: &str) -> Result<&'a ProjectRecord> {
    if let Ok(id) = Uuid::parse_str(project) {
        return store.project(id);
    }

    let mut matches = store.projects().into_iter().filter(|p| p.name == project);
    match (matches.next(), matches.next()) {
        (Some(p), None) => Ok(p),
        (Some(_), Some(_)) => Err(BastionError::CommandFailed(format!(
            "more than one project is named '{project}' — use its id"
        ))),
        (None, _) => Err(BastionError::NotFound(format!("project '{project}'"))),
    }
}

/// Unlock `project` in `session` as the principal given by `--as`.
///
/// The admin goes through the master key; a collaborator uses their own
/// grant and never touches the master key.
pub async fn unlock_project(
    cli: &Cli,
    store: &impl RecordStore,
    store_path: &std::path::Path,
    session: &VaultSession,
    project: &ProjectRecord,
) -> Result<()> {
    let password = prompt_password(&cli.principal)?;

    let result = if cli.principal == ADMIN_PRINCIPAL {
        let vault = store.vault().ok_or(BastionError::NotInitialized)?;
        match session.unlock_master(password, vault).await {
            Ok(()) => session.unlock_project(project).await,
            Err(e) => Err(e),
        }
    } else {
        let grant = store.grant(project.id, &cli.principal)?;
        session.unlock_project_with_grant(password, grant).await
    };

    if let Err(BastionError::Unlock(_)) = result {
        let project_id = project.id.to_string();
        audit(
            store_path,
            "unlock-failed",
            &cli.principal,
            Some(&project_id),
            None,
            None,
        );
    }
    result
}

/// Validate that a secret name is safe to use as an environment variable.
///
/// Allowed: ASCII letters, digits, underscores, hyphens, periods.
/// Must be non-empty and at most 256 characters.
pub fn validate_secret_key(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(BastionError::CommandFailed(
            "secret name cannot be empty".into(),
        ));
    }
    if name.len() > 256 {
        return Err(BastionError::CommandFailed(
            "secret name cannot exceed 256 characters".into(),
        ));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-' || b == b'.')
    {
        return Err(BastionError::CommandFailed(format!(
            "secret name '{name}' contains invalid characters — only ASCII letters, digits, underscores, hyphens, and periods are allowed"
        )));
    }
    Ok(())
}

/// Record an audit event if the `audit-log` feature is compiled in.
pub fn audit(
    store_path: &std::path::Path,
    op: &str,
    principal: &str,
    project_id: Option<&str>,
    key: Option<&str>,
    details: Option<&str>,
) {
    #[cfg(feature = "audit-log")]
    crate::audit::log_audit(store_path, op, principal, project_id, key, details);

    #[cfg(not(feature = "audit-log"))]
    let _ = (store_path, op, principal, project_id, key, details);
}
