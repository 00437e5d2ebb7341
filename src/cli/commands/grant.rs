//! `bastion grant`: re-wrap a project's data key for a collaborator.
//!
//! The admin unlocks the master key, unwraps the real data key with it,
//! and wraps that same key under a KEK derived from the collaborator's
//! password with a fresh salt.  The collaborator can then unlock the
//! project on their own without the master key.

use crate::cli::output;
use crate::cli::{audit, prompt_new_password, resolve_project, settings, store_path, unlock_project, Cli};
use crate::errors::{BastionError, Result};
use crate::vault::{JsonFileStore, RecordStore, VaultSession, ADMIN_PRINCIPAL};

/// Execute the `grant` command.
pub async fn execute(cli: &Cli, project: &str, principal: &str) -> Result<()> {
    if cli.principal != ADMIN_PRINCIPAL {
        return Err(BastionError::CommandFailed(
            "only the admin can grant access".into(),
        ));
    }
    if principal == ADMIN_PRINCIPAL || principal.trim().is_empty() {
        return Err(BastionError::CommandFailed(format!(
            "'{principal}' is not a valid collaborator id"
        )));
    }

    let settings = settings()?;
    let path = store_path(cli, &settings)?;
    let mut store = JsonFileStore::open_initialized(&path)?;
    let project = resolve_project(&store, project)?.clone();

    let session = VaultSession::from_settings(&settings);
    let granted = async {
        unlock_project(cli, &store, &path, &session, &project).await?;
        let collaborator_password = prompt_new_password(
            "BASTION_COLLABORATOR_PASSWORD",
            &format!("Choose password for '{principal}'"),
            settings.min_password_len,
        )?;
        session
            .grant_access(project.id, principal, collaborator_password)
            .await
    }
    .await;
    session.lock().await;
    let grant = granted?;

    store.insert_grant(grant)?;
    store.save()?;

    let project_id = project.id.to_string();
    audit(&path, "grant", ADMIN_PRINCIPAL, Some(&project_id), None, Some(principal));

    output::success(&format!(
        "'{principal}' can now unlock project '{}'",
        project.name
    ));
    output::tip(&format!(
        "They use `bastion --as {principal} run {} -- <command>`.",
        project.name
    ));

    Ok(())
}
