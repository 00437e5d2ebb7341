//! `bastion project`: create and list projects.

use crate::cli::output;
use crate::cli::{audit, prompt_password, settings, store_path, Cli};
use crate::errors::{BastionError, Result};
use crate::vault::{JsonFileStore, RecordStore, VaultSession, ADMIN_PRINCIPAL};

/// Execute `project create`.
pub async fn execute_create(cli: &Cli, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(BastionError::CommandFailed(
            "project name cannot be empty".into(),
        ));
    }
    if cli.principal != ADMIN_PRINCIPAL {
        return Err(BastionError::CommandFailed(
            "only the admin can create projects".into(),
        ));
    }

    let settings = settings()?;
    let path = store_path(cli, &settings)?;
    let mut store = JsonFileStore::open_initialized(&path)?;
    let vault = store.vault().ok_or(BastionError::NotInitialized)?.clone();

    let session = VaultSession::from_settings(&settings);
    let password = prompt_password(ADMIN_PRINCIPAL)?;
    let created = match session.unlock_master(password, &vault).await {
        Ok(()) => session.create_project(name).await,
        Err(e) => Err(e),
    };
    session.lock().await;
    let project = created?;

    let project_id = project.id.to_string();
    store.insert_project(project)?;
    store.save()?;

    audit(&path, "project-create", ADMIN_PRINCIPAL, Some(&project_id), None, Some(name));

    output::success(&format!("Project '{name}' created ({project_id})"));
    output::tip(&format!("Run `bastion set {name} <KEY>` to add a secret."));

    Ok(())
}

/// Execute `project list`.  Reads metadata only; no password needed.
pub fn execute_list(cli: &Cli) -> Result<()> {
    let settings = settings()?;
    let path = store_path(cli, &settings)?;
    let store = JsonFileStore::open_initialized(&path)?;

    let projects = store.projects();
    output::info(&format!("{} project(s)", projects.len()));
    output::print_projects_table(&projects);

    Ok(())
}
