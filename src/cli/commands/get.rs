//! `bastion get`: decrypt and print a secret's latest (or a given) version.

use crate::cli::{resolve_project, settings, store_path, unlock_project, Cli};
use crate::errors::{BastionError, Result};
use crate::vault::{JsonFileStore, RecordStore, VaultSession};

/// Execute the `get` command.
pub async fn execute(cli: &Cli, project: &str, key: &str, version: Option<u32>) -> Result<()> {
    let settings = settings()?;
    let path = store_path(cli, &settings)?;
    let store = JsonFileStore::open_initialized(&path)?;
    let project = resolve_project(&store, project)?;

    let record = match version {
        Some(v) => store
            .secret_history(project.id, key)
            .into_iter()
            .find(|s| s.version == v)
            .ok_or_else(|| BastionError::NotFound(format!("secret '{key}' version {v}")))?,
        None => store
            .latest_secret(project.id, key)
            .ok_or_else(|| BastionError::NotFound(format!("secret '{key}'")))?,
    };

    let session = VaultSession::from_settings(&settings);
    let opened = async {
        unlock_project(cli, &store, &path, &session, project).await?;
        session.open_secret(record).await
    }
    .await;
    session.lock().await;

    println!("{}", opened?);
    Ok(())
}
