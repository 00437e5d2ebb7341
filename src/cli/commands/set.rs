//! `bastion set`: seal a new version of a secret.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{audit, resolve_project, settings, store_path, unlock_project, validate_secret_key, Cli};
use crate::errors::{BastionError, Result};
use crate::vault::{JsonFileStore, RecordStore, VaultSession};

/// Execute the `set` command.
pub async fn execute(cli: &Cli, project: &str, key: &str, value: Option<&str>) -> Result<()> {
    validate_secret_key(key)?;

    let settings = settings()?;
    let path = store_path(cli, &settings)?;
    let mut store = JsonFileStore::open_initialized(&path)?;
    let project = resolve_project(&store, project)?.clone();

    // Determine the secret value from one of three sources.
    let secret_value = Zeroizing::new(if let Some(v) = value {
        output::warning("Value provided on command line — it may appear in shell history.");
        v.to_string()
    } else if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf.trim_end().to_string()
    } else {
        dialoguer::Password::new()
            .with_prompt(format!("Enter value for {key}"))
            .interact()
            .map_err(|e| BastionError::CommandFailed(format!("input prompt: {e}")))?
    });

    let previous = store.latest_secret(project.id, key).cloned();

    let session = VaultSession::from_settings(&settings);
    let sealed = async {
        unlock_project(cli, &store, &path, &session, &project).await?;
        session
            .seal_secret(project.id, key, &secret_value, previous.as_ref())
            .await
    }
    .await;
    session.lock().await;
    let record = sealed?;

    let version = record.version;
    store.put_secret(record)?;
    store.save()?;

    let project_id = project.id.to_string();
    audit(
        &path,
        "set",
        &cli.principal,
        Some(&project_id),
        Some(key),
        Some(&format!("version {version}")),
    );

    output::success(&format!(
        "Secret '{key}' stored in '{}' (version {version})",
        project.name
    ));

    Ok(())
}
