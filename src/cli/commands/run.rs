//! `bastion run`: inject a project's secrets into a child process.
//!
//! Decryption is per-secret best-effort: a corrupted record is reported
//! and skipped, the rest are still injected.

use std::collections::HashMap;
use std::process::Command;

use zeroize::Zeroize;

use crate::cli::output;
use crate::cli::{resolve_project, settings, store_path, unlock_project, Cli};
use crate::errors::{BastionError, Result};
use crate::vault::{JsonFileStore, RecordStore, SecretRecord, VaultSession};

/// Execute the `run` command.
pub async fn execute(cli: &Cli, project: &str, command: &[String]) -> Result<()> {
    let Some((program, args)) = command.split_first() else {
        return Err(BastionError::CommandFailed(
            "no command specified — use `bastion run <PROJECT> -- <command>`".into(),
        ));
    };

    let settings = settings()?;
    let path = store_path(cli, &settings)?;
    let store = JsonFileStore::open_initialized(&path)?;
    let project = resolve_project(&store, project)?;

    let records: Vec<SecretRecord> = store
        .latest_secrets(project.id)
        .into_iter()
        .cloned()
        .collect();

    let session = VaultSession::from_settings(&settings);
    let opened = async {
        unlock_project(cli, &store, &path, &session, project).await?;
        session.open_secrets(project.id, &records).await
    }
    .await;
    session.lock().await;

    let mut secrets: HashMap<String, String> = HashMap::with_capacity(records.len());
    let mut failed = 0usize;
    for (record, (_, result)) in records.iter().zip(opened?) {
        match result {
            Ok(value) => {
                secrets.insert(record.key.clone(), value);
            }
            Err(e) => {
                failed += 1;
                output::warning(&format!("Skipping '{}': {e}", record.key));
            }
        }
    }

    output::success(&format!(
        "Injected {} secrets into environment",
        secrets.len()
    ));
    if failed > 0 {
        output::warning(&format!("{failed} secret(s) could not be decrypted"));
    }

    let status = Command::new(program).args(args).envs(&secrets).status();

    for value in secrets.values_mut() {
        value.zeroize();
    }

    // Forward the child's exit code.
    match status?.code() {
        Some(0) => Ok(()),
        Some(code) => Err(BastionError::ChildProcessFailed(code)),
        None => Err(BastionError::CommandFailed(
            "child process terminated by signal".into(),
        )),
    }
}
