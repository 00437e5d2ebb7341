//! `bastion history`: list every stored version of one secret.

use crate::cli::output;
use crate::cli::{resolve_project, settings, store_path, Cli};
use crate::errors::{BastionError, Result};
use crate::vault::{JsonFileStore, RecordStore};

/// Execute the `history` command.  Metadata only; nothing is decrypted.
pub fn execute(cli: &Cli, project: &str, key: &str) -> Result<()> {
    let settings = settings()?;
    let path = store_path(cli, &settings)?;
    let store = JsonFileStore::open_initialized(&path)?;
    let project = resolve_project(&store, project)?;

    let versions = store.secret_history(project.id, key);
    if versions.is_empty() {
        return Err(BastionError::NotFound(format!("secret '{key}'")));
    }

    output::info(&format!(
        "{key} in {}: {} version(s)",
        project.name,
        versions.len()
    ));
    output::print_history_table(&versions);
    output::tip(&format!(
        "Run `bastion get {} {key} --version <N>` to read an older value.",
        project.name
    ));

    Ok(())
}
