//! `bastion list`: show a project's secret names and versions.

use crate::cli::output;
use crate::cli::{resolve_project, settings, store_path, Cli};
use crate::errors::Result;
use crate::vault::{JsonFileStore, RecordStore};

/// Execute the `list` command.  Metadata only; nothing is decrypted.
pub fn execute(cli: &Cli, project: &str) -> Result<()> {
    let settings = settings()?;
    let path = store_path(cli, &settings)?;
    let store = JsonFileStore::open_initialized(&path)?;
    let project = resolve_project(&store, project)?;

    let secrets = store.latest_secrets(project.id);

    output::info(&format!(
        "{} — {} secret(s)",
        project.name,
        secrets.len()
    ));
    output::print_secrets_table(&secrets);

    Ok(())
}
