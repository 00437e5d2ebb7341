//! `bastion init`: create the vault's master key and store its wrap.

use crate::cli::output;
use crate::cli::{audit, prompt_new_password, settings, store_path, Cli};
use crate::errors::{BastionError, Result};
use crate::vault::hierarchy::initialize_vault_async;
use crate::vault::{JsonFileStore, RecordStore, VaultRecord, ADMIN_PRINCIPAL};

/// Execute the `init` command.
pub async fn execute(cli: &Cli) -> Result<()> {
    let settings = settings()?;
    let path = store_path(cli, &settings)?;

    // 1. Refuse to run twice: a second master key orphans every wrap.
    let mut store = JsonFileStore::open(&path)?;
    if store.vault().is_some() {
        output::tip("The vault is already set up. Use `bastion project create` to continue.");
        return Err(BastionError::AlreadyInitialized(path));
    }

    if cli.principal != ADMIN_PRINCIPAL {
        return Err(BastionError::CommandFailed(
            "only the admin can initialize a vault".into(),
        ));
    }

    // 2. Choose the admin password.
    let password = prompt_new_password(
        "BASTION_PASSWORD",
        "Choose admin password",
        settings.min_password_len,
    )?;

    // 3. Generate + wrap the master key, then persist only the wrap.
    let wrapped = initialize_vault_async(password).await?;
    store.init_vault(VaultRecord::new(wrapped))?;
    store.save()?;

    audit(&path, "init", ADMIN_PRINCIPAL, None, None, Some("vault created"));

    output::success(&format!("Vault initialized at {}", path.display()));
    output::tip("Run `bastion project create <NAME>` to add a project.");

    Ok(())
}
