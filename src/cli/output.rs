//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::{ProjectRecord, SecretRecord};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of projects (Name, Id, Created).
pub fn print_projects_table(projects: &[&ProjectRecord]) {
    if projects.is_empty() {
        info("No projects yet.");
        tip("Run `bastion project create <NAME>` to add one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Id", "Created"]);

    for p in projects {
        table.add_row(vec![
            p.name.clone(),
            p.id.to_string(),
            p.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{table}");
}

/// Print a table of secret metadata (Name, Version, Updated).  Values
/// are never shown.
pub fn print_secrets_table(secrets: &[&SecretRecord]) {
    if secrets.is_empty() {
        info("No secrets in this project yet.");
        tip("Run `bastion set <PROJECT> <KEY>` to add your first secret.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Version", "Updated"]);

    for s in secrets {
        table.add_row(vec![
            s.key.clone(),
            s.version.to_string(),
            s.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]);
    }

    println!("{table}");
}

/// Print every stored version of one secret (Version, Written, Id).
pub fn print_history_table(versions: &[&SecretRecord]) {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Version", "Written", "Id"]);

    for s in versions {
        table.add_row(vec![
            s.version.to_string(),
            s.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            s.id.to_string(),
        ]);
    }

    println!("{table}");
}
