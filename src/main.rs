use bastion::cli::{Cli, Commands, ProjectAction};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log to stderr; stdout carries command output (e.g. `get`).
fn init_logging() {
    let filter = EnvFilter::try_from_env("BASTION_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => bastion::cli::commands::init::execute(&cli).await,
        Commands::Project { ref action } => match action {
            ProjectAction::Create { ref name } => {
                bastion::cli::commands::project::execute_create(&cli, name).await
            }
            ProjectAction::List => bastion::cli::commands::project::execute_list(&cli),
        },
        Commands::Grant {
            ref project,
            ref principal,
        } => bastion::cli::commands::grant::execute(&cli, project, principal).await,
        Commands::Set {
            ref project,
            ref key,
            ref value,
        } => bastion::cli::commands::set::execute(&cli, project, key, value.as_deref()).await,
        Commands::Get {
            ref project,
            ref key,
            version,
        } => bastion::cli::commands::get::execute(&cli, project, key, version).await,
        Commands::History {
            ref project,
            ref key,
        } => bastion::cli::commands::history::execute(&cli, project, key),
        Commands::List { ref project } => bastion::cli::commands::list::execute(&cli, project),
        Commands::Run {
            ref project,
            ref command,
        } => bastion::cli::commands::run::execute(&cli, project, command).await,
    };

    if let Err(e) = result {
        bastion::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}
