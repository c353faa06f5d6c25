use super::args::{Cli, Commands};
use super::handlers;
use anyhow::Result;
use logship_client::resolve_workspace_path;
use logship_server::Database;
use tracing_subscriber::EnvFilter;

pub fn run(cli: Cli) -> Result<()> {
    init_tracing();

    let data_dir = resolve_workspace_path(cli.data_dir.as_deref())?;

    let Some(command) = cli.command else {
        handlers::status::handle(&data_dir)?;
        return Ok(());
    };

    match command {
        Commands::Init { force } => handlers::init::handle(&data_dir, force),

        Commands::Sync { verbose } => handlers::sync::handle(&data_dir, verbose),

        Commands::Status => handlers::status::handle(&data_dir),

        Commands::Reclaim => {
            let db = open_store(&data_dir)?;
            handlers::reclaim::handle(&db)
        }

        Commands::Reconcile { repair } => {
            let db = open_store(&data_dir)?;
            handlers::reconcile::handle(&db, repair)
        }

        Commands::DeleteProject { project_id, owner } => {
            let db = open_store(&data_dir)?;
            handlers::delete_project::handle(&db, &owner, &project_id)
        }
    }
}

fn open_store(data_dir: &std::path::Path) -> Result<Database> {
    Ok(Database::open(&data_dir.join("logship.db"))?)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
