use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "logship")]
#[command(about = "Sync agent conversation logs into an owner-scoped archive", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Workspace directory for config, cursors and the local store.
    /// Defaults to the platform data dir (see `logship init`).
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create the workspace and write a default config")]
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    #[command(about = "Sync discovered source logs to the configured endpoint")]
    Sync {
        /// Print per-batch delivery progress
        #[arg(long)]
        verbose: bool,
    },

    #[command(about = "Show workspace paths, cursors, and pending sources")]
    Status,

    #[command(about = "Sweep orphaned records and resume interrupted deletions")]
    Reclaim,

    #[command(about = "Check stored counters against recomputed values")]
    Reconcile {
        /// Rewrite drifted counters to the recomputed values
        #[arg(long)]
        repair: bool,
    },

    #[command(about = "Delete a project and everything under it")]
    DeleteProject {
        /// Project id as shown by the server
        project_id: String,

        /// Owner the project must belong to
        #[arg(long, default_value = "local")]
        owner: String,
    },
}
