//! Tidemark CLI - schema migrations for DuckDB databases

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;

mod commands;
mod output;

use commands::{init, new, rollback, status, up};

/// Tidemark - apply and roll back schema migrations
#[derive(Parser)]
#[command(name = "tidemark", version, about, long_about = None)]
struct Cli {
    /// Project directory (defaults to the current directory)
    #[arg(long, global = true, env = "TIDEMARK_DIR")]
    dir: Option<PathBuf>,

    /// Log migration steps and SQL to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write tidemark.json and create the migrations folder and ledger
    Init,

    /// Create a new pair of SQL migration files
    New {
        /// Migration name in snake_case, e.g. create_users
        name: String,
    },

    /// Apply all pending migrations
    Up {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Roll back the most recent batch
    Rollback {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON (implies --force)
        #[arg(long)]
        json: bool,
    },

    /// Show applied and pending migrations
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let project_dir = commands::get_project_dir(cli.dir)?;

    match cli.command {
        Commands::Init => init::run(&project_dir),
        Commands::New { name } => new::run(&project_dir, &name),
        Commands::Up { json } => up::run(&project_dir, json),
        Commands::Rollback { force, json } => rollback::run(&project_dir, force, json),
        Commands::Status { json } => status::run(&project_dir, json),
    }
}
