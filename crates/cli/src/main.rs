//! MA Furniture CLI - Database migrations and catalog management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! ma-cli migrate
//!
//! # Load demo sections and products
//! ma-cli seed --file crates/cli/seed/catalog.yaml
//!
//! # Back up the catalog and restore it elsewhere
//! ma-cli export --output backup.json
//! ma-cli import backup.json --replace
//!
//! # Print catalog statistics
//! ma-cli stats
//! ```
//!
//! # Environment Variables
//!
//! - `MA_DATABASE_URL` - `SQLite` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

use commands::transfer::{ExportKind, ImportMode};

#[derive(Parser)]
#[command(name = "ma-cli")]
#[command(author, version, about = "MA Furniture CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Insert or update demo sections and products from a YAML file
    Seed {
        /// Path to the seed file
        #[arg(short, long, default_value = "crates/cli/seed/catalog.yaml")]
        file: PathBuf,
    },
    /// Export the catalog as JSON
    Export {
        /// What to export
        #[arg(short, long, value_enum, default_value_t = ExportKind::All)]
        kind: ExportKind,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import a JSON export
    Import {
        /// Path to the JSON file
        file: PathBuf,

        /// Delete the existing catalog before importing
        #[arg(long)]
        replace: bool,
    },
    /// Print catalog statistics
    Stats,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ma_cli=info,ma_furniture_server=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => commands::seed::run(&file).await?,
        Commands::Export { kind, output } => {
            commands::transfer::export(kind, output.as_deref()).await?;
        }
        Commands::Import { file, replace } => {
            let mode = if replace {
                ImportMode::Replace
            } else {
                ImportMode::Merge
            };
            commands::transfer::import(&file, mode).await?;
        }
        Commands::Stats => commands::stats::run().await?,
    }
    Ok(())
}
