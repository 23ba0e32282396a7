//! # drivescribe CLI
//!
//! Commands for running the sync pipeline and managing its persisted cursor.
//!
//! ## Usage
//!
//! ```bash
//! drivescribe --config ./config/drivescribe.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `drivescribe run` | Execute one sync run end to end |
//! | `drivescribe cursor show` | Print the persisted change cursor |
//! | `drivescribe cursor reset` | Delete the cursor so the next run starts from the beginning |
//!
//! Secrets come from the environment: `GRAPH_CLIENT_SECRET` and
//! `ANTHROPIC_API_KEY`. Everything else lives in the TOML config file.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use drivescribe::cache::FsSummaryCache;
use drivescribe::config::load_config;
use drivescribe::cursor::{CursorStore, FsCursorStore};
use drivescribe::pipeline::Pipeline;
use drivescribe::remote::GraphStore;
use drivescribe::summarizer::AnthropicSummarizer;

/// Keeps AI-generated folder description files in sync with a remote drive
/// via its change-delta API.
#[derive(Parser)]
#[command(
    name = "drivescribe",
    about = "Keep AI-generated folder descriptions in sync with a remote drive",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/drivescribe.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one sync run: fetch changes, regenerate affected folder
    /// descriptions, commit the cursor.
    Run,

    /// Inspect or reset the persisted change cursor.
    Cursor {
        #[command(subcommand)]
        command: CursorCommands,
    },
}

#[derive(Subcommand)]
enum CursorCommands {
    /// Print the persisted cursor, or "(none)" before the first run.
    Show,
    /// Delete the persisted cursor. The next run re-enumerates the whole
    /// drive and establishes a fresh baseline.
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Run => {
            let remote = GraphStore::new(&config.remote)?;
            let summarizer = AnthropicSummarizer::new(&config.summarizer)?;
            let cursor_store = FsCursorStore::new(&config.state.dir);
            let cache = FsSummaryCache::new(&config.state.dir);

            let pipeline = Pipeline::new(
                &remote,
                &summarizer,
                &cursor_store,
                &cache,
                config.artifact.filename.clone(),
            );
            let report = pipeline.run().await?;

            println!("run complete");
            println!("  folders described: {}", report.listings.len());
            println!("  folders skipped: {}", report.folders_skipped);
            for listing in &report.listings {
                println!("  - {} ({} files)", listing.folder_path, listing.file_names.len());
            }
        }
        Commands::Cursor { command } => {
            let store = FsCursorStore::new(&config.state.dir);
            match command {
                CursorCommands::Show => match store.load()? {
                    Some(cursor) => println!("{}", cursor),
                    None => println!("(none)"),
                },
                CursorCommands::Reset => {
                    if store.reset()? {
                        println!("cursor removed: {}", store.path().display());
                    } else {
                        println!("no cursor to remove");
                    }
                }
            }
        }
    }

    Ok(())
}
