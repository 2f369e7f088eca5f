//! Shelf CLI - catalog commands from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Run a chat command against the configured catalog
//! shelf-cli exec "/get 10"
//!
//! # Dry run against an in-memory catalog
//! shelf-cli exec "/cso 10 11" --memory --seed catalog.json
//!
//! # Check database connectivity and table access
//! shelf-cli check
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "shelf-cli")]
#[command(author, version, about = "Shelf catalog CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one chat command, e.g. "/cp 10 129.99"
    Exec {
        /// Command text as it would be sent in chat
        text: String,

        /// Image URL for commands that need a photo
        #[arg(long)]
        image_url: Option<String>,

        /// Use an in-memory store and fake uploader
        #[arg(long)]
        memory: bool,

        /// JSON file of rows to load into the in-memory store
        #[arg(long, requires = "memory")]
        seed: Option<PathBuf>,
    },
    /// Check database connectivity and table access
    Check,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Exec {
            text,
            image_url,
            memory,
            seed,
        } => {
            if memory {
                commands::exec::memory(&text, image_url, seed.as_deref()).await?;
            } else {
                commands::exec::remote(&text, image_url).await?;
            }
        }
        Commands::Check => commands::check::run().await?,
    }
    Ok(())
}
