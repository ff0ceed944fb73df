//! Bramble CLI - Database migrations and maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table
//! bramble-cli migrate
//!
//! # Delete expired sessions
//! bramble-cli prune-sessions
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bramble-cli")]
#[command(author, version, about = "Bramble CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Delete expired sessions
    PruneSessions,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Migrate => commands::migrate::run().await,
        Commands::PruneSessions => commands::sessions::prune().await,
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}
