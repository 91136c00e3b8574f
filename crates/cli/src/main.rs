//! Ferrochat CLI — the main entry point.
//!
//! Commands:
//! - `chat`    — Interactive chat or single-message mode
//! - `reindex` — Rebuild the documentation vector index
//! - `rag`     — Toggle or inspect the per-user RAG flag
//! - `tools`   — List the merged tool namespace
//! - `watch`   — Poll a state-bearing tool and report changes

use clap::{Parser, Subcommand};

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "ferrochat",
    about = "Ferrochat — conversational MCP orchestration backend",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat through the full agent stack
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// User id the turn is attributed to
        #[arg(short, long, default_value = "local")]
        user: String,
    },

    /// Rebuild the vector index from the docs directory
    Reindex,

    /// Toggle or inspect per-user RAG augmentation
    Rag {
        /// "on", "off", or "status"
        action: String,

        /// User id the flag applies to
        #[arg(short, long, default_value = "local")]
        user: String,
    },

    /// List the merged (and filtered) tool namespace
    Tools,

    /// Poll a state-bearing tool and report record changes
    Watch {
        /// Tool that returns the record list (e.g. "get_tasks")
        tool: String,

        /// Poll interval in seconds
        #[arg(short, long, default_value_t = 30)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Chat { message, user } => commands::chat::run(message, user).await?,
        Commands::Reindex => commands::reindex::run().await?,
        Commands::Rag { action, user } => commands::rag::run(action, user).await?,
        Commands::Tools => commands::tools::run().await?,
        Commands::Watch { tool, interval } => commands::watch::run(tool, interval).await?,
    }

    Ok(())
}
