//! nearbot CLI — the main entry point.
//!
//! Commands:
//! - `serve` — Start the HTTP gateway
//! - `ask`   — Run one question through the pipeline from the terminal

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "nearbot",
    about = "nearbot — location-aware local assistant",
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
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Ask a single question
    Ask {
        /// The question to answer
        question: String,

        /// Include live web search results as context
        #[arg(short, long)]
        sources: bool,
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
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Ask { question, sources } => commands::ask::run(question, sources).await?,
    }

    Ok(())
}
