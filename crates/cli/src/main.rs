//! loopwright CLI — the main entry point.
//!
//! Commands:
//! - `ask`    — One question, one answer
//! - `chat`   — Interactive session with conversation memory
//! - `tools`  — List the registered tools
//! - `doctor` — Diagnose endpoint and config health

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "loopwright",
    about = "loopwright — a bounded tool-calling agent loop for local models",
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
    /// Ask a single question and print the answer
    Ask {
        /// The question to ask
        question: String,

        /// Print the full transcript after the answer
        #[arg(short, long)]
        transcript: bool,
    },

    /// Interactive chat session
    Chat,

    /// List the registered tools and their parameters
    Tools,

    /// Diagnose endpoint and config health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Ask { question, transcript } => commands::ask::run(&question, transcript).await?,
        Commands::Chat => commands::chat::run().await?,
        Commands::Tools => commands::tools::run()?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
