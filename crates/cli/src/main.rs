//! SlidePilot CLI, the main entry point.
//!
//! Commands:
//! - `agent`   Interactive chat or single-message mode
//! - `tools`   Print the tool catalogue sent to the model
//! - `export`  Render a deck to slide images
//! - `doctor`  Diagnose the local setup

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "slidepilot",
    about = "SlidePilot: edit presentations by chatting with an AI agent",
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
    /// Chat with the slide-editing agent
    Agent {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Presentation to open before the first message
        #[arg(short, long)]
        deck: Option<PathBuf>,
    },

    /// Print the tool catalogue as JSON
    Tools,

    /// Render every slide of a presentation to images
    Export {
        /// The .pptx file to render
        deck: PathBuf,

        /// Output directory (defaults to the configured one)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Diagnose system health
    Doctor,
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
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Agent { message, deck } => commands::agent::run(message, deck).await?,
        Commands::Tools => commands::tools::run()?,
        Commands::Export { deck, output } => commands::export::run(deck, output).await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
