//! Logbard CLI — the main entry point.
//!
//! Commands:
//! - `init`     — Write a default config file
//! - `run`      — Full cycle: ingest logs, assemble, generate, record
//! - `assemble` — Dry run: print the assembled prompt and budget
//! - `profile`  — Show what Logbard knows about a player
//! - `stats`    — History and memory statistics for an owner
//! - `explain`  — Explain the similarity between two texts

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod delivery;
mod logsource;

#[derive(Parser)]
#[command(
    name = "logbard",
    about = "Logbard — bounded-context AI commentary for game server logs",
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
    /// Write a default config file to ~/.logbard/config.toml
    Init,

    /// Run one full cycle for an owner: ingest, assemble, generate, record
    Run {
        /// The owner key (server or cluster name)
        owner: String,

        /// Log file to read event lines from (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Token budget for the history tier (default: half the context window)
        #[arg(long)]
        history_budget: Option<usize>,
    },

    /// Assemble and print the prompt without calling the generator
    Assemble {
        /// The owner key (server or cluster name)
        owner: String,

        /// Log file to read event lines from (stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Token budget for the history tier (default: half the context window)
        #[arg(long)]
        history_budget: Option<usize>,
    },

    /// Show the stored profile and context blurb for a player
    Profile {
        /// The entity name
        entity: String,
    },

    /// Show history and memory statistics for an owner
    Stats {
        /// The owner key (server or cluster name)
        owner: String,
    },

    /// Delete semantic memories older than a cutoff
    Prune {
        /// Age threshold in days
        #[arg(long, default_value_t = 90)]
        days: i64,
    },

    /// Explain the embedding similarity between two texts
    Explain {
        /// First text
        text_a: String,

        /// Second text
        text_b: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init => commands::init::run().await?,
        Commands::Run {
            owner,
            input,
            history_budget,
        } => commands::run::run(owner, input, history_budget).await?,
        Commands::Assemble {
            owner,
            input,
            history_budget,
        } => commands::assemble::run(owner, input, history_budget).await?,
        Commands::Profile { entity } => commands::profile::run(entity).await?,
        Commands::Stats { owner } => commands::stats::run(owner).await?,
        Commands::Prune { days } => commands::prune::run(days).await?,
        Commands::Explain { text_a, text_b } => commands::explain::run(text_a, text_b).await?,
    }

    Ok(())
}
