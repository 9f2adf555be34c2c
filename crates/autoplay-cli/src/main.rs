//! Kino Autoplay CLI - headless autoplay escalation simulator
//!
//! Features:
//! - Simulate escalation against scripted play outcomes
//! - Inspect the autoplay intent carried by a page URL
//! - Print and validate sequencer configs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Kino Autoplay CLI
#[derive(Parser)]
#[command(name = "autoplay-cli")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "Autoplay fallback simulator for Kino web players", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sequencer against scripted media
    Simulate {
        /// Probe result (ok, none, blocked)
        #[arg(long, default_value = "blocked")]
        probe: String,

        /// Play outcomes in order, e.g. blocked,blocked,ok (unscripted calls are blocked)
        #[arg(short, long, default_value = "")]
        outcomes: String,

        /// Outcomes of clicks on the play prompt, e.g. blocked,ok
        #[arg(short, long, default_value = "")]
        gesture_outcomes: String,

        /// Value of the `autoplay` query parameter
        #[arg(long, default_value = "true")]
        autoplay: String,

        /// Value of the `unmute` query parameter
        #[arg(long)]
        unmute: Option<String>,

        /// Start with the media muted
        #[arg(long)]
        muted: bool,

        /// JSON config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Config preset (default, aggressive)
        #[arg(short, long, default_value = "default")]
        preset: String,

        /// Wait in real time instead of virtual time
        #[arg(long)]
        realtime: bool,
    },

    /// Show the autoplay intent of a page URL
    Intent {
        /// Page URL with query parameters
        url: String,
    },

    /// Print a sequencer config as JSON
    Config {
        /// Preset name (default, aggressive)
        #[arg(default_value = "default")]
        preset: String,

        /// Validate and print this JSON file instead
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    autoplay_core::init();

    match cli.command {
        Commands::Simulate {
            probe,
            outcomes,
            gesture_outcomes,
            autoplay,
            unmute,
            muted,
            config,
            preset,
            realtime,
        } => {
            let args = commands::SimulateArgs {
                probe,
                outcomes,
                gesture_outcomes,
                autoplay,
                unmute,
                muted,
                config,
                preset,
                realtime,
            };

            // Sequencer tasks are !Send and need a LocalSet
            tokio::task::LocalSet::new()
                .run_until(commands::simulate(args, &cli.format))
                .await?;
        }
        Commands::Intent { url } => {
            commands::intent(&url, &cli.format)?;
        }
        Commands::Config { preset, file } => {
            commands::config(&preset, file.as_ref())?;
        }
    }

    Ok(())
}
