//! Kino VPAID CLI - Ad Session Harness
//!
//! Features:
//! - Interface version handshake
//! - Creative parameter validation
//! - Simulated ad sessions against an in-process media element

use clap::{Parser, Subcommand};
use kino_vpaid_core::AdSessionConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod simulator;

/// Kino VPAID CLI - Video ad session toolkit
#[derive(Parser)]
#[command(name = "kino-vpaid")]
#[command(author = "Purple Squirrel Media")]
#[command(version)]
#[command(about = "VPAID ad session harness and creative QC", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Session configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the interface version the ad answers with
    Handshake {
        /// Version offered by the host
        #[arg(long, default_value = "2.0")]
        host_version: String,
    },

    /// Decode and check a creative parameter blob
    Params {
        /// JSON blob, or @path to read it from a file
        blob: String,

        /// Asset paths to resolve against baseUrlImages
        #[arg(short, long)]
        asset: Vec<String>,
    },

    /// Run a full ad session against a simulated media element
    Simulate {
        /// JSON blob, or @path to read it from a file
        #[arg(short, long)]
        params: String,

        /// Media duration in seconds
        #[arg(short, long, default_value = "30")]
        duration: f64,

        /// Seconds of media per position update
        #[arg(short, long, default_value = "1.0")]
        step: f64,

        /// Ad width in pixels
        #[arg(long, default_value = "640")]
        width: u32,

        /// Ad height in pixels
        #[arg(long, default_value = "360")]
        height: u32,

        /// Pause for one update at this position
        #[arg(long)]
        pause_at: Option<f64>,

        /// Mark the ad skippable
        #[arg(long)]
        skippable: bool,

        /// Ask the ad to skip, then stop, at this position
        #[arg(long)]
        skip_at: Option<f64>,
    },
}

fn load_config(path: Option<&Path>) -> anyhow::Result<AdSessionConfig> {
    let Some(path) = path else {
        return Ok(AdSessionConfig::default());
    };

    let raw = std::fs::read_to_string(path)?;
    let config: AdSessionConfig = serde_json::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Handshake { host_version } => {
            commands::handshake(config, &host_version, &cli.format)?;
        }
        Commands::Params { blob, asset } => {
            commands::params(&blob, &asset, &cli.format)?;
        }
        Commands::Simulate {
            params,
            duration,
            step,
            width,
            height,
            pause_at,
            skippable,
            skip_at,
        } => {
            let plan = simulator::SimulationPlan {
                duration,
                step,
                width,
                height,
                pause_at,
                skippable,
                skip_at,
            };
            commands::simulate(config, &params, plan, &cli.format).await?;
        }
    }

    Ok(())
}
