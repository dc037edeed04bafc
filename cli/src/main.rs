// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Knowmap CLI
//!
//! The `knowmap` binary drives the progress-mapping engine from the shell.
//!
//! ## Commands
//!
//! - `knowmap project <VALUES>` - Project a polyline to a map position
//! - `knowmap scale <VALUES> --beta <BETA>` - Beta-scale a polyline
//! - `knowmap cluster <FILE>` - Cluster summaries read from a JSON file
//! - `knowmap simulate <SCENARIO>` - Run a learner scenario through the engine
//! - `knowmap config show|validate|generate` - Configuration management

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use knowmap_cli::commands::{self, ClusterArgs, ConfigCommand, ProjectArgs, ScaleArgs, SimulateArgs};

/// Knowmap - semantic progress mapping for courses
#[derive(Parser)]
#[command(name = "knowmap")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "KNOWMAP_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "KNOWMAP_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Project a polyline to its map position
    #[command(name = "project")]
    Project(ProjectArgs),

    /// Apply beta scaling to a polyline
    #[command(name = "scale")]
    Scale(ScaleArgs),

    /// Cluster summaries from a JSON file
    #[command(name = "cluster")]
    Cluster(ClusterArgs),

    /// Run a learner scenario through the engine
    #[command(name = "simulate")]
    Simulate(SimulateArgs),

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Project(args)) => commands::map::project(args),
        Some(Commands::Scale(args)) => commands::map::scale(args),
        Some(Commands::Cluster(args)) => commands::map::cluster(args, cli.config),
        Some(Commands::Simulate(args)) => commands::simulate::run(args, cli.config).await,
        Some(Commands::Config { command }) => commands::config::handle_command(command, cli.config).await,
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    Ok(())
}
