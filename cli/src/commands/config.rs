// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use knowmap_core::domain::engine_config::EngineConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate a configuration file with every default spelled out
    Generate {
        /// Output path (default: ./knowmap-config.yaml)
        #[arg(short, long, default_value = "./knowmap-config.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(command: ConfigCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output } => generate(output).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = EngineConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. KNOWMAP_CONFIG_PATH: {}",
            std::env::var("KNOWMAP_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./knowmap-config.yaml");
        println!("  4. ~/.knowmap/config.yaml");
        println!("  5. /etc/knowmap/config.yaml");
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!("  Name: {}", config.metadata.name);
    println!();

    let engine = &config.spec.engine;
    println!("{}", "Engine:".bold());
    println!("  Nearest resources: {}", engine.nearest_k);
    println!("  View nudge: {}", engine.view_nudge);
    println!("  Default grade: {}", engine.default_grade);
    println!("  Summary beta: {}", engine.summary_beta);
    println!("  Summary keywords: {}", engine.summary_keywords);
    println!("  Cluster keywords: {}", engine.max_cluster_keywords);
    println!("  k-means iterations: {}", engine.kmeans_max_iterations);
    println!("  Conflict retries: {}", engine.conflict_retries);
    println!();

    let nlp = &config.spec.nlp;
    println!("{}", "NLP:".bold());
    println!("  Provider: {:?}", nlp.provider);
    println!("  Endpoint: {}", nlp.endpoint);
    println!("  Timeout: {}s", nlp.timeout_secs);
    println!("  Hash dimensions: {}", nlp.hash_dimensions);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = EngineConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf) -> Result<()> {
    EngineConfigManifest::default()
        .to_yaml_file(&output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!("{}", format!("✓ Configuration generated: {}", output.display()).green());

    Ok(())
}
