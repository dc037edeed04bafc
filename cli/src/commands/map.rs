// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Stateless map commands: project, scale, cluster

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use knowmap_core::domain::clustering::{ClusterInput, ClusteringEngine, Clustering};
use knowmap_core::domain::engine_config::EngineConfigManifest;
use knowmap_core::domain::geometry::{Position, RadialProjector};
use knowmap_core::domain::polyline::Polyline;

#[derive(Args)]
pub struct ProjectArgs {
    /// Comma-separated polyline values, one per topic axis
    #[arg(value_name = "VALUES", allow_hyphen_values = true)]
    pub values: String,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ScaleArgs {
    /// Comma-separated polyline values, one per topic axis
    #[arg(value_name = "VALUES", allow_hyphen_values = true)]
    pub values: String,

    /// Variance scaling factor
    #[arg(short, long, allow_hyphen_values = true)]
    pub beta: f64,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ClusterArgs {
    /// JSON file holding an array of `{ "polyline": [...], "keywords": [...] }`
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// One entry of a `cluster` input file. The position is derived from the
/// polyline when absent.
#[derive(Debug, Deserialize)]
pub struct SummaryEntry {
    pub polyline: Vec<f64>,
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Projection {
    polyline: Polyline,
    position: Position,
}

pub fn parse_polyline(values: &str) -> Result<Polyline> {
    let parsed = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<f64>().with_context(|| format!("'{}' is not a number", v)))
        .collect::<Result<Vec<f64>>>()?;
    Polyline::new(parsed).context("Invalid polyline")
}

pub fn project(args: ProjectArgs) -> Result<()> {
    let polyline = parse_polyline(&args.values)?;
    let position = RadialProjector::new()
        .project(&polyline)
        .context("Failed to project polyline")?;
    print_projection(Projection { polyline, position }, args.json)
}

pub fn scale(args: ScaleArgs) -> Result<()> {
    let polyline = parse_polyline(&args.values)?.beta_scaled(args.beta);
    let position = RadialProjector::new()
        .project(&polyline)
        .context("Failed to project polyline")?;
    print_projection(Projection { polyline, position }, args.json)
}

fn print_projection(projection: Projection, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&projection)?);
        return Ok(());
    }
    let values: Vec<String> = projection.polyline.iter().map(|v| format!("{:.4}", v)).collect();
    println!("{} [{}]", "Polyline:".bold(), values.join(", "));
    println!(
        "{} ({:.4}, {:.4})",
        "Position:".bold(),
        projection.position.x,
        projection.position.y
    );
    Ok(())
}

/// Read summary entries and cluster them with the configured engine settings.
pub fn cluster_file(file: &Path, config: &EngineConfigManifest) -> Result<Clustering> {
    let raw = std::fs::read_to_string(file).with_context(|| format!("Failed to read {:?}", file))?;
    let entries: Vec<SummaryEntry> =
        serde_json::from_str(&raw).with_context(|| format!("Failed to parse summaries in {:?}", file))?;

    let projector = RadialProjector::new();
    let inputs = entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| -> Result<ClusterInput> {
            let polyline = Polyline::new(entry.polyline).with_context(|| format!("Summary {} is invalid", i))?;
            let position = match entry.position {
                Some(position) => position,
                None => projector
                    .project(&polyline)
                    .with_context(|| format!("Summary {} cannot be projected", i))?,
            };
            Ok(ClusterInput {
                polyline,
                position,
                keywords: entry.keywords,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let engine = ClusteringEngine::new(
        config.spec.engine.kmeans_max_iterations,
        config.spec.engine.max_cluster_keywords,
    );
    engine.cluster(&inputs).context("Clustering failed")
}

pub fn cluster(args: ClusterArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = EngineConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    let clustering = cluster_file(&args.file, &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&clustering)?);
        return Ok(());
    }

    println!(
        "{}",
        format!("{} summaries in {} clusters", clustering.labels.len(), clustering.clusters.len()).bold()
    );
    for cluster in &clustering.clusters {
        println!();
        println!(
            "  {} {} at ({:.4}, {:.4})",
            "Cluster".bold(),
            cluster.index,
            cluster.centroid.x,
            cluster.centroid.y
        );
        println!("    Members: {:?}", cluster.members);
        println!("    Keywords: {}", cluster.keywords.join(", ").cyan());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_polyline() {
        let polyline = parse_polyline("0.1, 0.5,0.9").unwrap();
        assert_eq!(polyline.as_slice(), &[0.1, 0.5, 0.9]);
        assert!(parse_polyline("0.1,abc").is_err());
        assert!(parse_polyline("").is_err());
    }

    #[test]
    fn test_cluster_file_projects_missing_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summaries.json");
        std::fs::write(
            &path,
            r#"[
                {"polyline": [0.9, 0.1, 0.1], "keywords": ["sets"]},
                {"polyline": [0.9, 0.1, 0.1], "keywords": ["sets", "union"], "position": {"x": 0.5, "y": 0.1}}
            ]"#,
        )
        .unwrap();

        let clustering = cluster_file(&path, &EngineConfigManifest::default()).unwrap();
        assert_eq!(clustering.labels.len(), 2);
        assert_eq!(clustering.clusters.len(), 1);
        assert_eq!(clustering.clusters[0].keywords[0], "sets");
    }
}
