// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Scenario runner
//!
//! Loads a YAML scenario (topics, resources, learners and their steps), runs
//! it through an engine built from the active configuration and reports the
//! final state of every enrollment.
//!
//! ```yaml
//! topics:
//!   - name: sets
//!     description: sets, elements and membership
//! resources:
//!   - name: Intro to sets
//!     module: 1
//!     keywords: [sets, elements]
//! learners:
//!   - name: alice
//!     steps:
//!       - type: summary
//!         topic: sets
//!         text: "Sets\nA set is a collection of distinct elements."
//!       - type: view
//!         resource: Intro to sets
//!       - type: grade
//!         contribution: 0
//!         grade: 0.5
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

use knowmap_core::application::catalog_service::RegisterResourceRequest;
use knowmap_core::application::engine::KnowmapEngine;
use knowmap_core::application::progress_service::{SubmitQuizRequest, SubmitSummaryRequest};
use knowmap_core::domain::contribution::Contribution;
use knowmap_core::domain::course::{CourseId, ModuleId, Topic, TopicId};
use knowmap_core::domain::engine_config::EngineConfigManifest;
use knowmap_core::domain::enrollment::{Enrollment, EnrollmentId, LearnerId};
use knowmap_core::domain::polyline::Polyline;
use knowmap_core::domain::repository::TopicRepository;
use knowmap_core::domain::resource::ResourceId;

#[derive(Args)]
pub struct SimulateArgs {
    /// Scenario YAML file
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub topics: Vec<ScenarioTopic>,
    #[serde(default)]
    pub resources: Vec<ScenarioResource>,
    #[serde(default)]
    pub learners: Vec<ScenarioLearner>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioTopic {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioResource {
    pub name: String,
    pub module: u32,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub beta: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioLearner {
    pub name: String,
    #[serde(default)]
    pub steps: Vec<ScenarioStep>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioStep {
    Summary {
        topic: String,
        text: String,
    },
    View {
        resource: String,
    },
    Quiz {
        questions: Vec<Vec<f64>>,
        /// Defaults to every question
        #[serde(default)]
        considered: Option<Vec<bool>>,
    },
    /// Regrade the learner's n-th contribution (0-based).
    Grade {
        contribution: usize,
        grade: f64,
    },
}

/// Final state of one learner.
#[derive(Debug, Serialize)]
pub struct LearnerReport {
    pub learner: String,
    pub enrollment: Enrollment,
    pub contributions: Vec<Contribution>,
    pub accessible: Vec<String>,
}

impl Scenario {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        serde_yaml::from_str(&raw).with_context(|| format!("Failed to parse scenario {:?}", path))
    }
}

pub async fn run(args: SimulateArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = EngineConfigManifest::load_or_default(config_path).context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;
    let scenario = Scenario::from_yaml_file(&args.scenario)?;

    let engine = KnowmapEngine::from_manifest(&config).context("Failed to initialize engine")?;
    let reports = simulate(&engine, &scenario).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        println!(
            "{} at ({:.4}, {:.4}) after {} contributions",
            report.learner.bold(),
            report.enrollment.position.x,
            report.enrollment.position.y,
            report.contributions.len()
        );
        println!("  Accessible: {}", report.accessible.join(", ").cyan());
    }
    Ok(())
}

/// Seed a fresh course from `scenario` and play every learner's steps in order.
pub async fn simulate(engine: &KnowmapEngine, scenario: &Scenario) -> Result<Vec<LearnerReport>> {
    let course_id = CourseId::new();

    let mut topics: HashMap<String, TopicId> = HashMap::new();
    for (ordinal, entry) in scenario.topics.iter().enumerate() {
        let mut topic = Topic::new(course_id, ordinal as u32, entry.name.clone());
        if let Some(description) = &entry.description {
            topic = topic.with_description(description.clone());
        }
        engine.repositories.topics.save(&topic).await?;
        topics.insert(entry.name.clone(), topic.id);
    }
    let axes = engine.catalog.backfill_topics(course_id).await?;
    info!(course_id = %course_id, axes, "Seeded scenario topics");

    let mut resources: HashMap<String, ResourceId> = HashMap::new();
    let mut names: HashMap<ResourceId, String> = HashMap::new();
    for entry in &scenario.resources {
        let resource = engine
            .catalog
            .register_resource(RegisterResourceRequest {
                course_id,
                module_id: ModuleId(entry.module),
                name: entry.name.clone(),
                keywords: entry.keywords.clone(),
                beta: entry.beta,
            })
            .await
            .with_context(|| format!("Failed to register resource '{}'", entry.name))?;
        resources.insert(entry.name.clone(), resource.id);
        names.insert(resource.id, entry.name.clone());
    }

    let mut reports = Vec::with_capacity(scenario.learners.len());
    for learner in &scenario.learners {
        let enrollment = engine.progress.enroll(LearnerId::new(), course_id).await?;
        for (index, step) in learner.steps.iter().enumerate() {
            apply_step(engine, enrollment.id, step, &topics, &resources)
                .await
                .with_context(|| format!("Learner '{}' step {} failed", learner.name, index))?;
        }

        let enrollment = engine.progress.enrollment(enrollment.id).await?;
        let contributions = engine.progress.contributions(enrollment.id).await?;
        let accessible = enrollment
            .accessible_resources
            .iter()
            .map(|id| names.get(id).cloned().unwrap_or_else(|| id.to_string()))
            .collect();
        reports.push(LearnerReport {
            learner: learner.name.clone(),
            enrollment,
            contributions,
            accessible,
        });
    }
    Ok(reports)
}

async fn apply_step(
    engine: &KnowmapEngine,
    enrollment_id: EnrollmentId,
    step: &ScenarioStep,
    topics: &HashMap<String, TopicId>,
    resources: &HashMap<String, ResourceId>,
) -> Result<()> {
    match step {
        ScenarioStep::Summary { topic, text } => {
            let topic_id = *topics.get(topic).ok_or_else(|| anyhow!("Unknown topic '{}'", topic))?;
            engine
                .progress
                .submit_summary(SubmitSummaryRequest {
                    enrollment_id,
                    topic_id,
                    text: text.clone(),
                })
                .await?;
        }
        ScenarioStep::View { resource } => {
            let resource_id = *resources
                .get(resource)
                .ok_or_else(|| anyhow!("Unknown resource '{}'", resource))?;
            engine.progress.view_resource(enrollment_id, resource_id).await?;
        }
        ScenarioStep::Quiz { questions, considered } => {
            let questions = questions
                .iter()
                .map(|q| Polyline::new(q.clone()))
                .collect::<Result<Vec<_>, _>>()
                .context("Invalid quiz question")?;
            let considered = considered.clone().unwrap_or_else(|| vec![true; questions.len()]);
            engine
                .progress
                .submit_quiz(SubmitQuizRequest {
                    enrollment_id,
                    questions,
                    considered,
                })
                .await?;
        }
        ScenarioStep::Grade { contribution, grade } => {
            let chain = engine.progress.contributions(enrollment_id).await?;
            let target = chain
                .get(*contribution)
                .ok_or_else(|| anyhow!("No contribution #{} ({} recorded)", contribution, chain.len()))?;
            engine.progress.revise_grade(target.id, *grade).await?;
        }
    }
    Ok(())
}
