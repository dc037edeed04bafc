// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Engine Configuration Types
//
// Kubernetes-style manifest (apiVersion/kind/metadata/spec) holding:
// - Progression tuning (nearest-k, view nudge, default grade, summary beta)
// - Clustering limits
// - NLP collaborator endpoint and timeout

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const API_VERSION: &str = "100monkeys.ai/v1";
pub const KIND: &str = "EngineConfig";

/// Top-level engine configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfigManifest {
    /// API version (must be "100monkeys.ai/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "EngineConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: EngineConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfigSpec {
    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub nlp: NlpSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Resources unlocked by the proximity rule
    #[serde(default = "default_nearest_k")]
    pub nearest_k: usize,

    /// Weight of a viewed resource's polyline in the linear nudge
    #[serde(default = "default_view_nudge")]
    pub view_nudge: f64,

    /// Grade recorded on new contributions
    #[serde(default = "default_grade")]
    pub default_grade: f64,

    /// Variance scaling applied to encoded summaries
    #[serde(default = "default_summary_beta")]
    pub summary_beta: f64,

    /// Keywords extracted per summary
    #[serde(default = "default_summary_keywords")]
    pub summary_keywords: usize,

    #[serde(default = "default_max_cluster_keywords")]
    pub max_cluster_keywords: usize,

    #[serde(default = "default_kmeans_max_iterations")]
    pub kmeans_max_iterations: usize,

    /// Attempts on a persistence conflict before giving up
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NlpProviderKind {
    /// Deterministic local hashing, no network
    Hash,
    /// Remote NLP service over HTTP
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NlpSettings {
    #[serde(default = "default_nlp_provider")]
    pub provider: NlpProviderKind,

    #[serde(default = "default_nlp_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_nlp_timeout_secs")]
    pub timeout_secs: u64,

    /// Dimension of hash embeddings
    #[serde(default = "default_hash_dimensions")]
    pub hash_dimensions: usize,
}

fn default_nearest_k() -> usize {
    7
}

fn default_view_nudge() -> f64 {
    0.01
}

fn default_grade() -> f64 {
    1.0
}

fn default_summary_beta() -> f64 {
    15.0
}

fn default_summary_keywords() -> usize {
    10
}

fn default_max_cluster_keywords() -> usize {
    10
}

fn default_kmeans_max_iterations() -> usize {
    100
}

fn default_conflict_retries() -> u32 {
    3
}

fn default_nlp_provider() -> NlpProviderKind {
    NlpProviderKind::Hash
}

fn default_nlp_endpoint() -> String {
    "http://localhost:8090".to_string()
}

fn default_nlp_timeout_secs() -> u64 {
    30
}

fn default_hash_dimensions() -> usize {
    384
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            nearest_k: default_nearest_k(),
            view_nudge: default_view_nudge(),
            default_grade: default_grade(),
            summary_beta: default_summary_beta(),
            summary_keywords: default_summary_keywords(),
            max_cluster_keywords: default_max_cluster_keywords(),
            kmeans_max_iterations: default_kmeans_max_iterations(),
            conflict_retries: default_conflict_retries(),
        }
    }
}

impl Default for NlpSettings {
    fn default() -> Self {
        Self {
            provider: default_nlp_provider(),
            endpoint: default_nlp_endpoint(),
            timeout_secs: default_nlp_timeout_secs(),
            hash_dimensions: default_hash_dimensions(),
        }
    }
}

impl Default for EngineConfigManifest {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "knowmap".to_string(),
                version: Some("1.0.0".to_string()),
            },
            spec: EngineConfigSpec::default(),
        }
    }
}

impl EngineConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. KNOWMAP_CONFIG_PATH environment variable
    /// 2. ./knowmap-config.yaml (working directory)
    /// 3. ~/.knowmap/config.yaml (user home)
    /// 4. /etc/knowmap/config.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("KNOWMAP_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./knowmap-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".knowmap").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        let system_config = PathBuf::from("/etc/knowmap/config.yaml");
        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("KNOWMAP_NLP_ENDPOINT") {
            tracing::info!("Environment override: KNOWMAP_NLP_ENDPOINT={}", val);
            self.spec.nlp.endpoint = val;
        }

        if let Ok(val) = std::env::var("KNOWMAP_NLP_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => {
                    tracing::info!("Environment override: KNOWMAP_NLP_TIMEOUT_SECS={}", secs);
                    self.spec.nlp.timeout_secs = secs;
                }
                Err(_) => {
                    tracing::warn!(
                        "Invalid value for KNOWMAP_NLP_TIMEOUT_SECS: '{}'. Expected seconds. Ignoring.",
                        val
                    );
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!("Invalid apiVersion: '{}'. Must be '{}'", self.api_version, API_VERSION);
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let engine = &self.spec.engine;
        if engine.nearest_k == 0 {
            anyhow::bail!("spec.engine.nearest_k must be at least 1");
        }
        if !engine.view_nudge.is_finite() || engine.view_nudge < 0.0 {
            anyhow::bail!("spec.engine.view_nudge must be a non-negative number");
        }
        if !engine.default_grade.is_finite() || engine.default_grade < 0.0 {
            anyhow::bail!("spec.engine.default_grade must be a non-negative number");
        }
        if !engine.summary_beta.is_finite() {
            anyhow::bail!("spec.engine.summary_beta must be finite");
        }
        if engine.summary_keywords == 0 {
            anyhow::bail!("spec.engine.summary_keywords must be at least 1");
        }
        if engine.kmeans_max_iterations == 0 {
            anyhow::bail!("spec.engine.kmeans_max_iterations must be at least 1");
        }
        if engine.conflict_retries == 0 {
            anyhow::bail!("spec.engine.conflict_retries must be at least 1");
        }

        let nlp = &self.spec.nlp;
        if nlp.provider == NlpProviderKind::Http {
            if nlp.endpoint.is_empty() {
                anyhow::bail!("spec.nlp.endpoint cannot be empty for the http provider");
            }
            if nlp.timeout_secs == 0 {
                anyhow::bail!("spec.nlp.timeout_secs must be at least 1");
            }
        }
        if nlp.hash_dimensions == 0 {
            anyhow::bail!("spec.nlp.hash_dimensions must be at least 1");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_manifest() {
        let manifest = EngineConfigManifest::default();
        assert_eq!(manifest.api_version, API_VERSION);
        assert_eq!(manifest.kind, KIND);
        assert_eq!(manifest.spec.engine.nearest_k, 7);
        assert_eq!(manifest.spec.engine.view_nudge, 0.01);
        assert_eq!(manifest.spec.nlp.provider, NlpProviderKind::Hash);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
apiVersion: 100monkeys.ai/v1
kind: EngineConfig
metadata:
  name: campus
spec:
  engine:
    nearest_k: 5
  nlp:
    provider: http
    endpoint: http://nlp.internal:9000
"#;
        let manifest = EngineConfigManifest::from_yaml_str(yaml).unwrap();
        assert_eq!(manifest.spec.engine.nearest_k, 5);
        assert_eq!(manifest.spec.engine.summary_beta, 15.0);
        assert_eq!(manifest.spec.nlp.provider, NlpProviderKind::Http);
        assert_eq!(manifest.spec.nlp.timeout_secs, 30);
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_yaml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("knowmap-config.yaml");

        let mut manifest = EngineConfigManifest::default();
        manifest.metadata.name = "test-engine".to_string();
        manifest.spec.engine.conflict_retries = 5;
        manifest.to_yaml_file(&path).unwrap();

        let loaded = EngineConfigManifest::load_or_default(Some(path)).unwrap();
        assert_eq!(loaded.metadata.name, "test-engine");
        assert_eq!(loaded.spec.engine.conflict_retries, 5);
    }

    #[test]
    fn test_explicit_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = EngineConfigManifest::load_or_default(Some(dir.path().join("absent.yaml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        let mut manifest = EngineConfigManifest::default();

        manifest.kind = "NodeConfig".to_string();
        assert!(manifest.validate().is_err());
        manifest.kind = KIND.to_string();

        manifest.spec.engine.nearest_k = 0;
        assert!(manifest.validate().is_err());
        manifest.spec.engine.nearest_k = 7;

        manifest.spec.engine.view_nudge = -0.5;
        assert!(manifest.validate().is_err());
        manifest.spec.engine.view_nudge = 0.01;

        manifest.spec.nlp.provider = NlpProviderKind::Http;
        manifest.spec.nlp.endpoint = String::new();
        assert!(manifest.validate().is_err());
    }
}
