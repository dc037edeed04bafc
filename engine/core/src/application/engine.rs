// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Engine Wiring - Application Layer
//!
//! Builds the repositories, NLP clients and services from an
//! [`EngineConfigManifest`] and hands out the service handles. Storage is
//! in-memory; every repository is exposed so callers can seed courses and
//! inspect state.

use std::sync::Arc;

use tracing::info;

use crate::application::catalog_service::{CatalogService, StandardCatalogService};
use crate::application::cluster_service::{ClusterService, StandardClusterService};
use crate::application::error::ProgressError;
use crate::application::progress_service::{ProgressRepositories, ProgressService, StandardProgressService};
use crate::application::summary_encoder::SummaryEncoder;
use crate::application::topic_cache::TopicCache;
use crate::domain::clustering::ClusteringEngine;
use crate::domain::engine_config::{EngineConfigManifest, EngineSettings};
use crate::domain::geometry::RadialProjector;
use crate::domain::nlp::{EmbeddingService, KeywordExtractor};
use crate::infrastructure::event_bus::EventBus;
use crate::infrastructure::nlp::NlpClients;
use crate::infrastructure::repositories::{
    InMemoryClusterRepository, InMemoryContributionRepository, InMemoryEnrollmentRepository,
    InMemoryProgressStore, InMemoryResourceRepository, InMemorySummaryRepository, InMemoryTopicRepository,
};

/// Shared repositories behind the services.
#[derive(Clone)]
pub struct EngineRepositories {
    pub topics: Arc<InMemoryTopicRepository>,
    pub resources: Arc<InMemoryResourceRepository>,
    pub enrollments: Arc<InMemoryEnrollmentRepository>,
    pub contributions: Arc<InMemoryContributionRepository>,
    /// Writes through to `enrollments` and `contributions`.
    pub progress_store: Arc<InMemoryProgressStore>,
    pub summaries: Arc<InMemorySummaryRepository>,
    pub clusters: Arc<InMemoryClusterRepository>,
}

impl EngineRepositories {
    pub fn in_memory() -> Self {
        let enrollments = InMemoryEnrollmentRepository::new();
        let contributions = InMemoryContributionRepository::new();
        Self {
            topics: Arc::new(InMemoryTopicRepository::new()),
            resources: Arc::new(InMemoryResourceRepository::new()),
            progress_store: Arc::new(InMemoryProgressStore::new(&enrollments, &contributions)),
            enrollments: Arc::new(enrollments),
            contributions: Arc::new(contributions),
            summaries: Arc::new(InMemorySummaryRepository::new()),
            clusters: Arc::new(InMemoryClusterRepository::new()),
        }
    }
}

pub struct KnowmapEngine {
    pub repositories: EngineRepositories,
    pub event_bus: Arc<EventBus>,
    pub projector: RadialProjector,
    pub progress: Arc<dyn ProgressService>,
    pub catalog: Arc<dyn CatalogService>,
    pub clusters: Arc<dyn ClusterService>,
}

impl KnowmapEngine {
    /// Wire an engine with the NLP provider the manifest selects.
    pub fn from_manifest(manifest: &EngineConfigManifest) -> Result<Self, ProgressError> {
        let nlp = NlpClients::from_settings(&manifest.spec.nlp)?;
        info!(
            provider = ?manifest.spec.nlp.provider,
            config = %manifest.metadata.name,
            "Initializing knowmap engine"
        );
        Ok(Self::with_nlp(manifest.spec.engine.clone(), nlp.embedder, nlp.keywords))
    }

    pub fn with_nlp(
        settings: EngineSettings,
        embedder: Arc<dyn EmbeddingService>,
        extractor: Arc<dyn KeywordExtractor>,
    ) -> Self {
        let repositories = EngineRepositories::in_memory();
        let event_bus = Arc::new(EventBus::with_default_capacity());
        let projector = RadialProjector::new();

        let topic_cache = Arc::new(TopicCache::new(repositories.topics.clone(), embedder.clone()));
        let encoder = Arc::new(SummaryEncoder::new(embedder, extractor, settings.summary_keywords));

        let clusters: Arc<dyn ClusterService> = Arc::new(StandardClusterService::new(
            repositories.summaries.clone(),
            repositories.clusters.clone(),
            ClusteringEngine::new(settings.kmeans_max_iterations, settings.max_cluster_keywords),
            event_bus.clone(),
        ));

        let catalog: Arc<dyn CatalogService> = Arc::new(StandardCatalogService::new(
            repositories.resources.clone(),
            topic_cache.clone(),
            encoder.clone(),
            projector.clone(),
            event_bus.clone(),
        ));

        let progress: Arc<dyn ProgressService> = Arc::new(StandardProgressService::new(
            ProgressRepositories {
                enrollments: repositories.enrollments.clone(),
                contributions: repositories.contributions.clone(),
                store: repositories.progress_store.clone(),
                resources: repositories.resources.clone(),
                summaries: repositories.summaries.clone(),
            },
            topic_cache,
            encoder,
            clusters.clone(),
            projector.clone(),
            settings,
            event_bus.clone(),
        ));

        Self {
            repositories,
            event_bus,
            projector,
            progress,
            catalog,
            clusters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::engine_config::NlpProviderKind;

    #[test]
    fn test_default_manifest_wires_hash_provider() {
        let manifest = EngineConfigManifest::default();
        assert_eq!(manifest.spec.nlp.provider, NlpProviderKind::Hash);
        let engine = KnowmapEngine::from_manifest(&manifest).unwrap();
        assert_eq!(engine.event_bus.subscriber_count(), 0);
    }
}
