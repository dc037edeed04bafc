// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Recomputes summary clusters per (course, topic) scope. Every recompute
//! reads the full summary set of the scope, clusters it from scratch,
//! replaces the stored clusters and writes each summary's new cluster index
//! back to its record; calls on one scope are serialized.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use crate::application::error::ProgressError;
use crate::application::locks::KeyedLocks;
use crate::domain::clustering::{ClusterInput, ClusteringEngine};
use crate::domain::events::ProgressEvent;
use crate::domain::repository::{ClusterRepository, SummaryRepository};
use crate::domain::summary::{Cluster, ClusterId, ClusterScope};
use crate::infrastructure::event_bus::EventBus;

#[async_trait]
pub trait ClusterService: Send + Sync {
    /// Recluster every summary in `scope` and replace its stored clusters.
    async fn recompute(&self, scope: ClusterScope) -> Result<Vec<Cluster>, ProgressError>;

    async fn scope_clusters(&self, scope: ClusterScope) -> Result<Vec<Cluster>, ProgressError>;
}

pub struct StandardClusterService {
    summaries: Arc<dyn SummaryRepository>,
    clusters: Arc<dyn ClusterRepository>,
    engine: ClusteringEngine,
    event_bus: Arc<EventBus>,
    locks: KeyedLocks<ClusterScope>,
}

impl StandardClusterService {
    pub fn new(
        summaries: Arc<dyn SummaryRepository>,
        clusters: Arc<dyn ClusterRepository>,
        engine: ClusteringEngine,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            summaries,
            clusters,
            engine,
            event_bus,
            locks: KeyedLocks::new(),
        }
    }
}

#[async_trait]
impl ClusterService for StandardClusterService {
    async fn recompute(&self, scope: ClusterScope) -> Result<Vec<Cluster>, ProgressError> {
        let _guard = self.locks.lock(&scope).await;

        let mut summaries = self.summaries.find_by_scope(scope).await?;
        let inputs: Vec<ClusterInput> = summaries
            .iter()
            .map(|s| ClusterInput {
                polyline: s.polyline.clone(),
                position: s.position,
                keywords: s.keywords.clone(),
            })
            .collect();

        let clustering = self.engine.cluster(&inputs)?;
        let computed_at = Utc::now();
        let clusters: Vec<Cluster> = clustering
            .clusters
            .iter()
            .cloned()
            .map(|summary| Cluster {
                id: ClusterId::new(),
                scope,
                index: summary.index,
                centroid: summary.centroid,
                keywords: summary.keywords,
                summaries: summary.members.iter().map(|&i| summaries[i].id).collect(),
                enrollments: summary
                    .members
                    .iter()
                    .map(|&i| summaries[i].enrollment_id)
                    .collect::<BTreeSet<_>>(),
                computed_at,
            })
            .collect();

        self.clusters.replace_scope(scope, clusters.clone()).await?;

        for (summary, label) in summaries.iter_mut().zip(&clustering.labels) {
            if summary.cluster_index != Some(*label) {
                summary.cluster_index = Some(*label);
                self.summaries.save(summary).await?;
            }
        }

        info!(
            scope = %scope,
            summaries = summaries.len(),
            clusters = clusters.len(),
            "Recomputed clusters"
        );
        self.event_bus.publish_progress_event(ProgressEvent::ClustersRecomputed {
            scope,
            cluster_count: clusters.len(),
            summary_count: summaries.len(),
            recomputed_at: computed_at,
        });

        Ok(clusters)
    }

    async fn scope_clusters(&self, scope: ClusterScope) -> Result<Vec<Cluster>, ProgressError> {
        Ok(self.clusters.find_by_scope(scope).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::course::{CourseId, TopicId};
    use crate::domain::enrollment::EnrollmentId;
    use crate::domain::geometry::Position;
    use crate::domain::polyline::Polyline;
    use crate::domain::summary::SummaryRecord;
    use crate::infrastructure::repositories::{InMemoryClusterRepository, InMemorySummaryRepository};

    fn service() -> (StandardClusterService, Arc<InMemorySummaryRepository>) {
        let summaries = Arc::new(InMemorySummaryRepository::new());
        let service = StandardClusterService::new(
            summaries.clone(),
            Arc::new(InMemoryClusterRepository::new()),
            ClusteringEngine::default(),
            Arc::new(EventBus::new(16)),
        );
        (service, summaries)
    }

    fn record(scope: ClusterScope, values: &[f64], keywords: &[&str]) -> SummaryRecord {
        SummaryRecord::new(
            EnrollmentId::new(),
            scope,
            "summary",
            keywords.iter().map(|k| k.to_string()).collect(),
            Polyline::new(values.to_vec()).unwrap(),
            Position::new(values[0], values[1]),
        )
    }

    #[tokio::test]
    async fn test_empty_scope_has_no_clusters() {
        let (service, _) = service();
        let scope = ClusterScope::new(CourseId::new(), TopicId::new());
        assert!(service.recompute(scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recompute_replaces_scope() {
        let (service, summaries) = service();
        let scope = ClusterScope::new(CourseId::new(), TopicId::new());

        let first = record(scope, &[0.1, 0.2], &["sets"]);
        summaries.save(&first).await.unwrap();
        let clusters = service.recompute(scope).await.unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].centroid, Position::new(0.1, 0.2));
        assert!(clusters[0].contains_summary(&first.id));

        summaries.save(&record(scope, &[0.3, 0.4], &["logic"])).await.unwrap();
        service.recompute(scope).await.unwrap();

        let records = summaries.find_by_scope(scope).await.unwrap();
        assert!(records.iter().all(|r| r.cluster_index == Some(0)));

        let stored = service.scope_clusters(scope).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].summaries.len(), 2);
        assert_eq!(stored[0].enrollments.len(), 2);
        assert_eq!(stored[0].keywords, vec!["sets", "logic"]);
    }

    #[tokio::test]
    async fn test_scopes_are_independent() {
        let (service, summaries) = service();
        let course = CourseId::new();
        let a = ClusterScope::new(course, TopicId::new());
        let b = ClusterScope::new(course, TopicId::new());

        summaries.save(&record(a, &[0.1, 0.2], &["sets"])).await.unwrap();
        service.recompute(a).await.unwrap();
        service.recompute(b).await.unwrap();

        assert_eq!(service.scope_clusters(a).await.unwrap().len(), 1);
        assert!(service.scope_clusters(b).await.unwrap().is_empty());
    }
}
