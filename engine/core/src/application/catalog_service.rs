// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Catalog Service
//!
//! Course-level map operations outside any single enrollment: resource
//! ingestion and repositioning, topic backfill, module centroids and quiz
//! aggregate polylines.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::application::error::ProgressError;
use crate::application::summary_encoder::SummaryEncoder;
use crate::application::topic_cache::TopicCache;
use crate::domain::course::{CourseId, ModuleId};
use crate::domain::events::ProgressEvent;
use crate::domain::geometry::{Position, RadialProjector};
use crate::domain::polyline::{highline, mean_polyline, Polyline};
use crate::domain::repository::ResourceRepository;
use crate::domain::resource::{ResourceId, ResourceProfile};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResourceRequest {
    pub course_id: CourseId,
    pub module_id: ModuleId,
    pub name: String,
    pub keywords: Vec<String>,
    pub beta: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFit {
    pub beta: f64,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleCentroid {
    pub module_id: ModuleId,
    pub polyline: Polyline,
    pub position: Position,
    pub resource_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizProfile {
    pub polyline: Polyline,
    pub position: Position,
}

#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Profile a resource from its keywords and store it.
    async fn register_resource(&self, request: RegisterResourceRequest) -> Result<ResourceProfile, ProgressError>;

    /// The integer beta whose projection lands closest to `target`.
    async fn suggest_resource_position(
        &self,
        resource_id: ResourceId,
        target: Position,
    ) -> Result<PositionFit, ProgressError>;

    /// Apply [`CatalogService::suggest_resource_position`] to the stored resource.
    async fn reposition_resource(
        &self,
        resource_id: ResourceId,
        target: Position,
    ) -> Result<ResourceProfile, ProgressError>;

    /// Recompute topic embeddings and similarity rows; returns the axis count.
    async fn backfill_topics(&self, course_id: CourseId) -> Result<usize, ProgressError>;

    /// Mean beta-scaled polyline per module, projected.
    async fn module_centroids(&self, course_id: CourseId) -> Result<Vec<ModuleCentroid>, ProgressError>;

    /// Highline of a quiz's question polylines, projected.
    async fn quiz_polyline(&self, course_id: CourseId, questions: &[Polyline]) -> Result<QuizProfile, ProgressError>;
}

pub struct StandardCatalogService {
    resources: Arc<dyn ResourceRepository>,
    topic_cache: Arc<TopicCache>,
    encoder: Arc<SummaryEncoder>,
    projector: RadialProjector,
    event_bus: Arc<EventBus>,
}

impl StandardCatalogService {
    pub fn new(
        resources: Arc<dyn ResourceRepository>,
        topic_cache: Arc<TopicCache>,
        encoder: Arc<SummaryEncoder>,
        projector: RadialProjector,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            resources,
            topic_cache,
            encoder,
            projector,
            event_bus,
        }
    }

    async fn load_resource(&self, resource_id: ResourceId) -> Result<ResourceProfile, ProgressError> {
        self.resources
            .find_by_id(resource_id)
            .await?
            .ok_or_else(|| ProgressError::NotFound(format!("resource {}", resource_id)))
    }
}

#[async_trait]
impl CatalogService for StandardCatalogService {
    async fn register_resource(&self, request: RegisterResourceRequest) -> Result<ResourceProfile, ProgressError> {
        if !request.beta.is_finite() {
            return Err(ProgressError::InvalidInput(format!("beta {} is not finite", request.beta)));
        }
        let topics = self.topic_cache.topic_set(request.course_id).await?;
        let polyline = self.encoder.keyword_profile(&request.keywords, &topics).await?;

        let resource = ResourceProfile::new(
            request.course_id,
            request.module_id,
            request.name,
            polyline,
            request.beta,
            &self.projector,
        )?;
        self.resources.save(&resource).await?;

        info!(
            resource_id = %resource.id,
            course_id = %resource.course_id,
            module_id = %resource.module_id,
            x = resource.position.x,
            y = resource.position.y,
            "Registered resource"
        );
        Ok(resource)
    }

    async fn suggest_resource_position(
        &self,
        resource_id: ResourceId,
        target: Position,
    ) -> Result<PositionFit, ProgressError> {
        let resource = self.load_resource(resource_id).await?;
        let (beta, position) = resource.fit_beta(&target, &self.projector)?;
        Ok(PositionFit { beta, position })
    }

    async fn reposition_resource(
        &self,
        resource_id: ResourceId,
        target: Position,
    ) -> Result<ResourceProfile, ProgressError> {
        let mut resource = self.load_resource(resource_id).await?;
        let (beta, position) = resource.fit_beta(&target, &self.projector)?;
        resource.beta = beta;
        resource.position = position;
        self.resources.save(&resource).await?;

        info!(resource_id = %resource_id, beta, x = position.x, y = position.y, "Repositioned resource");
        Ok(resource)
    }

    async fn backfill_topics(&self, course_id: CourseId) -> Result<usize, ProgressError> {
        let set = self.topic_cache.backfill(course_id).await?;
        self.event_bus.publish_progress_event(ProgressEvent::TopicsBackfilled {
            course_id,
            topic_count: set.num_axes(),
            backfilled_at: Utc::now(),
        });
        Ok(set.num_axes())
    }

    async fn module_centroids(&self, course_id: CourseId) -> Result<Vec<ModuleCentroid>, ProgressError> {
        let resources = self.resources.find_by_course(course_id).await?;

        let mut by_module: BTreeMap<ModuleId, Vec<Polyline>> = BTreeMap::new();
        for resource in &resources {
            by_module
                .entry(resource.module_id)
                .or_default()
                .push(resource.scaled_polyline());
        }

        by_module
            .into_iter()
            .map(|(module_id, polylines)| -> Result<ModuleCentroid, ProgressError> {
                let polyline = mean_polyline(&polylines)?;
                let position = self.projector.project(&polyline)?;
                Ok(ModuleCentroid {
                    module_id,
                    polyline,
                    position,
                    resource_count: polylines.len(),
                })
            })
            .collect()
    }

    async fn quiz_polyline(&self, course_id: CourseId, questions: &[Polyline]) -> Result<QuizProfile, ProgressError> {
        let topics = self.topic_cache.topic_set(course_id).await?;
        for question in questions {
            question.ensure_len(topics.num_axes())?;
        }
        let polyline = highline(questions)?;
        let position = self.projector.project(&polyline)?;
        Ok(QuizProfile { polyline, position })
    }
}
