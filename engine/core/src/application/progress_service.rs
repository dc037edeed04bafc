// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Progress Service
//!
//! Owns the enrollment state machine (`Created → Active`). Every transition
//! is a read-modify-write of one enrollment and its contribution chain:
//!
//! | Operation | Polyline update | Contribution |
//! |-----------|-----------------|--------------|
//! | [`ProgressService::enroll`] | lowline of first-module resources | none |
//! | [`ProgressService::submit_summary`] | `highline(current, encoded)` | `summary` |
//! | [`ProgressService::view_resource`] | `current + nudge · resource` | none |
//! | [`ProgressService::submit_quiz`] | `highline(current, considered…)` | `quiz_update` |
//! | [`ProgressService::revise_grade`] | replay of the chain suffix | rewritten |
//!
//! Writes to one enrollment are serialized by a per-enrollment lock; the
//! repository's version check catches writers outside this process, in which
//! case the operation re-reads state and is applied again. Every state is
//! built in full before anything is written: polyline, position, accessible
//! set and the contribution chain change together in one
//! [`ProgressStore::commit_progress`], so a failed attempt leaves nothing
//! behind.
//!
//! A summary is committed before it is clustered. Storing its record and
//! reclustering the scope happen afterwards and cannot fail the submission;
//! on error the summary is reported without a cluster.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::application::cluster_service::ClusterService;
use crate::application::error::ProgressError;
use crate::application::locks::KeyedLocks;
use crate::application::summary_encoder::SummaryEncoder;
use crate::application::topic_cache::TopicCache;
use crate::domain::accessibility::AccessibilityResolver;
use crate::domain::contribution::{Contribution, ContributionChain, ContributionId, ContributionKind};
use crate::domain::course::{CourseId, ModuleId, TopicId};
use crate::domain::engine_config::EngineSettings;
use crate::domain::enrollment::{Enrollment, EnrollmentId, LearnerId};
use crate::domain::events::{AdvanceCause, ProgressEvent};
use crate::domain::geometry::{Position, RadialProjector};
use crate::domain::polyline::{highline, lowline, Polyline};
use crate::domain::repository::{
    ContributionRepository, ContributionWrite, EnrollmentRepository, ProgressStore, ResourceRepository,
    SummaryRepository,
};
use crate::domain::resource::{ResourceId, ResourceProfile};
use crate::domain::summary::{Cluster, ClusterScope, SummaryId, SummaryRecord};
use crate::infrastructure::event_bus::EventBus;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitSummaryRequest {
    pub enrollment_id: EnrollmentId,
    pub topic_id: TopicId,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitQuizRequest {
    pub enrollment_id: EnrollmentId,
    /// One polyline per question.
    pub questions: Vec<Polyline>,
    /// Which questions count towards progress, parallel to `questions`.
    pub considered: Vec<bool>,
}

/// State after a progression step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressOutcome {
    pub enrollment: Enrollment,
    pub contribution_id: Option<ContributionId>,
    /// Resources that became accessible in this step.
    pub unlocked: Vec<ResourceId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarySubmission {
    pub enrollment: Enrollment,
    pub contribution_id: ContributionId,
    pub summary_id: SummaryId,
    /// Position of the summary itself, not of the learner.
    pub summary_position: Position,
    pub keywords: Vec<String>,
    pub cluster_index: Option<usize>,
    pub cluster_keywords: Vec<String>,
    pub unlocked: Vec<ResourceId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRevision {
    pub enrollment: Enrollment,
    pub contribution_id: ContributionId,
    /// Contributions recomputed, the revised one included.
    pub replayed: usize,
    pub revoked: Vec<ResourceId>,
    pub unlocked: Vec<ResourceId>,
}

#[async_trait]
pub trait ProgressService: Send + Sync {
    /// Create an enrollment seeded from the course's first module.
    async fn enroll(&self, learner_id: LearnerId, course_id: CourseId) -> Result<Enrollment, ProgressError>;

    /// Encode a summary, fold it into the enrollment and recluster its topic.
    async fn submit_summary(&self, request: SubmitSummaryRequest) -> Result<SummarySubmission, ProgressError>;

    /// Nudge the enrollment towards a viewed resource. No contribution.
    async fn view_resource(
        &self,
        enrollment_id: EnrollmentId,
        resource_id: ResourceId,
    ) -> Result<ProgressOutcome, ProgressError>;

    /// Fold the considered quiz question polylines into the enrollment.
    async fn submit_quiz(&self, request: SubmitQuizRequest) -> Result<ProgressOutcome, ProgressError>;

    /// Regrade a contribution and replay the chain from it.
    async fn revise_grade(&self, contribution_id: ContributionId, grade: f64) -> Result<GradeRevision, ProgressError>;

    async fn enrollment(&self, enrollment_id: EnrollmentId) -> Result<Enrollment, ProgressError>;

    /// The enrollment's contributions in submission order.
    async fn contributions(&self, enrollment_id: EnrollmentId) -> Result<Vec<Contribution>, ProgressError>;
}

/// Repositories the progress service reads and writes.
#[derive(Clone)]
pub struct ProgressRepositories {
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub contributions: Arc<dyn ContributionRepository>,
    /// Atomic enrollment plus contribution writes.
    pub store: Arc<dyn ProgressStore>,
    pub resources: Arc<dyn ResourceRepository>,
    pub summaries: Arc<dyn SummaryRepository>,
}

pub struct StandardProgressService {
    repositories: ProgressRepositories,
    topic_cache: Arc<TopicCache>,
    encoder: Arc<SummaryEncoder>,
    cluster_service: Arc<dyn ClusterService>,
    projector: RadialProjector,
    resolver: AccessibilityResolver,
    settings: EngineSettings,
    event_bus: Arc<EventBus>,
    locks: KeyedLocks<EnrollmentId>,
}

impl StandardProgressService {
    pub fn new(
        repositories: ProgressRepositories,
        topic_cache: Arc<TopicCache>,
        encoder: Arc<SummaryEncoder>,
        cluster_service: Arc<dyn ClusterService>,
        projector: RadialProjector,
        settings: EngineSettings,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            repositories,
            topic_cache,
            encoder,
            cluster_service,
            projector,
            resolver: AccessibilityResolver::new(settings.nearest_k),
            settings,
            event_bus,
            locks: KeyedLocks::new(),
        }
    }

    /// Run `attempt` again while it fails with a persistence conflict, up to
    /// the configured number of tries.
    async fn with_conflict_retry<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T, ProgressError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProgressError>>,
    {
        let max_tries = self.settings.conflict_retries.max(1);
        let mut tries = 0;
        loop {
            tries += 1;
            match attempt().await {
                Err(ProgressError::PersistenceConflict(reason)) if tries < max_tries => {
                    warn!(operation, attempt = tries, reason = %reason, "Persistence conflict, re-reading state");
                }
                result => return result,
            }
        }
    }

    async fn load_enrollment(&self, enrollment_id: EnrollmentId) -> Result<Enrollment, ProgressError> {
        self.repositories
            .enrollments
            .find_by_id(enrollment_id)
            .await?
            .ok_or_else(|| ProgressError::NotFound(format!("enrollment {}", enrollment_id)))
    }

    async fn course_resources(&self, course_id: CourseId) -> Result<Vec<ResourceProfile>, ProgressError> {
        Ok(self.repositories.resources.find_by_course(course_id).await?)
    }

    /// Move `enrollment` to `polyline` and widen its accessible set.
    /// Returns newly unlocked resources.
    fn advance(
        &self,
        enrollment: &mut Enrollment,
        polyline: Polyline,
        resources: &[ResourceProfile],
    ) -> Result<Vec<ResourceId>, ProgressError> {
        let position = self.projector.project(&polyline)?;
        let accessible = self
            .resolver
            .progress(&enrollment.accessible_resources, &polyline, &position, resources)?;
        enrollment.relocate(polyline, position);
        Ok(enrollment.set_accessible(accessible))
    }

    fn publish_advance(&self, enrollment: &Enrollment, from: Position, cause: AdvanceCause, unlocked: &[ResourceId]) {
        let now = Utc::now();
        self.event_bus.publish_progress_event(ProgressEvent::PositionAdvanced {
            enrollment_id: enrollment.id,
            from,
            to: enrollment.position,
            cause,
            advanced_at: now,
        });
        if !unlocked.is_empty() {
            self.event_bus.publish_progress_event(ProgressEvent::ResourcesUnlocked {
                enrollment_id: enrollment.id,
                resource_ids: unlocked.to_vec(),
                unlocked_at: now,
            });
        }
    }

    /// Store a committed summary and recluster its scope. Failures are logged
    /// and leave the summary without a cluster.
    async fn cluster_summary(&self, record: &SummaryRecord) -> Option<Cluster> {
        if let Err(err) = self.repositories.summaries.save(record).await {
            warn!(summary_id = %record.id, error = %err, "Failed to store summary record");
            return None;
        }
        match self.cluster_service.recompute(record.scope).await {
            Ok(clusters) => clusters.into_iter().find(|c| c.contains_summary(&record.id)),
            Err(err) => {
                warn!(scope = %record.scope, summary_id = %record.id, error = %err, "Cluster recompute failed");
                None
            }
        }
    }

    /// Fold graded evidence into the enrollment and append a contribution.
    async fn apply_evidence(
        &self,
        enrollment_id: EnrollmentId,
        evidence: &Polyline,
        kind: ContributionKind,
        content: &str,
        cause: AdvanceCause,
    ) -> Result<ProgressOutcome, ProgressError> {
        let mut enrollment = self.load_enrollment(enrollment_id).await?;
        evidence.ensure_len(enrollment.num_axes())?;

        let resources = self.course_resources(enrollment.course_id).await?;
        let chain = ContributionChain::new(self.repositories.contributions.find_by_enrollment(enrollment_id).await?);

        let grade = self.settings.default_grade;
        let prev_polyline = enrollment.polyline.clone();
        let from = enrollment.position;
        let polyline = highline([&prev_polyline, &evidence.scaled(grade)])?;
        let unlocked = self.advance(&mut enrollment, polyline, &resources)?;

        let contribution = Contribution::new(
            enrollment_id,
            chain.next_sequence(),
            kind,
            content,
            prev_polyline,
            evidence.clone(),
            enrollment.polyline.clone(),
            enrollment.position,
            grade,
        );

        enrollment.version = self
            .repositories
            .store
            .commit_progress(&enrollment, ContributionWrite::Append(contribution.clone()))
            .await?;

        info!(
            enrollment_id = %enrollment_id,
            contribution_id = %contribution.id,
            x = enrollment.position.x,
            y = enrollment.position.y,
            unlocked = unlocked.len(),
            "Applied {:?} contribution",
            kind
        );
        self.publish_advance(&enrollment, from, cause, &unlocked);

        Ok(ProgressOutcome {
            enrollment,
            contribution_id: Some(contribution.id),
            unlocked,
        })
    }

    async fn apply_view(
        &self,
        enrollment_id: EnrollmentId,
        resource_id: ResourceId,
    ) -> Result<ProgressOutcome, ProgressError> {
        let mut enrollment = self.load_enrollment(enrollment_id).await?;
        let resources = self.course_resources(enrollment.course_id).await?;
        let Some(resource) = resources.iter().find(|r| r.id == resource_id) else {
            return match self.repositories.resources.find_by_id(resource_id).await? {
                Some(other) => Err(ProgressError::InvalidInput(format!(
                    "resource {} belongs to course {}, enrollment is in course {}",
                    resource_id, other.course_id, enrollment.course_id
                ))),
                None => Err(ProgressError::NotFound(format!("resource {}", resource_id))),
            };
        };

        let from = enrollment.position;
        let polyline = enrollment.polyline.nudged(&resource.polyline, self.settings.view_nudge)?;
        let unlocked = self.advance(&mut enrollment, polyline, &resources)?;
        enrollment.version = self
            .repositories
            .store
            .commit_progress(&enrollment, ContributionWrite::None)
            .await?;

        debug!(
            enrollment_id = %enrollment_id,
            resource_id = %resource_id,
            x = enrollment.position.x,
            y = enrollment.position.y,
            "Applied resource view"
        );
        self.publish_advance(&enrollment, from, AdvanceCause::ResourceView, &unlocked);

        Ok(ProgressOutcome {
            enrollment,
            contribution_id: None,
            unlocked,
        })
    }

    async fn apply_grade(
        &self,
        enrollment_id: EnrollmentId,
        contribution_id: ContributionId,
        grade: f64,
    ) -> Result<GradeRevision, ProgressError> {
        let mut enrollment = self.load_enrollment(enrollment_id).await?;
        let mut chain = ContributionChain::new(self.repositories.contributions.find_by_enrollment(enrollment_id).await?);
        let index = chain
            .index_of(contribution_id)
            .ok_or_else(|| ProgressError::NotFound(format!("contribution {}", contribution_id)))?;

        chain.set_grade(index, grade);
        let replayed = chain.replay_from(index, &self.projector)?.to_vec();
        let tail = chain
            .tail()
            .ok_or_else(|| ProgressError::NotFound(format!("contribution {}", contribution_id)))?;

        let resources = self.course_resources(enrollment.course_id).await?;
        let prior = enrollment.accessible_resources.clone();
        let accessible = self
            .resolver
            .revise(&prior, &tail.polyline, &tail.position, &resources)?;
        let revoked: Vec<ResourceId> = prior.difference(&accessible).copied().collect();

        enrollment.relocate(tail.polyline.clone(), tail.position);
        let unlocked = enrollment.set_accessible(accessible);

        enrollment.version = self
            .repositories
            .store
            .commit_progress(&enrollment, ContributionWrite::Rewrite(replayed.clone()))
            .await?;

        info!(
            enrollment_id = %enrollment_id,
            contribution_id = %contribution_id,
            grade,
            replayed = replayed.len(),
            revoked = revoked.len(),
            x = enrollment.position.x,
            y = enrollment.position.y,
            "Revised grade"
        );

        let now = Utc::now();
        self.event_bus.publish_progress_event(ProgressEvent::GradeRevised {
            enrollment_id,
            contribution_id,
            grade,
            replayed: replayed.len(),
            revoked: revoked.clone(),
            revised_at: now,
        });
        if !unlocked.is_empty() {
            self.event_bus.publish_progress_event(ProgressEvent::ResourcesUnlocked {
                enrollment_id,
                resource_ids: unlocked.clone(),
                unlocked_at: now,
            });
        }

        Ok(GradeRevision {
            enrollment,
            contribution_id,
            replayed: replayed.len(),
            revoked,
            unlocked,
        })
    }
}

#[async_trait]
impl ProgressService for StandardProgressService {
    async fn enroll(&self, learner_id: LearnerId, course_id: CourseId) -> Result<Enrollment, ProgressError> {
        let first_module = self
            .repositories
            .resources
            .find_by_module(course_id, ModuleId::FIRST)
            .await?;
        if first_module.is_empty() {
            return Err(ProgressError::InvalidInput(format!(
                "course {} has no resources in its first module",
                course_id
            )));
        }

        let scaled: Vec<Polyline> = first_module.iter().map(|r| r.scaled_polyline()).collect();
        let seed = lowline(&scaled)?;
        let position = self.projector.project(&seed)?;
        let accessible: BTreeSet<ResourceId> = self.resolver.initial(&seed, &first_module)?;

        let enrollment = Enrollment::new(learner_id, course_id, seed, position, accessible);
        self.repositories.enrollments.insert(&enrollment).await?;

        info!(
            enrollment_id = %enrollment.id,
            learner_id = %learner_id,
            course_id = %course_id,
            x = position.x,
            y = position.y,
            accessible = enrollment.accessible_resources.len(),
            "Enrolled learner"
        );
        self.event_bus.publish_progress_event(ProgressEvent::Enrolled {
            enrollment_id: enrollment.id,
            learner_id,
            course_id,
            position,
            enrolled_at: enrollment.created_at,
        });

        Ok(enrollment)
    }

    async fn submit_summary(&self, request: SubmitSummaryRequest) -> Result<SummarySubmission, ProgressError> {
        let enrollment_id = request.enrollment_id;
        let course_id = self.load_enrollment(enrollment_id).await?.course_id;

        let topics = self.topic_cache.topic_set(course_id).await?;
        if !topics.contains_topic(&request.topic_id) {
            return Err(ProgressError::NotFound(format!(
                "topic {} in course {}",
                request.topic_id, course_id
            )));
        }
        let encoded = self
            .encoder
            .encode(&request.text, &topics, self.settings.summary_beta)
            .await?;
        let summary_position = self.projector.project(&encoded.polyline)?;

        let outcome = {
            let _guard = self.locks.lock(&enrollment_id).await;
            self.with_conflict_retry("submit_summary", || {
                self.apply_evidence(
                    enrollment_id,
                    &encoded.polyline,
                    ContributionKind::Summary,
                    &request.text,
                    AdvanceCause::Summary,
                )
            })
            .await?
        };

        let contribution_id = outcome
            .contribution_id
            .ok_or_else(|| ProgressError::InvalidInput("summary produced no contribution".to_string()))?;

        let record = SummaryRecord::new(
            enrollment_id,
            ClusterScope::new(course_id, request.topic_id),
            request.text.clone(),
            encoded.keywords.clone(),
            encoded.polyline.clone(),
            summary_position,
        );
        let cluster = self.cluster_summary(&record).await;

        Ok(SummarySubmission {
            enrollment: outcome.enrollment,
            contribution_id,
            summary_id: record.id,
            summary_position,
            keywords: encoded.keywords,
            cluster_index: cluster.as_ref().map(|c| c.index),
            cluster_keywords: cluster.map(|c| c.keywords).unwrap_or_default(),
            unlocked: outcome.unlocked,
        })
    }

    async fn view_resource(
        &self,
        enrollment_id: EnrollmentId,
        resource_id: ResourceId,
    ) -> Result<ProgressOutcome, ProgressError> {
        let _guard = self.locks.lock(&enrollment_id).await;
        self.with_conflict_retry("view_resource", || self.apply_view(enrollment_id, resource_id))
            .await
    }

    async fn submit_quiz(&self, request: SubmitQuizRequest) -> Result<ProgressOutcome, ProgressError> {
        if request.questions.len() != request.considered.len() {
            return Err(ProgressError::InvalidInput(format!(
                "{} question polylines but {} mask entries",
                request.questions.len(),
                request.considered.len()
            )));
        }

        let considered: Vec<&Polyline> = request
            .questions
            .iter()
            .zip(&request.considered)
            .filter(|(_, counted)| **counted)
            .map(|(polyline, _)| polyline)
            .collect();

        let _guard = self.locks.lock(&request.enrollment_id).await;
        if considered.is_empty() {
            debug!(enrollment_id = %request.enrollment_id, "No quiz questions considered");
            return Ok(ProgressOutcome {
                enrollment: self.load_enrollment(request.enrollment_id).await?,
                contribution_id: None,
                unlocked: Vec::new(),
            });
        }

        let evidence = highline(considered.iter().copied())?;
        let content = format!("{} of {} questions considered", considered.len(), request.questions.len());
        self.with_conflict_retry("submit_quiz", || {
            self.apply_evidence(
                request.enrollment_id,
                &evidence,
                ContributionKind::QuizUpdate,
                &content,
                AdvanceCause::Quiz,
            )
        })
        .await
    }

    async fn revise_grade(&self, contribution_id: ContributionId, grade: f64) -> Result<GradeRevision, ProgressError> {
        if !grade.is_finite() || grade < 0.0 {
            return Err(ProgressError::InvalidInput(format!(
                "grade must be a non-negative number, got {}",
                grade
            )));
        }

        let enrollment_id = self
            .repositories
            .contributions
            .find_by_id(contribution_id)
            .await?
            .ok_or_else(|| ProgressError::NotFound(format!("contribution {}", contribution_id)))?
            .enrollment_id;

        let _guard = self.locks.lock(&enrollment_id).await;
        self.with_conflict_retry("revise_grade", || self.apply_grade(enrollment_id, contribution_id, grade))
            .await
    }

    async fn enrollment(&self, enrollment_id: EnrollmentId) -> Result<Enrollment, ProgressError> {
        self.load_enrollment(enrollment_id).await
    }

    async fn contributions(&self, enrollment_id: EnrollmentId) -> Result<Vec<Contribution>, ProgressError> {
        self.load_enrollment(enrollment_id).await?;
        Ok(self
            .repositories
            .contributions
            .find_by_enrollment(enrollment_id)
            .await?)
    }
}
