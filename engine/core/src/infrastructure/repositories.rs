// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! In-memory adapters for the repository contracts in
//! `crate::domain::repository`. Thread-safe `HashMap` storage behind
//! `parking_lot` locks; used by tests, the CLI and embedders that keep state
//! elsewhere.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve domain aggregates
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::contribution::{Contribution, ContributionId};
use crate::domain::course::{sort_axis_order, CourseId, ModuleId, Topic, TopicId};
use crate::domain::enrollment::{Enrollment, EnrollmentId};
use crate::domain::repository::{
    ClusterRepository, ContributionRepository, ContributionWrite, EnrollmentRepository, ProgressStore,
    RepositoryError, ResourceRepository, SummaryRepository, TopicRepository,
};
use crate::domain::resource::{ResourceId, ResourceProfile};
use crate::domain::summary::{Cluster, ClusterScope, SummaryId, SummaryRecord};

#[derive(Clone, Default)]
pub struct InMemoryTopicRepository {
    topics: Arc<RwLock<HashMap<TopicId, Topic>>>,
}

impl InMemoryTopicRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TopicRepository for InMemoryTopicRepository {
    async fn save(&self, topic: &Topic) -> Result<(), RepositoryError> {
        self.topics.write().insert(topic.id, topic.clone());
        Ok(())
    }

    async fn find_by_course(&self, course_id: CourseId) -> Result<Vec<Topic>, RepositoryError> {
        let mut topics: Vec<Topic> = self
            .topics
            .read()
            .values()
            .filter(|t| t.course_id == course_id)
            .cloned()
            .collect();
        sort_axis_order(&mut topics);
        Ok(topics)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryResourceRepository {
    resources: Arc<RwLock<HashMap<ResourceId, ResourceProfile>>>,
}

impl InMemoryResourceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect<F>(&self, filter: F) -> Vec<ResourceProfile>
    where
        F: Fn(&ResourceProfile) -> bool,
    {
        let mut resources: Vec<ResourceProfile> =
            self.resources.read().values().filter(|r| filter(r)).cloned().collect();
        resources.sort_by_key(|r| r.id);
        resources
    }
}

#[async_trait]
impl ResourceRepository for InMemoryResourceRepository {
    async fn save(&self, resource: &ResourceProfile) -> Result<(), RepositoryError> {
        self.resources.write().insert(resource.id, resource.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ResourceId) -> Result<Option<ResourceProfile>, RepositoryError> {
        Ok(self.resources.read().get(&id).cloned())
    }

    async fn find_by_course(&self, course_id: CourseId) -> Result<Vec<ResourceProfile>, RepositoryError> {
        Ok(self.collect(|r| r.course_id == course_id))
    }

    async fn find_by_module(
        &self,
        course_id: CourseId,
        module_id: ModuleId,
    ) -> Result<Vec<ResourceProfile>, RepositoryError> {
        Ok(self.collect(|r| r.course_id == course_id && r.module_id == module_id))
    }
}

#[derive(Clone, Default)]
pub struct InMemoryEnrollmentRepository {
    enrollments: Arc<RwLock<HashMap<EnrollmentId, Enrollment>>>,
}

impl InMemoryEnrollmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_version(enrollments: &HashMap<EnrollmentId, Enrollment>, enrollment: &Enrollment) -> Result<(), RepositoryError> {
    let stored = enrollments
        .get(&enrollment.id)
        .ok_or_else(|| RepositoryError::NotFound(format!("enrollment {}", enrollment.id)))?;
    if stored.version != enrollment.version {
        return Err(RepositoryError::Conflict {
            entity: format!("enrollment {}", enrollment.id),
            expected: enrollment.version,
            actual: stored.version,
        });
    }
    Ok(())
}

fn store_next_version(enrollments: &mut HashMap<EnrollmentId, Enrollment>, enrollment: &Enrollment) -> u64 {
    let mut next = enrollment.clone();
    next.version += 1;
    let version = next.version;
    enrollments.insert(next.id, next);
    version
}

#[async_trait]
impl EnrollmentRepository for InMemoryEnrollmentRepository {
    async fn insert(&self, enrollment: &Enrollment) -> Result<(), RepositoryError> {
        let mut enrollments = self.enrollments.write();
        if enrollments.contains_key(&enrollment.id) {
            return Err(RepositoryError::Database(format!(
                "enrollment {} already exists",
                enrollment.id
            )));
        }
        enrollments.insert(enrollment.id, enrollment.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: EnrollmentId) -> Result<Option<Enrollment>, RepositoryError> {
        Ok(self.enrollments.read().get(&id).cloned())
    }

    async fn find_by_course(&self, course_id: CourseId) -> Result<Vec<Enrollment>, RepositoryError> {
        let mut enrollments: Vec<Enrollment> = self
            .enrollments
            .read()
            .values()
            .filter(|e| e.course_id == course_id)
            .cloned()
            .collect();
        enrollments.sort_by_key(|e| e.created_at);
        Ok(enrollments)
    }
}

#[derive(Clone, Default)]
pub struct InMemoryContributionRepository {
    contributions: Arc<RwLock<HashMap<ContributionId, Contribution>>>,
}

impl InMemoryContributionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The appended contribution must extend its chain by exactly one.
fn check_append(
    contributions: &HashMap<ContributionId, Contribution>,
    contribution: &Contribution,
) -> Result<(), RepositoryError> {
    let length = contributions
        .values()
        .filter(|c| c.enrollment_id == contribution.enrollment_id)
        .count() as u64;
    if contribution.sequence != length {
        return Err(RepositoryError::Conflict {
            entity: format!("contribution chain of enrollment {}", contribution.enrollment_id),
            expected: contribution.sequence,
            actual: length,
        });
    }
    Ok(())
}

fn check_rewrite(contributions: &HashMap<ContributionId, Contribution>, batch: &[Contribution]) -> Result<(), RepositoryError> {
    match batch.iter().find(|c| !contributions.contains_key(&c.id)) {
        Some(missing) => Err(RepositoryError::NotFound(format!("contribution {}", missing.id))),
        None => Ok(()),
    }
}

/// Commits enrollment updates and contribution writes as one unit over the
/// shared in-memory enrollment and contribution maps. Both write locks are
/// held for the whole commit, always enrollments first.
#[derive(Clone)]
pub struct InMemoryProgressStore {
    enrollments: InMemoryEnrollmentRepository,
    contributions: InMemoryContributionRepository,
}

impl InMemoryProgressStore {
    pub fn new(enrollments: &InMemoryEnrollmentRepository, contributions: &InMemoryContributionRepository) -> Self {
        Self {
            enrollments: enrollments.clone(),
            contributions: contributions.clone(),
        }
    }
}

#[async_trait]
impl ProgressStore for InMemoryProgressStore {
    async fn commit_progress(&self, enrollment: &Enrollment, write: ContributionWrite) -> Result<u64, RepositoryError> {
        let mut enrollments = self.enrollments.enrollments.write();
        let mut contributions = self.contributions.contributions.write();

        check_version(&enrollments, enrollment)?;
        match &write {
            ContributionWrite::None => {}
            ContributionWrite::Append(contribution) => check_append(&contributions, contribution)?,
            ContributionWrite::Rewrite(batch) => check_rewrite(&contributions, batch)?,
        }
        let foreign = match &write {
            ContributionWrite::None => None,
            ContributionWrite::Append(contribution) => Some(contribution).filter(|c| c.enrollment_id != enrollment.id),
            ContributionWrite::Rewrite(batch) => batch.iter().find(|c| c.enrollment_id != enrollment.id),
        };
        if let Some(contribution) = foreign {
            return Err(RepositoryError::Database(format!(
                "contribution {} belongs to enrollment {}, not {}",
                contribution.id, contribution.enrollment_id, enrollment.id
            )));
        }

        let version = store_next_version(&mut enrollments, enrollment);
        match write {
            ContributionWrite::None => {}
            ContributionWrite::Append(contribution) => {
                contributions.insert(contribution.id, contribution);
            }
            ContributionWrite::Rewrite(batch) => {
                for contribution in batch {
                    contributions.insert(contribution.id, contribution);
                }
            }
        }
        Ok(version)
    }
}

#[async_trait]
impl ContributionRepository for InMemoryContributionRepository {
    async fn find_by_id(&self, id: ContributionId) -> Result<Option<Contribution>, RepositoryError> {
        Ok(self.contributions.read().get(&id).cloned())
    }

    async fn find_by_enrollment(&self, enrollment_id: EnrollmentId) -> Result<Vec<Contribution>, RepositoryError> {
        let mut chain: Vec<Contribution> = self
            .contributions
            .read()
            .values()
            .filter(|c| c.enrollment_id == enrollment_id)
            .cloned()
            .collect();
        chain.sort_by_key(|c| c.sequence);
        Ok(chain)
    }
}

#[derive(Clone, Default)]
pub struct InMemorySummaryRepository {
    summaries: Arc<RwLock<Vec<SummaryRecord>>>,
}

impl InMemorySummaryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SummaryRepository for InMemorySummaryRepository {
    async fn save(&self, summary: &SummaryRecord) -> Result<(), RepositoryError> {
        let mut summaries = self.summaries.write();
        match summaries.iter_mut().find(|s| s.id == summary.id) {
            Some(existing) => *existing = summary.clone(),
            None => summaries.push(summary.clone()),
        }
        Ok(())
    }

    async fn find_by_scope(&self, scope: ClusterScope) -> Result<Vec<SummaryRecord>, RepositoryError> {
        Ok(self
            .summaries
            .read()
            .iter()
            .filter(|s| s.scope == scope)
            .cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryClusterRepository {
    clusters: Arc<RwLock<HashMap<ClusterScope, Vec<Cluster>>>>,
}

impl InMemoryClusterRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cluster holding `summary`, searched across all scopes.
    pub fn cluster_of(&self, summary: &SummaryId) -> Option<Cluster> {
        self.clusters
            .read()
            .values()
            .flatten()
            .find(|c| c.contains_summary(summary))
            .cloned()
    }
}

#[async_trait]
impl ClusterRepository for InMemoryClusterRepository {
    async fn replace_scope(&self, scope: ClusterScope, mut clusters: Vec<Cluster>) -> Result<(), RepositoryError> {
        clusters.sort_by_key(|c| c.index);
        self.clusters.write().insert(scope, clusters);
        Ok(())
    }

    async fn find_by_scope(&self, scope: ClusterScope) -> Result<Vec<Cluster>, RepositoryError> {
        Ok(self.clusters.read().get(&scope).cloned().unwrap_or_default())
    }
}
