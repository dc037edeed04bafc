// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts for each aggregate, defined in the domain layer and
//! implemented in `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `TopicRepository` | `Topic` | `InMemoryTopicRepository` |
//! | `ResourceRepository` | `ResourceProfile` | `InMemoryResourceRepository` |
//! | `EnrollmentRepository` | `Enrollment` | `InMemoryEnrollmentRepository` |
//! | `ContributionRepository` | `Contribution` | `InMemoryContributionRepository` |
//! | `SummaryRepository` | `SummaryRecord` | `InMemorySummaryRepository` |
//! | `ClusterRepository` | `Cluster` | `InMemoryClusterRepository` |
//! | `ProgressStore` | `Enrollment` + `Contribution` chain | `InMemoryProgressStore` |
//!
//! The relational store behind a deployment is an external collaborator; any
//! adapter only has to honour these contracts. In particular
//! [`ProgressStore::commit_progress`] must write the enrollment and its
//! contributions in one transaction, and reject a stale enrollment version or
//! a taken chain sequence with [`RepositoryError::Conflict`] so concurrent
//! writers re-read and retry.

use async_trait::async_trait;

use crate::domain::contribution::{Contribution, ContributionId};
use crate::domain::course::{CourseId, ModuleId, Topic};
use crate::domain::enrollment::{Enrollment, EnrollmentId};
use crate::domain::resource::{ResourceId, ResourceProfile};
use crate::domain::summary::{Cluster, ClusterScope, SummaryRecord};

#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// Save topic (create or update)
    async fn save(&self, topic: &Topic) -> Result<(), RepositoryError>;

    /// Topics of a course in axis order (ordinal, then id).
    async fn find_by_course(&self, course_id: CourseId) -> Result<Vec<Topic>, RepositoryError>;
}

#[async_trait]
pub trait ResourceRepository: Send + Sync {
    async fn save(&self, resource: &ResourceProfile) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: ResourceId) -> Result<Option<ResourceProfile>, RepositoryError>;

    /// All resources of a course, ordered by id.
    async fn find_by_course(&self, course_id: CourseId) -> Result<Vec<ResourceProfile>, RepositoryError>;

    async fn find_by_module(
        &self,
        course_id: CourseId,
        module_id: ModuleId,
    ) -> Result<Vec<ResourceProfile>, RepositoryError>;
}

#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// Persist a new enrollment at version 0. Later updates go through
    /// [`ProgressStore::commit_progress`].
    async fn insert(&self, enrollment: &Enrollment) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: EnrollmentId) -> Result<Option<Enrollment>, RepositoryError>;

    async fn find_by_course(&self, course_id: CourseId) -> Result<Vec<Enrollment>, RepositoryError>;
}

/// Read side of the contribution chain; writes go through
/// [`ProgressStore::commit_progress`] with the owning enrollment.
#[async_trait]
pub trait ContributionRepository: Send + Sync {
    async fn find_by_id(&self, id: ContributionId) -> Result<Option<Contribution>, RepositoryError>;

    /// The enrollment's chain in submission order.
    async fn find_by_enrollment(&self, enrollment_id: EnrollmentId) -> Result<Vec<Contribution>, RepositoryError>;
}

/// Contribution changes that accompany an enrollment update.
#[derive(Debug, Clone, PartialEq)]
pub enum ContributionWrite {
    None,
    /// New tail of the chain; its `sequence` must be the chain length.
    Append(Contribution),
    /// Replayed suffix; every contribution must already exist.
    Rewrite(Vec<Contribution>),
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Replace the stored enrollment if its version still equals
    /// `enrollment.version` and apply `write` with it. Either both land or
    /// nothing does. Returns the new enrollment version.
    async fn commit_progress(&self, enrollment: &Enrollment, write: ContributionWrite) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait SummaryRepository: Send + Sync {
    async fn save(&self, summary: &SummaryRecord) -> Result<(), RepositoryError>;

    /// Summaries of a scope in submission order.
    async fn find_by_scope(&self, scope: ClusterScope) -> Result<Vec<SummaryRecord>, RepositoryError>;
}

#[async_trait]
pub trait ClusterRepository: Send + Sync {
    /// Delete every cluster of `scope` and insert `clusters` in its place.
    async fn replace_scope(&self, scope: ClusterScope, clusters: Vec<Cluster>) -> Result<(), RepositoryError>;

    /// Clusters of a scope ordered by index.
    async fn find_by_scope(&self, scope: ClusterScope) -> Result<Vec<Cluster>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Version conflict on {entity}: expected {expected}, found {actual}")]
    Conflict {
        entity: String,
        expected: u64,
        actual: u64,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
