// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Summary records and the clusters recomputed over them per (course, topic).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::course::{CourseId, TopicId};
use crate::domain::enrollment::EnrollmentId;
use crate::domain::geometry::Position;
use crate::domain::polyline::Polyline;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SummaryId(pub Uuid);

impl SummaryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SummaryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SummaryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The (course, topic) pair clusters are computed within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterScope {
    pub course_id: CourseId,
    pub topic_id: TopicId,
}

impl ClusterScope {
    pub fn new(course_id: CourseId, topic_id: TopicId) -> Self {
        Self { course_id, topic_id }
    }
}

impl std::fmt::Display for ClusterScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.course_id, self.topic_id)
    }
}

/// A submitted summary: the encoded polyline (not the enrollment's folded
/// one), its position and extracted keywords. `cluster_index` is assigned by
/// the latest recompute of its scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub id: SummaryId,
    pub enrollment_id: EnrollmentId,
    pub scope: ClusterScope,
    pub content: String,
    pub keywords: Vec<String>,
    pub polyline: Polyline,
    pub position: Position,
    #[serde(default)]
    pub cluster_index: Option<usize>,
    pub created_at: DateTime<Utc>,
}

impl SummaryRecord {
    pub fn new(
        enrollment_id: EnrollmentId,
        scope: ClusterScope,
        content: impl Into<String>,
        keywords: Vec<String>,
        polyline: Polyline,
        position: Position,
    ) -> Self {
        Self {
            id: SummaryId::new(),
            enrollment_id,
            scope,
            content: content.into(),
            keywords,
            polyline,
            position,
            cluster_index: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClusterId(pub Uuid);

impl ClusterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClusterId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: ClusterId,
    pub scope: ClusterScope,
    pub index: usize,
    /// Mean of member summary positions.
    pub centroid: Position,
    pub keywords: Vec<String>,
    pub summaries: Vec<SummaryId>,
    pub enrollments: BTreeSet<EnrollmentId>,
    pub computed_at: DateTime<Utc>,
}

impl Cluster {
    pub fn contains_summary(&self, id: &SummaryId) -> bool {
        self.summaries.contains(id)
    }
}
