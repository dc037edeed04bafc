// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::contribution::ContributionId;
use crate::domain::course::CourseId;
use crate::domain::enrollment::{EnrollmentId, LearnerId};
use crate::domain::geometry::Position;
use crate::domain::resource::ResourceId;
use crate::domain::summary::ClusterScope;

/// Progression events emitted after a state change has been persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProgressEvent {
    Enrolled {
        enrollment_id: EnrollmentId,
        learner_id: LearnerId,
        course_id: CourseId,
        position: Position,
        enrolled_at: DateTime<Utc>,
    },
    PositionAdvanced {
        enrollment_id: EnrollmentId,
        from: Position,
        to: Position,
        cause: AdvanceCause,
        advanced_at: DateTime<Utc>,
    },
    ResourcesUnlocked {
        enrollment_id: EnrollmentId,
        resource_ids: Vec<ResourceId>,
        unlocked_at: DateTime<Utc>,
    },
    GradeRevised {
        enrollment_id: EnrollmentId,
        contribution_id: ContributionId,
        grade: f64,
        replayed: usize,
        /// Resources that lost access in the dominance filter.
        revoked: Vec<ResourceId>,
        revised_at: DateTime<Utc>,
    },
    ClustersRecomputed {
        scope: ClusterScope,
        cluster_count: usize,
        summary_count: usize,
        recomputed_at: DateTime<Utc>,
    },
    TopicsBackfilled {
        course_id: CourseId,
        topic_count: usize,
        backfilled_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceCause {
    Summary,
    ResourceView,
    Quiz,
}

impl ProgressEvent {
    /// The enrollment an event concerns, if any.
    pub fn enrollment_id(&self) -> Option<EnrollmentId> {
        match self {
            ProgressEvent::Enrolled { enrollment_id, .. }
            | ProgressEvent::PositionAdvanced { enrollment_id, .. }
            | ProgressEvent::ResourcesUnlocked { enrollment_id, .. }
            | ProgressEvent::GradeRevised { enrollment_id, .. } => Some(*enrollment_id),
            ProgressEvent::ClustersRecomputed { .. } | ProgressEvent::TopicsBackfilled { .. } => None,
        }
    }
}
