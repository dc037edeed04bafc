// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Enrollment Aggregate
//!
//! One learner's standing in one course: the cumulative [`Polyline`], the
//! [`Position`] it projects to, and the resources unlocked so far.
//!
//! # Invariants
//!
//! - `position` is always the projection of `polyline`; the two only change
//!   together through [`Enrollment::relocate`].
//! - `version` increments on every persisted mutation and is used by the
//!   repository for optimistic concurrency.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::course::CourseId;
use crate::domain::geometry::Position;
use crate::domain::polyline::Polyline;
use crate::domain::resource::ResourceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EnrollmentId(pub Uuid);

impl EnrollmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EnrollmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LearnerId(pub Uuid);

impl LearnerId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LearnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LearnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentState {
    /// Seeded from the first module, no evidence yet.
    Created,
    /// At least one progression event applied.
    Active,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub state: EnrollmentState,
    pub polyline: Polyline,
    pub position: Position,
    pub accessible_resources: BTreeSet<ResourceId>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn new(
        learner_id: LearnerId,
        course_id: CourseId,
        polyline: Polyline,
        position: Position,
        accessible_resources: BTreeSet<ResourceId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: EnrollmentId::new(),
            learner_id,
            course_id,
            state: EnrollmentState::Created,
            polyline,
            position,
            accessible_resources,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn num_axes(&self) -> usize {
        self.polyline.len()
    }

    /// Move to a new polyline and its projected position.
    pub fn relocate(&mut self, polyline: Polyline, position: Position) {
        self.polyline = polyline;
        self.position = position;
        self.state = EnrollmentState::Active;
        self.updated_at = Utc::now();
    }

    /// Replace the accessible set, returning ids that were newly added.
    pub fn set_accessible(&mut self, accessible: BTreeSet<ResourceId>) -> Vec<ResourceId> {
        let unlocked = accessible
            .difference(&self.accessible_resources)
            .copied()
            .collect();
        self.accessible_resources = accessible;
        unlocked
    }

    pub fn is_accessible(&self, resource_id: &ResourceId) -> bool {
        self.accessible_resources.contains(resource_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relocate_activates() {
        let mut enrollment = Enrollment::new(
            LearnerId::new(),
            CourseId::new(),
            Polyline::zeros(3).unwrap(),
            Position::default(),
            BTreeSet::new(),
        );
        assert_eq!(enrollment.state, EnrollmentState::Created);

        let polyline = Polyline::new(vec![0.2, 0.9, 0.1]).unwrap();
        enrollment.relocate(polyline.clone(), Position::new(0.3, 0.3));
        assert_eq!(enrollment.state, EnrollmentState::Active);
        assert_eq!(enrollment.polyline, polyline);
    }

    #[test]
    fn test_set_accessible_reports_new_ids() {
        let mut enrollment = Enrollment::new(
            LearnerId::new(),
            CourseId::new(),
            Polyline::zeros(2).unwrap(),
            Position::default(),
            BTreeSet::new(),
        );
        let a = ResourceId::new();
        let b = ResourceId::new();

        let unlocked = enrollment.set_accessible([a].into_iter().collect());
        assert_eq!(unlocked, vec![a]);

        let unlocked = enrollment.set_accessible([a, b].into_iter().collect());
        assert_eq!(unlocked, vec![b]);
        assert!(enrollment.is_accessible(&b));
    }
}
