// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Contribution Chain
//!
//! Every graded piece of evidence an enrollment receives is appended as a
//! [`Contribution`]. The chain is an ordered log: contribution `i` starts from
//! the polyline contribution `i - 1` produced, so the enrollment's polyline is
//! the fold
//!
//! ```text
//! running_0 = chain[0].prev_polyline
//! running_i = highline(running_{i-1}, chain[i].contributed * chain[i].grade)
//! ```
//!
//! Changing a grade invalidates the suffix starting at that contribution;
//! [`ContributionChain::replay_from`] recomputes it in order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::enrollment::EnrollmentId;
use crate::domain::geometry::{Position, RadialProjector};
use crate::domain::polyline::{highline, Polyline, PolylineError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContributionId(pub Uuid);

impl ContributionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContributionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContributionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContributionKind {
    Summary,
    QuizUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub id: ContributionId,
    pub enrollment_id: EnrollmentId,
    /// Position in the enrollment's chain, starting at 0.
    pub sequence: u64,
    pub kind: ContributionKind,
    pub content: String,
    pub prev_polyline: Polyline,
    /// Evidence as submitted, before grade weighting.
    pub contributed_polyline: Polyline,
    pub polyline: Polyline,
    pub position: Position,
    pub grade: f64,
    /// Set once a reviewer explicitly assigned a grade.
    pub is_graded: bool,
    pub submitted_at: DateTime<Utc>,
}

impl Contribution {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        enrollment_id: EnrollmentId,
        sequence: u64,
        kind: ContributionKind,
        content: impl Into<String>,
        prev_polyline: Polyline,
        contributed_polyline: Polyline,
        polyline: Polyline,
        position: Position,
        grade: f64,
    ) -> Self {
        Self {
            id: ContributionId::new(),
            enrollment_id,
            sequence,
            kind,
            content: content.into(),
            prev_polyline,
            contributed_polyline,
            polyline,
            position,
            grade,
            is_graded: false,
            submitted_at: Utc::now(),
        }
    }

    /// The graded evidence folded into the running polyline.
    pub fn weighted_polyline(&self) -> Polyline {
        self.contributed_polyline.scaled(self.grade)
    }
}

/// An enrollment's contributions in submission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContributionChain {
    items: Vec<Contribution>,
}

impl ContributionChain {
    /// Build a chain, ordering by sequence number.
    pub fn new(mut items: Vec<Contribution>) -> Self {
        items.sort_by_key(|c| c.sequence);
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Contribution] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Contribution> {
        self.items
    }

    pub fn next_sequence(&self) -> u64 {
        self.items.last().map_or(0, |c| c.sequence + 1)
    }

    pub fn index_of(&self, id: ContributionId) -> Option<usize> {
        self.items.iter().position(|c| c.id == id)
    }

    pub fn tail(&self) -> Option<&Contribution> {
        self.items.last()
    }

    pub fn set_grade(&mut self, index: usize, grade: f64) {
        if let Some(contribution) = self.items.get_mut(index) {
            contribution.grade = grade;
            contribution.is_graded = grade >= 0.0;
        }
    }

    /// Recompute contributions `index..` in chronological order, starting
    /// from `chain[index].prev_polyline`.
    ///
    /// Returns the recomputed suffix.
    pub fn replay_from(
        &mut self,
        index: usize,
        projector: &RadialProjector,
    ) -> Result<&[Contribution], PolylineError> {
        let Some(first) = self.items.get(index) else {
            return Ok(&[]);
        };
        let mut running = first.prev_polyline.clone();

        for contribution in self.items[index..].iter_mut() {
            let weighted = contribution.weighted_polyline();
            let polyline = highline([&running, &weighted])?;
            contribution.position = projector.project(&polyline)?;
            contribution.prev_polyline = running;
            contribution.polyline = polyline.clone();
            running = polyline;
        }

        Ok(&self.items[index..])
    }

    /// Fold the whole chain from its first `prev_polyline` without mutating
    /// it. `None` for an empty chain.
    pub fn fold(&self) -> Result<Option<Polyline>, PolylineError> {
        let Some(first) = self.items.first() else {
            return Ok(None);
        };
        let mut running = first.prev_polyline.clone();
        for contribution in &self.items {
            running = highline([&running, &contribution.weighted_polyline()])?;
        }
        Ok(Some(running))
    }
}
