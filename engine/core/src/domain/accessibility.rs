// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Accessibility Resolver
//!
//! Decides which resources a learner may open. Two rules are unioned:
//!
//! 1. **Proximity**: the `k` resources (default 7) whose beta-scaled polyline
//!    is closest to the learner's polyline. Ties go to the lower id.
//! 2. **Dominance**: every resource whose position is strictly behind the
//!    learner on both map axes.
//!
//! During ordinary progression the result is unioned into the prior set and
//! never shrinks. A grade revision is the one path that may shrink it: only
//! resources still dominated at the recomputed position survive, then the
//! proximity set of the new polyline is added back.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::domain::geometry::Position;
use crate::domain::polyline::{Polyline, PolylineError};
use crate::domain::resource::{ResourceId, ResourceProfile};

pub const DEFAULT_NEAREST_K: usize = 7;

/// The `k` resources nearest to `polyline` in polyline space.
pub fn nearest_resources(
    polyline: &Polyline,
    resources: &[ResourceProfile],
    k: usize,
) -> Result<Vec<ResourceId>, PolylineError> {
    let mut ranked = resources
        .iter()
        .map(|r| Ok((polyline.distance(&r.scaled_polyline())?, r.id)))
        .collect::<Result<Vec<(f64, ResourceId)>, PolylineError>>()?;

    ranked.sort_by(|a, b| {
        a.0.partial_cmp(&b.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.cmp(&b.1))
    });

    Ok(ranked.into_iter().take(k).map(|(_, id)| id).collect())
}

/// Resources strictly behind `position` on both axes.
pub fn dominated_resources(position: &Position, resources: &[ResourceProfile]) -> BTreeSet<ResourceId> {
    resources
        .iter()
        .filter(|r| r.position.is_dominated_by(position))
        .map(|r| r.id)
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct AccessibilityResolver {
    nearest_k: usize,
}

impl Default for AccessibilityResolver {
    fn default() -> Self {
        Self::new(DEFAULT_NEAREST_K)
    }
}

impl AccessibilityResolver {
    pub fn new(nearest_k: usize) -> Self {
        Self { nearest_k }
    }

    pub fn nearest_k(&self) -> usize {
        self.nearest_k
    }

    /// Proximity rule alone, used to seed a fresh enrollment.
    pub fn initial(
        &self,
        polyline: &Polyline,
        resources: &[ResourceProfile],
    ) -> Result<BTreeSet<ResourceId>, PolylineError> {
        Ok(nearest_resources(polyline, resources, self.nearest_k)?
            .into_iter()
            .collect())
    }

    /// `prior ∪ nearest ∪ dominated`. Never smaller than `prior`.
    pub fn progress(
        &self,
        prior: &BTreeSet<ResourceId>,
        polyline: &Polyline,
        position: &Position,
        resources: &[ResourceProfile],
    ) -> Result<BTreeSet<ResourceId>, PolylineError> {
        let mut accessible = prior.clone();
        accessible.extend(nearest_resources(polyline, resources, self.nearest_k)?);
        accessible.extend(dominated_resources(position, resources));
        Ok(accessible)
    }

    /// Grade-revision variant: add dominated resources, drop every id no
    /// longer dominated at `position`, then union the proximity set.
    pub fn revise(
        &self,
        prior: &BTreeSet<ResourceId>,
        polyline: &Polyline,
        position: &Position,
        resources: &[ResourceProfile],
    ) -> Result<BTreeSet<ResourceId>, PolylineError> {
        let dominated = dominated_resources(position, resources);
        let mut accessible: BTreeSet<ResourceId> = prior
            .union(&dominated)
            .filter(|id| dominated.contains(id))
            .copied()
            .collect();
        accessible.extend(nearest_resources(polyline, resources, self.nearest_k)?);
        Ok(accessible)
    }
}
