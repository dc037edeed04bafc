// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Resource profiles: a learning resource's topic polyline, its beta knob
//! and its fixed position on the map.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::course::{CourseId, ModuleId};
use crate::domain::geometry::{Position, RadialProjector};
use crate::domain::polyline::{Polyline, PolylineError};

/// Betas tried when fitting a resource to a requested map position.
pub const BETA_SEARCH_RANGE: std::ops::Range<u32> = 0..50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub Uuid);

impl ResourceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceProfile {
    pub id: ResourceId,
    pub course_id: CourseId,
    pub module_id: ModuleId,
    pub name: String,
    /// Unscaled similarity-to-topics polyline.
    pub polyline: Polyline,
    pub beta: f64,
    pub position: Position,
}

impl ResourceProfile {
    /// Build a profile whose position is the projection of its beta-scaled
    /// polyline.
    pub fn new(
        course_id: CourseId,
        module_id: ModuleId,
        name: impl Into<String>,
        polyline: Polyline,
        beta: f64,
        projector: &RadialProjector,
    ) -> Result<Self, PolylineError> {
        let position = projector.project(&polyline.beta_scaled(beta))?;
        Ok(Self {
            id: ResourceId::new(),
            course_id,
            module_id,
            name: name.into(),
            polyline,
            beta,
            position,
        })
    }

    /// The polyline every accessibility and seeding rule compares against.
    pub fn scaled_polyline(&self) -> Polyline {
        self.polyline.beta_scaled(self.beta)
    }

    /// Integer beta in [`BETA_SEARCH_RANGE`] whose projected position lies
    /// closest to `target`. Earlier betas win ties.
    pub fn fit_beta(
        &self,
        target: &Position,
        projector: &RadialProjector,
    ) -> Result<(f64, Position), PolylineError> {
        let mut best: Option<(f64, Position, f64)> = None;
        for beta in BETA_SEARCH_RANGE {
            let beta = beta as f64;
            let candidate = projector.project(&self.polyline.beta_scaled(beta))?;
            let distance = candidate.distance(target);
            if best.map_or(true, |(_, _, d)| distance < d) {
                best = Some((beta, candidate, distance));
            }
        }
        let (beta, position, _) = best.ok_or(PolylineError::EmptyAggregation)?;
        Ok((beta, position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(values: &[f64], beta: f64) -> ResourceProfile {
        ResourceProfile::new(
            CourseId::new(),
            ModuleId::FIRST,
            "Intro",
            Polyline::new(values.to_vec()).unwrap(),
            beta,
            &RadialProjector::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_position_uses_scaled_polyline() {
        let projector = RadialProjector::new();
        let resource = profile(&[0.2, 0.5, 0.8], 1.0);
        let expected = projector.project(&resource.scaled_polyline()).unwrap();
        assert_eq!(resource.position, expected);
        assert_eq!(resource.scaled_polyline().as_slice(), &[0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_fit_beta_recovers_known_beta() {
        let projector = RadialProjector::new();
        let resource = profile(&[0.3, 0.5, 0.9, 0.4], 0.0);
        let target = projector.project(&resource.polyline.beta_scaled(3.0)).unwrap();

        let (beta, position) = resource.fit_beta(&target, &projector).unwrap();
        assert_eq!(beta, 3.0);
        assert!(position.distance(&target) < 1e-12);
    }
}
