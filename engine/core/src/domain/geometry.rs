// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Radial Geometry
//!
//! Maps an N-component [`Polyline`] onto the 2-D knowledge map.
//!
//! Topic axis `p` is a ray from the origin at angle `p * theta`, where
//! `theta = (π / (N - 1)) / 2`, so the N rays fan evenly across the first
//! quadrant. Each ray is as long as the distance to where it leaves the
//! bounding square; rays below the diagonal exit the right edge and the rays
//! above it mirror their lengths, keeping the fan symmetric.
//!
//! A polyline's position is the mean (not the sum) of its per-axis points,
//! which keeps every position inside the same square for any axis count.

use std::f64::consts::PI;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::domain::polyline::{Polyline, PolylineError};

/// A point on the knowledge map.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Strictly behind `other` on both axes.
    pub fn is_dominated_by(&self, other: &Position) -> bool {
        self.x < other.x && self.y < other.y
    }

    /// Arithmetic mean of `positions`, `None` when empty.
    pub fn mean<'a, I>(positions: I) -> Option<Position>
    where
        I: IntoIterator<Item = &'a Position>,
    {
        let (sum_x, sum_y, count) = positions
            .into_iter()
            .fold((0.0, 0.0, 0usize), |(sx, sy, n), p| (sx + p.x, sy + p.y, n + 1));
        if count == 0 {
            return None;
        }
        Some(Position::new(sum_x / count as f64, sum_y / count as f64))
    }
}

/// Per-axis ray lengths and the angular step for a given axis count.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisLayout {
    tlen: Vec<f64>,
    theta: f64,
}

impl AxisLayout {
    /// Layout inside the unit square.
    pub fn new(num_axes: usize) -> Result<Self, PolylineError> {
        Self::with_extent(num_axes, 1.0)
    }

    /// Layout inside a square of side `extent`.
    pub fn with_extent(num_axes: usize, extent: f64) -> Result<Self, PolylineError> {
        if num_axes < 2 {
            return Err(PolylineError::TooFewAxes(num_axes));
        }
        if !(extent.is_finite() && extent > 0.0) {
            return Err(PolylineError::InvalidExtent(extent));
        }

        let theta = (PI / (num_axes - 1) as f64) / 2.0;

        // Axis p sits on or below the diagonal iff 2p <= N - 1; with an odd
        // axis count the middle axis lies exactly on it.
        let last_below = (num_axes - 1) / 2;
        let mut tlen = Vec::with_capacity(num_axes);
        let mut mirrored = Vec::with_capacity(num_axes);
        for p in 0..=last_below {
            let rise = extent * (p as f64 * theta).tan();
            let length = (extent * extent + rise * rise).sqrt();
            tlen.push(length);
            if 2 * p != num_axes - 1 {
                mirrored.push(length);
            }
        }
        tlen.extend(mirrored.into_iter().rev());
        debug_assert_eq!(tlen.len(), num_axes);

        Ok(Self { tlen, theta })
    }

    pub fn num_axes(&self) -> usize {
        self.tlen.len()
    }

    pub fn tlen(&self) -> &[f64] {
        &self.tlen
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    /// Mean of the per-axis cartesian points of `polyline`.
    pub fn project(&self, polyline: &Polyline) -> Result<Position, PolylineError> {
        polyline.ensure_len(self.num_axes())?;
        let n = self.num_axes() as f64;
        let (sum_x, sum_y) = polyline
            .iter()
            .zip(self.tlen.iter())
            .enumerate()
            .fold((0.0, 0.0), |(sx, sy), (p, (value, length))| {
                let r = value * length;
                let angle = p as f64 * self.theta;
                (sx + r * angle.cos(), sy + r * angle.sin())
            });
        Ok(Position::new(sum_x / n, sum_y / n))
    }
}

/// Projects polylines to positions, caching one [`AxisLayout`] per axis count.
#[derive(Debug, Default, Clone)]
pub struct RadialProjector {
    layouts: Arc<DashMap<usize, Arc<AxisLayout>>>,
}

impl RadialProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(&self, num_axes: usize) -> Result<Arc<AxisLayout>, PolylineError> {
        if let Some(layout) = self.layouts.get(&num_axes) {
            return Ok(layout.clone());
        }
        let layout = Arc::new(AxisLayout::new(num_axes)?);
        self.layouts.insert(num_axes, layout.clone());
        Ok(layout)
    }

    pub fn project(&self, polyline: &Polyline) -> Result<Position, PolylineError> {
        self.layout(polyline.len())?.project(polyline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn p(values: &[f64]) -> Polyline {
        Polyline::new(values.to_vec()).unwrap()
    }

    #[test]
    fn test_layout_rejects_single_axis() {
        assert_eq!(AxisLayout::new(1), Err(PolylineError::TooFewAxes(1)));
        assert_eq!(AxisLayout::new(0), Err(PolylineError::TooFewAxes(0)));
    }

    #[test]
    fn test_layout_is_pure() {
        for n in 2..16 {
            assert_eq!(AxisLayout::new(n).unwrap(), AxisLayout::new(n).unwrap());
        }
    }

    #[test]
    fn test_layout_lengths_are_symmetric() {
        for n in 2..16 {
            let layout = AxisLayout::new(n).unwrap();
            assert_eq!(layout.tlen().len(), n);
            for p in 0..n {
                assert!((layout.tlen()[p] - layout.tlen()[n - 1 - p]).abs() < EPS);
            }
            assert!((layout.tlen()[0] - 1.0).abs() < EPS);
        }
    }

    #[test]
    fn test_three_axis_layout() {
        let layout = AxisLayout::new(3).unwrap();
        assert!((layout.theta() - PI / 4.0).abs() < EPS);
        assert!((layout.tlen()[1] - 2f64.sqrt()).abs() < EPS);
    }

    #[test]
    fn test_all_ones_projects_to_mean_of_ray_endpoints() {
        let pos = AxisLayout::new(2).unwrap().project(&p(&[1.0, 1.0])).unwrap();
        assert!((pos.x - 0.5).abs() < EPS);
        assert!((pos.y - 0.5).abs() < EPS);

        let pos = AxisLayout::new(3).unwrap().project(&p(&[1.0, 1.0, 1.0])).unwrap();
        assert!((pos.x - 2.0 / 3.0).abs() < EPS);
        assert!((pos.y - 2.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn test_three_axis_example_projection() {
        let pos = AxisLayout::new(3).unwrap().project(&p(&[0.2, 0.9, 0.1])).unwrap();
        assert!((pos.x - 1.1 / 3.0).abs() < EPS);
        assert!((pos.y - 1.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn test_projection_length_mismatch() {
        let layout = AxisLayout::new(4).unwrap();
        assert!(matches!(
            layout.project(&p(&[0.1, 0.2])),
            Err(PolylineError::LengthMismatch { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn test_projector_caches_layouts() {
        let projector = RadialProjector::new();
        let a = projector.layout(12).unwrap();
        let b = projector.layout(12).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(projector.project(&p(&[0.5])).is_err());
    }

    #[test]
    fn test_position_helpers() {
        let behind = Position::new(0.1, 0.1);
        let ahead = Position::new(0.2, 0.3);
        assert!(behind.is_dominated_by(&ahead));
        assert!(!ahead.is_dominated_by(&behind));
        assert!(!Position::new(0.1, 0.3).is_dominated_by(&ahead));

        let mean = Position::mean([&behind, &ahead]).unwrap();
        assert!((mean.x - 0.15).abs() < EPS && (mean.y - 0.2).abs() < EPS);
        assert!(Position::mean(std::iter::empty::<&Position>()).is_none());
    }
}
