// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Polyline Value Object
//!
//! A [`Polyline`] is the fixed-shape topic-alignment vector every map entity
//! carries: component `p` is the degree of alignment with topic axis `p` of
//! the owning course. Its length is tied to the course's topic count and is
//! checked at every operation that combines two polylines.
//!
//! Aggregation primitives:
//!
//! | Operation | Meaning | Used by |
//! |-----------|---------|---------|
//! | [`highline`] | component-wise max | summary, quiz and replay folding |
//! | [`lowline`] | component-wise min | enrollment seeding |
//! | [`Polyline::beta_scaled`] | variance exaggeration around the mean | resource profiles, summary encoding |
//! | [`Polyline::nudged`] | linear `self + factor * other` | resource views |

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by polyline construction and combination.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolylineError {
    #[error("Polyline must have at least one component")]
    Empty,

    #[error("Polyline component {index} is not finite")]
    NonFinite { index: usize },

    #[error("Polyline length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Cannot aggregate an empty list of polylines")]
    EmptyAggregation,

    #[error("Axis layout needs at least 2 axes, got {0}")]
    TooFewAxes(usize),

    #[error("Axis extent must be positive and finite, got {0}")]
    InvalidExtent(f64),
}

/// Ordered topic-alignment scores, one per course topic axis.
///
/// # Invariants
///
/// - Never empty.
/// - Every component is finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Polyline(Vec<f64>);

impl Polyline {
    pub fn new(values: Vec<f64>) -> Result<Self, PolylineError> {
        if values.is_empty() {
            return Err(PolylineError::Empty);
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(PolylineError::NonFinite { index });
        }
        Ok(Self(values))
    }

    /// All-zero polyline of the given length.
    pub fn zeros(len: usize) -> Result<Self, PolylineError> {
        Self::new(vec![0.0; len])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.0.iter()
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }

    /// Fail unless this polyline has exactly `expected` components.
    pub fn ensure_len(&self, expected: usize) -> Result<(), PolylineError> {
        if self.len() != expected {
            return Err(PolylineError::LengthMismatch {
                expected,
                actual: self.len(),
            });
        }
        Ok(())
    }

    pub fn mean(&self) -> f64 {
        self.0.iter().sum::<f64>() / self.0.len() as f64
    }

    /// Beta scaling: `clamp(v + beta * (v - mean), 0, 1)` per component.
    ///
    /// A steep beta pushes the profile towards a near-binary shape; a negative
    /// beta flattens it towards the mean.
    pub fn beta_scaled(&self, beta: f64) -> Polyline {
        let mean = self.mean();
        Polyline(
            self.0
                .iter()
                .map(|v| (v + beta * (v - mean)).clamp(0.0, 1.0))
                .collect(),
        )
    }

    /// Multiply every component by `factor` (grade weighting).
    pub fn scaled(&self, factor: f64) -> Polyline {
        Polyline(self.0.iter().map(|v| v * factor).collect())
    }

    /// Linear perturbation `self + factor * other`. Not clamped.
    pub fn nudged(&self, other: &Polyline, factor: f64) -> Result<Polyline, PolylineError> {
        other.ensure_len(self.len())?;
        Ok(Polyline(
            self.0
                .iter()
                .zip(other.0.iter())
                .map(|(a, b)| a + factor * b)
                .collect(),
        ))
    }

    /// Euclidean distance in polyline space.
    pub fn distance(&self, other: &Polyline) -> Result<f64, PolylineError> {
        other.ensure_len(self.len())?;
        Ok(self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt())
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.0)
    }
}

impl TryFrom<Vec<f64>> for Polyline {
    type Error = PolylineError;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<Polyline> for Vec<f64> {
    fn from(polyline: Polyline) -> Self {
        polyline.0
    }
}

impl AsRef<[f64]> for Polyline {
    fn as_ref(&self) -> &[f64] {
        &self.0
    }
}

fn combine<'a, I, F>(polylines: I, pick: F) -> Result<Polyline, PolylineError>
where
    I: IntoIterator<Item = &'a Polyline>,
    F: Fn(f64, f64) -> f64,
{
    let mut iter = polylines.into_iter();
    let first = iter.next().ok_or(PolylineError::EmptyAggregation)?;
    let mut acc = first.0.clone();
    for polyline in iter {
        polyline.ensure_len(acc.len())?;
        for (slot, value) in acc.iter_mut().zip(polyline.0.iter()) {
            *slot = pick(*slot, *value);
        }
    }
    Ok(Polyline(acc))
}

/// Component-wise maximum across `polylines`.
pub fn highline<'a, I>(polylines: I) -> Result<Polyline, PolylineError>
where
    I: IntoIterator<Item = &'a Polyline>,
{
    combine(polylines, f64::max)
}

/// Component-wise minimum across `polylines`.
pub fn lowline<'a, I>(polylines: I) -> Result<Polyline, PolylineError>
where
    I: IntoIterator<Item = &'a Polyline>,
{
    combine(polylines, f64::min)
}

/// Component-wise arithmetic mean across `polylines`.
pub fn mean_polyline<'a, I>(polylines: I) -> Result<Polyline, PolylineError>
where
    I: IntoIterator<Item = &'a Polyline>,
{
    let mut count = 0usize;
    let sum = combine(
        polylines.into_iter().inspect(|_| count += 1),
        |a, b| a + b,
    )?;
    Ok(sum.scaled(1.0 / count as f64))
}
