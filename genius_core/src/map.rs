//! Progress map types.
//!
//! A progress map relates a normalized file position (0.0..=1.0) to the
//! remaining print time in seconds at that position. Points serialize as
//! two-element JSON arrays `[position, value]` to stay compatible with
//! maps written by other tools.

use serde::{Deserialize, Serialize};

use crate::error::GeniusError;

/// One knot of a progress map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct ProgressPoint {
    pub position: f64,
    pub value: f64,
}

impl ProgressPoint {
    #[inline]
    pub const fn new(position: f64, value: f64) -> Self {
        Self { position, value }
    }
}

impl From<(f64, f64)> for ProgressPoint {
    fn from((position, value): (f64, f64)) -> Self {
        Self { position, value }
    }
}

impl From<ProgressPoint> for (f64, f64) {
    fn from(p: ProgressPoint) -> Self {
        (p.position, p.value)
    }
}

/// Ordered sequence of progress points, strictly increasing in position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressMap {
    points: Vec<ProgressPoint>,
}

impl ProgressMap {
    /// Wrap points without checking them. Use [`ProgressMap::validate`] on
    /// anything that came from outside the builder.
    pub fn from_points(points: Vec<ProgressPoint>) -> Self {
        Self { points }
    }

    /// Build a map from `(position, value)` pairs, rejecting malformed input.
    pub fn try_from_pairs(pairs: &[(f64, f64)]) -> Result<Self, GeniusError> {
        let map = Self::from_points(pairs.iter().copied().map(ProgressPoint::from).collect());
        map.validate()?;
        Ok(map)
    }

    pub fn points(&self) -> &[ProgressPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&ProgressPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&ProgressPoint> {
        self.points.last()
    }

    /// Check the structural invariants: non-empty, finite, strictly increasing positions.
    pub fn validate(&self) -> Result<(), GeniusError> {
        if self.points.is_empty() {
            return Err(GeniusError::MalformedMap("map has no points".into()));
        }
        for (i, p) in self.points.iter().enumerate() {
            if !p.position.is_finite() || !p.value.is_finite() {
                return Err(GeniusError::MalformedMap(format!(
                    "point {i} is not finite: ({}, {})",
                    p.position, p.value
                )));
            }
        }
        for (i, w) in self.points.windows(2).enumerate() {
            if w[1].position <= w[0].position {
                return Err(GeniusError::MalformedMap(format!(
                    "positions must strictly increase (index {} -> {}: {} -> {})",
                    i,
                    i + 1,
                    w[0].position,
                    w[1].position
                )));
            }
        }
        Ok(())
    }

    pub fn into_points(self) -> Vec<ProgressPoint> {
        self.points
    }
}

impl From<Vec<ProgressPoint>> for ProgressMap {
    fn from(points: Vec<ProgressPoint>) -> Self {
        Self::from_points(points)
    }
}
