//! Level crossings along cube edges.

use glam::{IVec3, Vec3};

use crate::field::{Axis, ScalarField};

/// Decides whether a cube edge crosses the level and where.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeInterpolator {
    level: f32,
}

impl EdgeInterpolator {
    /// Creates an interpolator for `level`.
    #[must_use]
    pub fn new(level: f32) -> Self {
        Self { level }
    }

    /// Returns the level.
    #[must_use]
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Returns true if exactly one endpoint lies below the level.
    ///
    /// An edge with both ends exactly on the level does not cross.
    #[inline]
    #[must_use]
    pub fn crosses(&self, v0: f32, v1: f32) -> bool {
        let level = self.level;
        (level > v0 && level <= v1) || (level > v1 && level <= v0)
    }

    /// Fraction of the way from `v0` to `v1` at which the level is reached,
    /// or `None` if the edge does not cross.
    #[inline]
    #[must_use]
    pub fn crossing_fraction(&self, v0: f32, v1: f32) -> Option<f32> {
        // crossing implies v0 != v1
        self.crosses(v0, v1)
            .then(|| (self.level - v0) / (v1 - v0))
    }

    /// World position of the crossing on the edge from lattice point `origin`
    /// one step along `axis`, or `None` if the edge does not cross.
    ///
    /// `v0` is the sample at `origin`, `v1` the sample at `origin + axis`.
    pub fn interpolate<F: ScalarField + ?Sized>(
        &self,
        field: &F,
        origin: IVec3,
        axis: Axis,
        v0: f32,
        v1: f32,
    ) -> Option<Vec3> {
        let t = self.crossing_fraction(v0, v1)?;
        let mut index = origin.as_vec3();
        index[axis.index()] += t;
        Some(field.fractional_index_to_coord(index))
    }
}
