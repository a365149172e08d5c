//! Regular scalar lattices and their extents.
//!
//! A [`ScalarField`] is the map an isosurface is extracted from: samples on an
//! integer lattice, an affine mapping from (fractional) lattice indices to world
//! space, and optionally periodic wrap-around (crystallographic maps).

use glam::{Affine3A, IVec3, UVec3, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{IsosurfaceError, Result};

/// One of the three lattice axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index of this axis (0, 1 or 2).
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Unit step along this axis.
    #[must_use]
    pub fn unit(self) -> IVec3 {
        match self {
            Axis::X => IVec3::X,
            Axis::Y => IVec3::Y,
            Axis::Z => IVec3::Z,
        }
    }
}

/// Inclusive box of lattice points.
///
/// An axis with `end < start` is empty, which makes the whole extent empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extent {
    pub start: IVec3,
    pub end: IVec3,
}

impl Extent {
    /// Creates an extent from inclusive corners.
    #[must_use]
    pub fn new(start: IVec3, end: IVec3) -> Self {
        Self { start, end }
    }

    /// Creates an extent of `size` points starting at the origin.
    #[must_use]
    pub fn from_size(size: UVec3) -> Self {
        Self {
            start: IVec3::ZERO,
            end: size.as_ivec3() - IVec3::ONE,
        }
    }

    /// Number of points along each axis.
    #[must_use]
    pub fn size(&self) -> UVec3 {
        (self.end - self.start + IVec3::ONE)
            .max(IVec3::ZERO)
            .as_uvec3()
    }

    /// Total number of points.
    #[must_use]
    pub fn num_points(&self) -> usize {
        let size = self.size();
        size.x as usize * size.y as usize * size.z as usize
    }

    /// Returns true if the extent holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end.cmplt(self.start).any()
    }

    /// Returns true if `point` lies inside the extent.
    #[must_use]
    pub fn contains(&self, point: IVec3) -> bool {
        point.cmpge(self.start).all() && point.cmple(self.end).all()
    }

    /// Wraps `point` into the extent, treating every axis as periodic.
    #[must_use]
    pub fn wrap(&self, point: IVec3) -> IVec3 {
        if self.is_empty() {
            return point;
        }
        let size = self.end - self.start + IVec3::ONE;
        let rel = point - self.start;
        self.start
            + IVec3::new(
                rel.x.rem_euclid(size.x),
                rel.y.rem_euclid(size.y),
                rel.z.rem_euclid(size.z),
            )
    }

    /// Iterates all points, x fastest, then y, then z.
    pub fn points(&self) -> impl Iterator<Item = IVec3> {
        let (start, end) = (self.start, self.end);
        (start.z..=end.z).flat_map(move |z| {
            (start.y..=end.y)
                .flat_map(move |y| (start.x..=end.x).map(move |x| IVec3::new(x, y, z)))
        })
    }
}

/// Whether a map holds real-space samples or structure factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MapDomain {
    /// Real-space density values.
    #[default]
    Spatial,
    /// Frequency-domain coefficients. Isosurfaces of these are meaningless.
    Frequency,
}

/// A regular 3D lattice of scalar samples.
pub trait ScalarField {
    /// Inclusive lattice extent of the stored samples.
    fn extent(&self) -> Extent;

    /// Sample at `point`, which must lie inside [`ScalarField::extent`].
    fn value(&self, point: IVec3) -> f32;

    /// Maps a fractional lattice index to world coordinates.
    fn fractional_index_to_coord(&self, index: Vec3) -> Vec3;

    /// Whether lookups outside the extent wrap around.
    fn is_periodic(&self) -> bool {
        false
    }

    /// Domain of the stored samples.
    fn domain(&self) -> MapDomain {
        MapDomain::Spatial
    }

    /// Number of samples along each axis.
    fn size(&self) -> UVec3 {
        self.extent().size()
    }

    /// Sample at `point`, wrapped into the extent when the field is periodic.
    fn wrapped_value(&self, point: IVec3) -> f32 {
        if self.is_periodic() {
            self.value(self.extent().wrap(point))
        } else {
            self.value(point)
        }
    }

    /// Extent of the marching cubes, addressed by their lowest corner.
    ///
    /// A periodic field has one cube per sample; the last cube on each axis
    /// reads its far corners through the wrap.
    fn cube_extent(&self) -> Extent {
        let extent = self.extent();
        if self.is_periodic() {
            extent
        } else {
            Extent::new(extent.start, extent.end - IVec3::ONE)
        }
    }
}

/// Dense in-memory [`ScalarField`].
///
/// Samples are stored x fastest: the value for point `p` lives at
/// `dx + dy * nx + dz * nx * ny` with `d = p - extent.start`.
#[derive(Debug, Clone)]
pub struct LatticeField {
    extent: Extent,
    values: Vec<f32>,
    transform: Affine3A,
    periodic: bool,
    domain: MapDomain,
}

impl LatticeField {
    /// Creates a field from samples laid out over `extent`.
    ///
    /// Returns an error if `values` does not hold exactly one sample per point.
    pub fn new(extent: Extent, values: Vec<f32>) -> Result<Self> {
        let expected = extent.num_points();
        if values.len() != expected {
            return Err(IsosurfaceError::SizeMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            extent,
            values,
            transform: Affine3A::IDENTITY,
            periodic: false,
            domain: MapDomain::Spatial,
        })
    }

    /// Creates a field by evaluating `f` at every lattice point.
    pub fn from_fn(extent: Extent, mut f: impl FnMut(IVec3) -> f32) -> Self {
        let values = extent.points().map(&mut f).collect();
        Self {
            extent,
            values,
            transform: Affine3A::IDENTITY,
            periodic: false,
            domain: MapDomain::Spatial,
        }
    }

    /// Creates a field with every sample set to `value`.
    #[must_use]
    pub fn filled(extent: Extent, value: f32) -> Self {
        Self::from_fn(extent, |_| value)
    }

    /// Sets the lattice-to-world transform.
    #[must_use]
    pub fn with_transform(mut self, transform: Affine3A) -> Self {
        self.transform = transform;
        self
    }

    /// Sets an axis-aligned transform: lattice index 0 maps to `origin`, one
    /// step along an axis moves by the matching component of `spacing`.
    #[must_use]
    pub fn with_spacing(self, origin: Vec3, spacing: Vec3) -> Self {
        self.with_transform(Affine3A::from_translation(origin) * Affine3A::from_scale(spacing))
    }

    /// Enables or disables periodic wrap-around.
    #[must_use]
    pub fn with_periodic(mut self, periodic: bool) -> Self {
        self.periodic = periodic;
        self
    }

    /// Sets the domain flag.
    #[must_use]
    pub fn with_domain(mut self, domain: MapDomain) -> Self {
        self.domain = domain;
        self
    }

    /// Returns the raw samples.
    #[must_use]
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Returns the lattice-to-world transform.
    #[must_use]
    pub fn transform(&self) -> Affine3A {
        self.transform
    }

    /// Overwrites the sample at `point`. Points outside the extent are ignored.
    pub fn set(&mut self, point: IVec3, value: f32) {
        if let Some(i) = self.index(point) {
            self.values[i] = value;
        }
    }

    /// Smallest and largest finite sample, or `None` if there is none.
    #[must_use]
    pub fn value_range(&self) -> Option<(f32, f32)> {
        let mut min = f32::MAX;
        let mut max = f32::MIN;
        for &v in &self.values {
            if v.is_finite() {
                min = min.min(v);
                max = max.max(v);
            }
        }
        (min <= max).then_some((min, max))
    }

    fn index(&self, point: IVec3) -> Option<usize> {
        if !self.extent.contains(point) {
            return None;
        }
        let size = self.extent.size();
        let d = (point - self.extent.start).as_uvec3();
        Some(
            d.x as usize
                + d.y as usize * size.x as usize
                + d.z as usize * size.x as usize * size.y as usize,
        )
    }
}

impl ScalarField for LatticeField {
    fn extent(&self) -> Extent {
        self.extent
    }

    fn value(&self, point: IVec3) -> f32 {
        self.index(point).map_or(0.0, |i| self.values[i])
    }

    fn fractional_index_to_coord(&self, index: Vec3) -> Vec3 {
        self.transform.transform_point3(index)
    }

    fn is_periodic(&self) -> bool {
        self.periodic
    }

    fn domain(&self) -> MapDomain {
        self.domain
    }
}
