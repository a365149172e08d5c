//! isosurf: octree-accelerated isosurfaces of 3D scalar maps.
//!
//! Given a regular lattice of samples (an electron density map, a signed
//! distance field, ...) and a threshold, isosurf extracts the surface where
//! the field crosses the threshold as an indexed triangle mesh or as a
//! "chicken wire" of contour lines.
//!
//! # Quick Start
//!
//! ```
//! use isosurf::*;
//!
//! fn main() -> Result<()> {
//!     let extent = Extent::from_size(UVec3::splat(16));
//!     let field = LatticeField::from_fn(extent, |p| {
//!         (p.as_vec3() - Vec3::splat(7.5)).length() - 5.0
//!     });
//!
//!     let mut surface = MapIsosurface::new(field);
//!     surface.set_level(0.0);
//!     let mesh = surface.update()?;
//!     assert!(mesh.num_triangles() > 0);
//!     Ok(())
//! }
//! ```
//!
//! # Extraction
//!
//! - [`Extractor::generate`] visits every cube in a plane sweep
//! - [`Extractor::visit_df`] walks a min/max [`Octree`] and skips every
//!   subtree whose value range cannot contain the level
//!
//! Both produce the same primitives. [`MapIsosurface`] picks one according
//! to [`IsosurfaceOptions::strategy`] and caches the result.

mod map_isosurface;

pub use isosurf_core::{
    case_table::{CaseLine, CaseTable},
    edge_cache::{EdgeKey, EdgeVertexCache, HashedEdgeCache, SweepEdgeCache},
    error::{IsosurfaceError, Result},
    extract::{ensure_spatial, ExtractionStats, Extractor},
    field::{Axis, Extent, LatticeField, MapDomain, ScalarField},
    interpolate::EdgeInterpolator,
    octree::{Octree, OctreeNode, OctreeVisitor, MAX_MANAGEABLE_SIZE, MAX_OCTREE_DEPTH},
    options::{ExtractionStrategy, IsosurfaceOptions, SurfaceMode},
    sink::{IndexedMesh, MeshVertex, VertexId, VertexSink},
    Affine3A, IVec3, UVec3, Vec3, Vec4,
};

pub use map_isosurface::MapIsosurface;

/// Extracts the isosurface of `field` at `level` into a new mesh.
///
/// Uses the plane sweep and computes vertex normals.
///
/// # Errors
///
/// Returns [`IsosurfaceError::NotSpatial`] for frequency-domain maps.
pub fn extract_isosurface<F: ScalarField + ?Sized>(field: &F, level: f32) -> Result<IndexedMesh> {
    let mut mesh = IndexedMesh::new();
    Extractor::new().generate(field, &mut mesh, level)?;
    mesh.compute_normals();
    Ok(mesh)
}
