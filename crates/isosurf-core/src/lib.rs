//! Core of isosurf.
//!
//! This crate provides the building blocks for extracting isosurfaces from
//! regular 3D scalar lattices:
//! - [`ScalarField`] trait and the dense [`LatticeField`]
//! - [`Octree`], a branch-on-need min/max octree used to skip empty regions
//! - [`CaseTable`], the 256-entry marching-cubes triangle and line table
//! - [`Extractor`], plane-sweep and octree-guided extraction into a [`VertexSink`]

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Lattice sizes are bounded far below u32::MAX
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]

pub mod case_table;
pub mod edge_cache;
pub mod error;
pub mod extract;
pub mod field;
pub mod interpolate;
pub mod octree;
pub mod options;
pub mod sink;

pub use case_table::{CaseLine, CaseTable};
pub use edge_cache::{EdgeKey, EdgeVertexCache, HashedEdgeCache, SweepEdgeCache};
pub use error::{IsosurfaceError, Result};
pub use extract::{ensure_spatial, ExtractionStats, Extractor};
pub use field::{Axis, Extent, LatticeField, MapDomain, ScalarField};
pub use interpolate::EdgeInterpolator;
pub use octree::{Octree, OctreeNode, OctreeVisitor, MAX_MANAGEABLE_SIZE, MAX_OCTREE_DEPTH};
pub use options::{ExtractionStrategy, IsosurfaceOptions, SurfaceMode};
pub use sink::{IndexedMesh, MeshVertex, VertexId, VertexSink};

// Re-export glam types for convenience
pub use glam::{Affine3A, IVec3, UVec3, Vec3, Vec4};
