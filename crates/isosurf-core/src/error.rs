//! Error types for isosurf.

use glam::UVec3;
use thiserror::Error;

/// The main error type for isosurface extraction.
#[derive(Error, Debug)]
pub enum IsosurfaceError {
    /// The map has an axis with 256 or more samples, which the octree cannot index.
    #[error("map of size {size} is too large for the octree (every axis must be < 256)")]
    MapTooLarge { size: UVec3 },

    /// The map holds frequency-domain data; isosurfaces need spatial data.
    #[error("map is not in the spatial domain")]
    NotSpatial,

    /// The octree is dirty or was built for a map with a different extent.
    #[error("octree is out of date for this map - rebuild it before extraction")]
    StaleOctree,

    /// Building the octree would need more levels than supported.
    #[error("octree depth {depth} exceeds the maximum of {max}")]
    OctreeTooDeep { depth: usize, max: usize },

    /// A child index does not fit the node's index field.
    #[error("octree child index {index} exceeds the maximum of {max}")]
    ChildIndexOverflow { index: usize, max: usize },

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for isosurface operations.
pub type Result<T> = std::result::Result<T, IsosurfaceError>;
