//! Configuration options for isosurface extraction.

use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Options controlling how an isosurface is generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsosurfaceOptions {
    /// Threshold the surface is drawn at.
    pub level: f32,

    /// Primitive type to emit.
    pub mode: SurfaceMode,

    /// Which traversal to use.
    pub strategy: ExtractionStrategy,

    /// Color attached to every emitted vertex.
    pub color: Vec4,

    /// Minimum number of cubes for [`ExtractionStrategy::Auto`] to use the octree.
    pub octree_min_cubes: usize,
}

impl Default for IsosurfaceOptions {
    fn default() -> Self {
        Self {
            level: 0.0,
            mode: SurfaceMode::Triangles,
            strategy: ExtractionStrategy::Auto,
            color: Vec4::new(0.047, 0.451, 0.690, 1.0),
            octree_min_cubes: 4096,
        }
    }
}

impl IsosurfaceOptions {
    /// Parses options from JSON. Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the options to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Primitive type of the extracted surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SurfaceMode {
    /// Filled triangles.
    #[default]
    Triangles,
    /// Contour segments on the cube faces ("chicken wire").
    Lines,
}

/// Traversal used to visit the cubes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExtractionStrategy {
    /// Octree for large manageable maps, plane sweep otherwise.
    #[default]
    Auto,
    /// Plane sweep over every cube.
    BruteForce,
    /// Octree-guided traversal; fails on maps the octree cannot index.
    Octree,
}
