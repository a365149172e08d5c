//! A map paired with its cached isosurface.

use isosurf_core::{
    ensure_spatial, ExtractionStats, ExtractionStrategy, Extractor, IndexedMesh,
    IsosurfaceError, IsosurfaceOptions, Octree, Result, ScalarField, SurfaceMode, VertexSink,
};

use glam::Vec4;

/// Owns a scalar map, its octree and the mesh extracted from it.
///
/// Setters only flag the surface for regeneration; [`MapIsosurface::update`]
/// does the work, and only when something changed.
pub struct MapIsosurface<F: ScalarField> {
    field: F,
    octree: Octree,
    mesh: IndexedMesh,
    options: IsosurfaceOptions,
    stats: Option<ExtractionStats>,
    dirty: bool,
}

impl<F: ScalarField> MapIsosurface<F> {
    /// Creates an isosurface of `field` with default options.
    pub fn new(field: F) -> Self {
        Self::with_options(field, IsosurfaceOptions::default())
    }

    /// Creates an isosurface of `field` with the given options.
    pub fn with_options(field: F, options: IsosurfaceOptions) -> Self {
        Self {
            field,
            octree: Octree::new(),
            mesh: IndexedMesh::new(),
            options,
            stats: None,
            dirty: true,
        }
    }

    /// Returns the map.
    pub fn field(&self) -> &F {
        &self.field
    }

    /// Mutable access to the map. The octree is assumed stale afterwards.
    pub fn field_mut(&mut self) -> &mut F {
        self.make_octree_dirty();
        &mut self.field
    }

    /// Returns the octree, which may be dirty if no update used it yet.
    pub fn octree(&self) -> &Octree {
        &self.octree
    }

    /// Returns the extraction options.
    pub fn options(&self) -> &IsosurfaceOptions {
        &self.options
    }

    /// The mesh from the last successful [`MapIsosurface::update`].
    pub fn mesh(&self) -> &IndexedMesh {
        &self.mesh
    }

    /// Statistics of the last successful extraction.
    pub fn last_stats(&self) -> Option<ExtractionStats> {
        self.stats
    }

    /// Returns true if the next [`MapIsosurface::update`] will re-extract.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replaces the map. The octree is rebuilt on the next update.
    pub fn set_new_map(&mut self, field: F) -> &mut Self {
        self.field = field;
        self.make_octree_dirty()
    }

    /// Flags the octree for rebuild, e.g. after the map's samples changed.
    pub fn make_octree_dirty(&mut self) -> &mut Self {
        self.octree.make_dirty();
        self.dirty = true;
        self
    }

    /// Gets the isosurface level.
    pub fn level(&self) -> f32 {
        self.options.level
    }

    /// Sets the isosurface level (invalidates the mesh).
    pub fn set_level(&mut self, level: f32) -> &mut Self {
        self.options.level = level;
        self.dirty = true;
        self
    }

    /// Sets the primitive type (invalidates the mesh).
    pub fn set_mode(&mut self, mode: SurfaceMode) -> &mut Self {
        self.options.mode = mode;
        self.dirty = true;
        self
    }

    /// Sets the vertex color (invalidates the mesh).
    pub fn set_color(&mut self, color: Vec4) -> &mut Self {
        self.options.color = color;
        self.dirty = true;
        self
    }

    /// Sets the traversal strategy (invalidates the mesh).
    pub fn set_strategy(&mut self, strategy: ExtractionStrategy) -> &mut Self {
        self.options.strategy = strategy;
        self.dirty = true;
        self
    }

    /// Replaces all options at once.
    pub fn set_options(&mut self, options: IsosurfaceOptions) -> &mut Self {
        self.options = options;
        self.dirty = true;
        self
    }

    /// Regenerates the mesh if anything changed since the last update.
    ///
    /// On error the mesh is cleared and the surface stays dirty.
    pub fn update(&mut self) -> Result<&IndexedMesh> {
        if !self.dirty {
            return Ok(&self.mesh);
        }
        match self.extract() {
            Ok(stats) => {
                self.mesh.compute_normals();
                self.stats = Some(stats);
                self.dirty = false;
                Ok(&self.mesh)
            }
            Err(err) => {
                self.mesh.clear();
                self.stats = None;
                Err(err)
            }
        }
    }

    fn extract(&mut self) -> Result<ExtractionStats> {
        ensure_spatial(&self.field)?;
        let extractor = Extractor::from_options(&self.options);
        let level = self.options.level;
        if self.use_octree()? {
            self.octree.initialize(&self.field)?;
            extractor.visit_df(&self.field, &mut self.mesh, level, &self.octree)
        } else {
            extractor.generate(&self.field, &mut self.mesh, level)
        }
    }

    fn use_octree(&self) -> Result<bool> {
        let manageable = Octree::is_map_manageable(&self.field);
        match self.options.strategy {
            ExtractionStrategy::BruteForce => Ok(false),
            ExtractionStrategy::Octree if manageable => Ok(true),
            ExtractionStrategy::Octree => Err(IsosurfaceError::MapTooLarge {
                size: self.field.size(),
            }),
            ExtractionStrategy::Auto if !manageable => {
                log::warn!(
                    "map of size {} is too large for the octree, using plane sweep",
                    self.field.size()
                );
                Ok(false)
            }
            ExtractionStrategy::Auto => {
                Ok(self.field.cube_extent().num_points() >= self.options.octree_min_cubes)
            }
        }
    }
}
