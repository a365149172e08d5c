//! Isosurface extraction over a scalar field.
//!
//! [`Extractor::generate`] sweeps every cube in raster order and shares edge
//! vertices through a [`SweepEdgeCache`]. [`Extractor::visit_df`] walks a
//! min/max [`Octree`], skipping subtrees that cannot contain the level, and
//! shares edge vertices through a [`HashedEdgeCache`]. Both emit the same
//! primitives per cube; only the visiting order differs.

use glam::{IVec3, UVec3, Vec3, Vec4};

use crate::case_table::{corner_pattern, edge_axis, CaseTable, CORNER_OFFSETS, EDGE_CORNERS};
use crate::edge_cache::{EdgeKey, EdgeVertexCache, HashedEdgeCache, SweepEdgeCache};
use crate::error::{IsosurfaceError, Result};
use crate::field::{Extent, MapDomain, ScalarField};
use crate::interpolate::EdgeInterpolator;
use crate::octree::{Octree, OctreeNode, OctreeVisitor};
use crate::options::{IsosurfaceOptions, SurfaceMode};
use crate::sink::{VertexId, VertexSink};

/// Counters describing one extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Cubes whose corners were classified.
    pub cubes: usize,
    /// Vertices added to the sink.
    pub vertices: usize,
    /// Triangles added to the sink.
    pub triangles: usize,
    /// Line segments added to the sink.
    pub lines: usize,
    /// Distinct edges resolved through the edge cache.
    pub edges: usize,
}

/// Fails with [`IsosurfaceError::NotSpatial`] unless `field` holds real-space data.
pub fn ensure_spatial<F: ScalarField + ?Sized>(field: &F) -> Result<()> {
    match field.domain() {
        MapDomain::Spatial => Ok(()),
        MapDomain::Frequency => Err(IsosurfaceError::NotSpatial),
    }
}

/// Marching-cubes extractor. Cheap to copy; the case table is shared.
#[derive(Debug, Clone, Copy)]
pub struct Extractor {
    table: &'static CaseTable,
    mode: SurfaceMode,
    color: Vec4,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    /// Creates a triangle extractor emitting white vertices.
    pub fn new() -> Self {
        Self {
            table: CaseTable::shared(),
            mode: SurfaceMode::Triangles,
            color: Vec4::ONE,
        }
    }

    /// Creates an extractor using the mode and color of `options`.
    pub fn from_options(options: &IsosurfaceOptions) -> Self {
        Self::new().with_mode(options.mode).with_color(options.color)
    }

    /// Sets the primitive type.
    #[must_use]
    pub fn with_mode(mut self, mode: SurfaceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets the vertex color.
    #[must_use]
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    /// Returns the primitive type.
    pub fn mode(&self) -> SurfaceMode {
        self.mode
    }

    /// Returns the vertex color.
    pub fn color(&self) -> Vec4 {
        self.color
    }

    /// Extracts the isosurface at `level` by visiting every cube once.
    ///
    /// The sink is cleared first. On error the sink is left untouched.
    ///
    /// # Errors
    ///
    /// [`IsosurfaceError::NotSpatial`] for frequency-domain maps.
    pub fn generate<F, S>(&self, field: &F, sink: &mut S, level: f32) -> Result<ExtractionStats>
    where
        F: ScalarField + ?Sized,
        S: VertexSink + ?Sized,
    {
        ensure_spatial(field)?;
        sink.clear();

        let cubes = field.cube_extent();
        let mut marcher = CubeMarcher::new(self, field, sink, level, cubes);
        if !cubes.is_empty() {
            let count = cubes.size();
            let mut cache = SweepEdgeCache::new(count);
            for z in 0..count.z {
                for y in 0..count.y {
                    for x in 0..count.x {
                        marcher.march(&mut cache, UVec3::new(x, y, z));
                    }
                    cache.next_row();
                }
                cache.next_plane();
            }
            marcher.stats.edges = cache.resolved();
        }

        let stats = marcher.stats;
        log::debug!("plane sweep at level {level}: {stats:?}");
        Ok(stats)
    }

    /// Extracts the isosurface at `level`, visiting only octree leaves whose
    /// value range brackets the level.
    ///
    /// The sink is cleared first. On error the sink is left untouched.
    ///
    /// # Errors
    ///
    /// [`IsosurfaceError::NotSpatial`] for frequency-domain maps,
    /// [`IsosurfaceError::StaleOctree`] if `octree` is dirty or was built for
    /// a map with another extent.
    pub fn visit_df<F, S>(
        &self,
        field: &F,
        sink: &mut S,
        level: f32,
        octree: &Octree,
    ) -> Result<ExtractionStats>
    where
        F: ScalarField + ?Sized,
        S: VertexSink + ?Sized,
    {
        ensure_spatial(field)?;
        if !octree.indexes(field) {
            return Err(IsosurfaceError::StaleOctree);
        }
        sink.clear();

        let cubes = field.cube_extent();
        let mut visitor = OctreeMarcher {
            marcher: CubeMarcher::new(self, field, sink, level, cubes),
            cache: HashedEdgeCache::new(cubes.size()),
            level,
        };
        octree.visit_df(field, &mut visitor);
        visitor.marcher.stats.edges = visitor.cache.resolved();

        let stats = visitor.marcher.stats;
        log::debug!("octree traversal at level {level}: {stats:?}");
        Ok(stats)
    }
}

/// Per-extraction state shared by both traversals.
struct CubeMarcher<'a, F: ?Sized, S: ?Sized> {
    table: &'static CaseTable,
    mode: SurfaceMode,
    color: Vec4,
    field: &'a F,
    sink: &'a mut S,
    interpolator: EdgeInterpolator,
    cubes: Extent,
    stats: ExtractionStats,
}

impl<'a, F, S> CubeMarcher<'a, F, S>
where
    F: ScalarField + ?Sized,
    S: VertexSink + ?Sized,
{
    fn new(extractor: &Extractor, field: &'a F, sink: &'a mut S, level: f32, cubes: Extent) -> Self {
        Self {
            table: extractor.table,
            mode: extractor.mode,
            color: extractor.color,
            field,
            sink,
            interpolator: EdgeInterpolator::new(level),
            cubes,
            stats: ExtractionStats::default(),
        }
    }

    /// Polygonizes the cube at `cube`, relative to the cube extent start.
    fn march<C: EdgeVertexCache>(&mut self, cache: &mut C, cube: UVec3) {
        let origin = self.cubes.start + cube.as_ivec3();
        let values: [f32; 8] =
            std::array::from_fn(|i| self.field.wrapped_value(origin + CORNER_OFFSETS[i]));
        let pattern = corner_pattern(&values, self.interpolator.level());
        self.stats.cubes += 1;
        if pattern == 0 || pattern == u8::MAX {
            return;
        }

        let mut ids: [Option<VertexId>; 12] = [None; 12];
        for (edge, id) in ids.iter_mut().enumerate() {
            let [c0, c1] = EDGE_CORNERS[edge];
            let axis = edge_axis(edge);
            let offset = CORNER_OFFSETS[c0];
            let key = EdgeKey::new(cube + offset.as_uvec3(), axis);

            let (field, interpolator, color) = (self.field, self.interpolator, self.color);
            let sink = &mut *self.sink;
            let vertices = &mut self.stats.vertices;
            *id = cache.resolve(key, || {
                let position =
                    interpolator.interpolate(field, origin + offset, axis, values[c0], values[c1])?;
                *vertices += 1;
                Some(sink.add(position, Vec3::ZERO, color))
            });
        }

        match self.mode {
            SurfaceMode::Triangles => {
                self.stats.triangles += self.table.emit_triangles(pattern, &ids, &mut *self.sink);
            }
            SurfaceMode::Lines => {
                let shared_low_faces = cube.cmpgt(UVec3::ZERO);
                self.stats.lines += self.table.emit_lines(
                    pattern,
                    &ids,
                    shared_low_faces,
                    &mut *self.sink,
                );
            }
        }
    }
}

/// Octree visitor marching the cubes of every bracketing leaf.
struct OctreeMarcher<'a, F: ?Sized, S: ?Sized> {
    marcher: CubeMarcher<'a, F, S>,
    cache: HashedEdgeCache,
    level: f32,
}

impl<F, S> OctreeVisitor<F> for OctreeMarcher<'_, F, S>
where
    F: ScalarField + ?Sized,
    S: VertexSink + ?Sized,
{
    fn visit_node(&mut self, node: &OctreeNode, _level: usize, _extent: &Extent) -> bool {
        node.brackets(self.level)
    }

    fn visit_leaf(&mut self, _field: &F, point: IVec3) {
        let cube = (point - self.marcher.cubes.start).as_uvec3();
        self.marcher.march(&mut self.cache, cube);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::IndexedMesh;

    fn hot_voxel(size: u32, hot: IVec3) -> crate::field::LatticeField {
        let mut field =
            crate::field::LatticeField::filled(Extent::from_size(UVec3::splat(size)), 0.0);
        field.set(hot, 10.0);
        field
    }

    #[test]
    fn test_hot_voxel_patch() {
        let field = hot_voxel(4, IVec3::splat(2));
        let mut mesh = IndexedMesh::new();
        let stats = Extractor::new().generate(&field, &mut mesh, 5.0).unwrap();

        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_triangles(), 8);
        assert_eq!(stats.vertices, 6);
        assert_eq!(stats.triangles, 8);
        assert_eq!(stats.cubes, 27);
        for v in &mesh.vertices {
            assert!((v.distance(Vec3::splat(2.0)) - 0.5).abs() < 1e-6);
        }
        // the very first vertex is a real vertex and takes part in triangles
        assert!(mesh.triangles.iter().any(|t| t.contains(&0)));
    }

    #[test]
    fn test_all_below_level() {
        let field = crate::field::LatticeField::filled(Extent::from_size(UVec3::splat(6)), -1.0);
        let mut mesh = IndexedMesh::new();
        let stats = Extractor::new().generate(&field, &mut mesh, 0.0).unwrap();
        assert!(mesh.is_empty());
        assert_eq!(stats.triangles, 0);
        assert_eq!(stats.cubes, 125);
    }

    #[test]
    fn test_face_on_level() {
        // the x = 0 face sits exactly on the level, everything else above
        let extent = Extent::from_size(UVec3::splat(4));
        let field = crate::field::LatticeField::from_fn(extent, |p| p.x as f32);
        let mut mesh = IndexedMesh::new();
        Extractor::new().generate(&field, &mut mesh, 0.0).unwrap();
        assert!(mesh.is_empty());

        // level on an interior plane: corners on the level count as above it
        let mut mesh = IndexedMesh::new();
        Extractor::new().generate(&field, &mut mesh, 2.0).unwrap();
        assert!(mesh.num_triangles() > 0);
        for v in &mesh.vertices {
            assert!((v.x - 2.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_frequency_domain_rejected() {
        let field = hot_voxel(4, IVec3::splat(2)).with_domain(MapDomain::Frequency);
        let mut mesh = IndexedMesh::new();
        let marker = mesh.add(Vec3::ONE, Vec3::ZERO, Vec4::ONE);
        mesh.add_tri(marker, marker, marker);

        let err = Extractor::new().generate(&field, &mut mesh, 5.0).unwrap_err();
        assert!(matches!(err, IsosurfaceError::NotSpatial));
        let mut tree = Octree::new();
        tree.set_new_map(&field).unwrap();
        let err = Extractor::new()
            .visit_df(&field, &mut mesh, 5.0, &tree)
            .unwrap_err();
        assert!(matches!(err, IsosurfaceError::NotSpatial));

        assert_eq!(mesh.num_vertices(), 1);
        assert_eq!(mesh.num_triangles(), 1);
    }

    #[test]
    fn test_stale_octree_rejected() {
        let field = hot_voxel(4, IVec3::splat(2));
        let mut mesh = IndexedMesh::new();
        let tree = Octree::new();
        let err = Extractor::new()
            .visit_df(&field, &mut mesh, 5.0, &tree)
            .unwrap_err();
        assert!(matches!(err, IsosurfaceError::StaleOctree));

        let mut tree = Octree::new();
        tree.set_new_map(&hot_voxel(5, IVec3::splat(2))).unwrap();
        assert!(Extractor::new()
            .visit_df(&field, &mut mesh, 5.0, &tree)
            .is_err());
    }

    #[test]
    fn test_octree_hot_voxel() {
        let field = hot_voxel(4, IVec3::splat(2));
        let mut tree = Octree::new();
        tree.set_new_map(&field).unwrap();
        let mut mesh = IndexedMesh::new();
        let stats = Extractor::new()
            .visit_df(&field, &mut mesh, 5.0, &tree)
            .unwrap();
        assert_eq!(stats.cubes, 8);
        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_triangles(), 8);
    }

    #[test]
    fn test_lines_hot_voxel() {
        let field = hot_voxel(4, IVec3::splat(2));
        let extractor = Extractor::new().with_mode(SurfaceMode::Lines);
        let mut mesh = IndexedMesh::new();
        let stats = extractor.generate(&field, &mut mesh, 5.0).unwrap();
        // the octahedron's 12 edges, each emitted once
        assert_eq!(stats.lines, 12);
        assert_eq!(mesh.num_triangles(), 0);
        let mut segments: Vec<[u32; 2]> = mesh
            .lines
            .iter()
            .map(|&[a, b]| [a.min(b), a.max(b)])
            .collect();
        segments.sort_unstable();
        segments.dedup();
        assert_eq!(segments.len(), 12);
    }

    #[test]
    fn test_periodic_wrap() {
        let field = hot_voxel(4, IVec3::ZERO);
        let mut mesh = IndexedMesh::new();
        Extractor::new().generate(&field, &mut mesh, 5.0).unwrap();
        assert_eq!(mesh.num_triangles(), 1);
        assert_eq!(mesh.num_vertices(), 3);

        // the surface around the origin is cut by the seams into one piece per
        // cell corner; seam edges are not shared between the two ends
        let field = field.with_periodic(true);
        Extractor::new().generate(&field, &mut mesh, 5.0).unwrap();
        assert_eq!(mesh.num_triangles(), 8);
        assert_eq!(mesh.num_vertices(), 24);
        let has_vertex = |p: Vec3| mesh.vertices.iter().any(|v| v.distance(p) < 1e-6);
        assert!(has_vertex(Vec3::new(0.5, 0.0, 0.0)));
        assert!(has_vertex(Vec3::new(0.5, 4.0, 0.0)));
        assert!(has_vertex(Vec3::new(3.5, 0.0, 0.0)));
        assert!(has_vertex(Vec3::new(4.0, 4.0, 3.5)));
        assert!(mesh.vertices.iter().all(|v| v.min_element() >= 0.0));
        assert!(mesh.vertices.iter().all(|v| v.max_element() <= 4.0));

        let mut octree = Octree::new();
        octree.set_new_map(&field).unwrap();
        let mut pruned = IndexedMesh::new();
        Extractor::new()
            .visit_df(&field, &mut pruned, 5.0, &octree)
            .unwrap();
        assert_eq!(pruned.num_vertices(), 24);
        assert_eq!(pruned.num_triangles(), 8);
    }

    #[test]
    fn test_color_and_transform() {
        let field =
            hot_voxel(4, IVec3::splat(2)).with_spacing(Vec3::splat(-1.0), Vec3::splat(0.5));
        let color = Vec4::new(1.0, 0.0, 0.0, 1.0);
        let mut mesh = IndexedMesh::new();
        Extractor::new()
            .with_color(color)
            .generate(&field, &mut mesh, 5.0)
            .unwrap();
        assert!(mesh.colors.iter().all(|&c| c == color));
        for v in &mesh.vertices {
            assert!((v.distance(Vec3::ZERO) - 0.25).abs() < 1e-6);
        }
    }
}
