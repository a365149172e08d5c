//! Per-extraction memory of which cube edges already produced a vertex.
//!
//! Every interior cube edge is shared by four cubes. Whatever order the
//! cubes are visited in, the crossing on an edge must be interpolated once
//! and the same [`VertexId`] handed to all four. [`SweepEdgeCache`] does this
//! with rolling plane/row buffers for raster-order sweeps; [`HashedEdgeCache`]
//! keys edges by absolute grid offset for any visiting order.

use std::collections::HashMap;

use glam::UVec3;

use crate::field::Axis;
use crate::sink::VertexId;

/// Identity of one lattice edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    /// Low end of the edge, relative to the start of the cube extent.
    ///
    /// Not wrapped: on a periodic map the far-face edge and the near-face
    /// edge are different edges.
    pub origin: UVec3,
    /// Direction of the edge.
    pub axis: Axis,
}

impl EdgeKey {
    /// Creates a key.
    #[must_use]
    pub fn new(origin: UVec3, axis: Axis) -> Self {
        Self { origin, axis }
    }
}

/// Cache resolving each edge to its vertex at most once.
pub trait EdgeVertexCache {
    /// Returns the cached result for `key`, running `compute` if the edge has
    /// not been resolved yet. `None` means the edge does not cross the level.
    fn resolve<F>(&mut self, key: EdgeKey, compute: F) -> Option<VertexId>
    where
        F: FnOnce() -> Option<VertexId>;

    /// Forgets every resolved edge.
    fn clear(&mut self);

    /// Number of edges resolved since the last clear.
    fn resolved(&self) -> usize;
}

/// Hash-map backed cache for arbitrary (e.g. depth-first) visiting orders.
///
/// Keys are `4 * offset + axis`, with `offset` the linear index of the edge
/// origin in a lattice one point larger than the cube extent on each axis.
#[derive(Debug, Clone)]
pub struct HashedEdgeCache {
    span: UVec3,
    edges: HashMap<usize, Option<VertexId>>,
}

impl HashedEdgeCache {
    /// Creates a cache for a cube extent of `cube_count` cubes per axis.
    #[must_use]
    pub fn new(cube_count: UVec3) -> Self {
        Self {
            span: cube_count + UVec3::ONE,
            edges: HashMap::new(),
        }
    }

    /// Hash key of an edge.
    #[must_use]
    pub fn key_of(&self, key: EdgeKey) -> usize {
        let o = key.origin;
        let offset = o.x as usize
            + self.span.x as usize * (o.y as usize + self.span.y as usize * o.z as usize);
        4 * offset + key.axis.index()
    }
}

impl EdgeVertexCache for HashedEdgeCache {
    fn resolve<F>(&mut self, key: EdgeKey, compute: F) -> Option<VertexId>
    where
        F: FnOnce() -> Option<VertexId>,
    {
        let hash_key = self.key_of(key);
        *self.edges.entry(hash_key).or_insert_with(compute)
    }

    fn clear(&mut self) {
        self.edges.clear();
    }

    fn resolved(&self) -> usize {
        self.edges.len()
    }
}

/// A cache slot: `None` until resolved, then the resolution.
type Slot = Option<Option<VertexId>>;

/// Rolling-buffer cache for a z-plane / y-row / x-cube raster sweep.
///
/// Two plane buffers hold the x- and y-direction edges of the current cube
/// slab's lower and upper planes; two row buffers hold the z-direction edges
/// of the current row's lower and upper lines. The sweep calls
/// [`SweepEdgeCache::next_row`] after each row and
/// [`SweepEdgeCache::next_plane`] after each plane, which shift the upper
/// buffers down and clear the new upper ones.
#[derive(Debug, Clone)]
pub struct SweepEdgeCache {
    span: UVec3,
    plane: u32,
    row: u32,
    planes: [Vec<[Slot; 2]>; 2],
    rows: [Vec<Slot>; 2],
    resolved: usize,
}

impl SweepEdgeCache {
    /// Creates a cache for a cube extent of `cube_count` cubes per axis.
    #[must_use]
    pub fn new(cube_count: UVec3) -> Self {
        let span = cube_count + UVec3::ONE;
        let plane_len = span.x as usize * span.y as usize;
        let row_len = span.x as usize;
        Self {
            span,
            plane: 0,
            row: 0,
            planes: [vec![[None; 2]; plane_len], vec![[None; 2]; plane_len]],
            rows: [vec![None; row_len], vec![None; row_len]],
            resolved: 0,
        }
    }

    /// Current cube row (y).
    #[must_use]
    pub fn row(&self) -> u32 {
        self.row
    }

    /// Current cube plane (z).
    #[must_use]
    pub fn plane(&self) -> u32 {
        self.plane
    }

    /// Advances to the next row of the current plane.
    pub fn next_row(&mut self) {
        self.rows.swap(0, 1);
        self.rows[1].fill(None);
        self.row += 1;
    }

    /// Advances to the first row of the next plane.
    pub fn next_plane(&mut self) {
        self.planes.swap(0, 1);
        self.planes[1].fill([None; 2]);
        for row in &mut self.rows {
            row.fill(None);
        }
        self.plane += 1;
        self.row = 0;
    }

    fn slot(&mut self, key: EdgeKey) -> Option<&mut Slot> {
        let o = key.origin;
        if o.x >= self.span.x || o.y >= self.span.y {
            return None;
        }
        match key.axis {
            Axis::X | Axis::Y => {
                let dz = o.z.checked_sub(self.plane).filter(|&d| d < 2)?;
                let i = o.x as usize + self.span.x as usize * o.y as usize;
                Some(&mut self.planes[dz as usize][i][key.axis.index()])
            }
            Axis::Z => {
                if o.z != self.plane {
                    return None;
                }
                let dy = o.y.checked_sub(self.row).filter(|&d| d < 2)?;
                Some(&mut self.rows[dy as usize][o.x as usize])
            }
        }
    }
}

impl EdgeVertexCache for SweepEdgeCache {
    fn resolve<F>(&mut self, key: EdgeKey, compute: F) -> Option<VertexId>
    where
        F: FnOnce() -> Option<VertexId>,
    {
        let Some(slot) = self.slot(key) else {
            log::warn!("edge {key:?} is outside the sweep window, resolving uncached");
            return compute();
        };
        if let Some(id) = *slot {
            return id;
        }
        let id = compute();
        *slot = Some(id);
        self.resolved += 1;
        id
    }

    fn clear(&mut self) {
        for plane in &mut self.planes {
            plane.fill([None; 2]);
        }
        for row in &mut self.rows {
            row.fill(None);
        }
        self.plane = 0;
        self.row = 0;
        self.resolved = 0;
    }

    fn resolved(&self) -> usize {
        self.resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case_table::{edge_axis, edge_origin};

    /// Resolves all 12 edges of every cube in raster order, handing out a
    /// fresh id per computation. Returns the number of computations.
    fn sweep_all<C: EdgeVertexCache + SweepControl>(cache: &mut C, cubes: UVec3) -> u32 {
        let mut computed = 0_u32;
        for z in 0..cubes.z {
            for y in 0..cubes.y {
                for x in 0..cubes.x {
                    for edge in 0..12 {
                        let origin = UVec3::new(x, y, z) + edge_origin(edge).as_uvec3();
                        let key = EdgeKey::new(origin, edge_axis(edge));
                        cache.resolve(key, || {
                            computed += 1;
                            Some(VertexId(computed))
                        });
                    }
                }
                cache.row_done();
            }
            cache.plane_done();
        }
        computed
    }

    trait SweepControl {
        fn row_done(&mut self) {}
        fn plane_done(&mut self) {}
    }

    impl SweepControl for SweepEdgeCache {
        fn row_done(&mut self) {
            self.next_row();
        }
        fn plane_done(&mut self) {
            self.next_plane();
        }
    }

    impl SweepControl for HashedEdgeCache {}

    fn distinct_edges(cubes: UVec3) -> u32 {
        let p = cubes + UVec3::ONE;
        cubes.x * p.y * p.z + p.x * cubes.y * p.z + p.x * p.y * cubes.z
    }

    #[test]
    fn test_sweep_resolves_each_edge_once() {
        let cubes = UVec3::new(3, 4, 2);
        let mut cache = SweepEdgeCache::new(cubes);
        let computed = sweep_all(&mut cache, cubes);
        assert_eq!(computed, distinct_edges(cubes));
        assert_eq!(cache.resolved(), distinct_edges(cubes) as usize);
    }

    #[test]
    fn test_hashed_resolves_each_edge_once() {
        let cubes = UVec3::new(3, 4, 2);
        let mut cache = HashedEdgeCache::new(cubes);
        let computed = sweep_all(&mut cache, cubes);
        assert_eq!(computed, distinct_edges(cubes));
        assert_eq!(cache.resolved(), distinct_edges(cubes) as usize);
    }

    #[test]
    fn test_shared_edge_reuses_id() {
        // x-edge at (1, 1, 1) is edge 3 of cube (1,0,0), edge 2 of (1,1,0),
        // edge 1 of (1,0,1) and edge 0 of (1,1,1)
        let key = EdgeKey::new(UVec3::new(1, 1, 1), Axis::X);
        let mut cache = HashedEdgeCache::new(UVec3::splat(2));
        assert_eq!(cache.resolve(key, || Some(VertexId(7))), Some(VertexId(7)));
        assert_eq!(cache.resolve(key, || Some(VertexId(8))), Some(VertexId(7)));
    }

    #[test]
    fn test_no_crossing_is_remembered() {
        let key = EdgeKey::new(UVec3::ZERO, Axis::Z);
        let mut cache = SweepEdgeCache::new(UVec3::splat(2));
        assert_eq!(cache.resolve(key, || None), None);
        assert_eq!(cache.resolve(key, || Some(VertexId(1))), None);
        assert_eq!(cache.resolved(), 1);
    }

    #[test]
    fn test_sweep_interior_cube_computes_three_edges() {
        let cubes = UVec3::splat(3);
        let mut cache = SweepEdgeCache::new(cubes);
        let mut fresh_per_cube = Vec::new();
        for z in 0..cubes.z {
            for y in 0..cubes.y {
                for x in 0..cubes.x {
                    let mut fresh = 0;
                    for edge in 0..12 {
                        let origin = UVec3::new(x, y, z) + edge_origin(edge).as_uvec3();
                        cache.resolve(EdgeKey::new(origin, edge_axis(edge)), || {
                            fresh += 1;
                            None
                        });
                    }
                    fresh_per_cube.push(((x, y, z), fresh));
                }
                cache.next_row();
            }
            cache.next_plane();
        }
        for ((x, y, z), fresh) in fresh_per_cube {
            if x > 0 && y > 0 && z > 0 {
                assert_eq!(fresh, 3, "cube ({x}, {y}, {z})");
            }
        }
        // the first cube has nothing to reuse
        let mut cache = SweepEdgeCache::new(cubes);
        let mut fresh = 0;
        for edge in 0..12 {
            let origin = edge_origin(edge).as_uvec3();
            cache.resolve(EdgeKey::new(origin, edge_axis(edge)), || {
                fresh += 1;
                None
            });
        }
        assert_eq!(fresh, 12);
    }

    #[test]
    fn test_clear() {
        let key = EdgeKey::new(UVec3::new(1, 0, 0), Axis::Y);
        let mut cache = HashedEdgeCache::new(UVec3::splat(2));
        cache.resolve(key, || Some(VertexId(0)));
        cache.clear();
        assert_eq!(cache.resolved(), 0);
        assert_eq!(cache.resolve(key, || Some(VertexId(5))), Some(VertexId(5)));
    }
}
