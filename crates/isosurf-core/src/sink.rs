//! Vertex sinks: where extracted geometry goes.
//!
//! The extractor never owns a mesh. It streams vertices and primitive index
//! lists into a [`VertexSink`]; [`IndexedMesh`] is the in-memory sink used by
//! the facade and by tests.

use bytemuck::{Pod, Zeroable};
use glam::{Vec3, Vec4};

/// Handle to a vertex previously added to a sink.
///
/// Every value, including 0, names a real vertex. Edges without a crossing
/// are represented as `Option<VertexId>::None`, never by a reserved id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub u32);

impl VertexId {
    /// Returns the id as a buffer index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Receiver of extracted vertices and primitives.
pub trait VertexSink {
    /// Adds a vertex and returns its handle.
    fn add(&mut self, position: Vec3, normal: Vec3, color: Vec4) -> VertexId;

    /// Adds a line segment between two vertices.
    fn add_line(&mut self, a: VertexId, b: VertexId);

    /// Adds a triangle.
    fn add_tri(&mut self, a: VertexId, b: VertexId, c: VertexId);

    /// Adds a quad, split into two triangles by default.
    fn add_quad(&mut self, a: VertexId, b: VertexId, c: VertexId, d: VertexId) {
        self.add_tri(a, b, c);
        self.add_tri(a, c, d);
    }

    /// Removes all vertices and primitives.
    fn clear(&mut self);
}

/// Interleaved vertex record for upload to a renderer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 4],
}

/// Indexed line/triangle mesh collected from an extraction.
#[derive(Debug, Clone, Default)]
pub struct IndexedMesh {
    /// Vertex positions in world space.
    pub vertices: Vec<Vec3>,
    /// Per-vertex normals (zero until [`IndexedMesh::compute_normals`] runs).
    pub normals: Vec<Vec3>,
    /// Per-vertex colors.
    pub colors: Vec<Vec4>,
    /// Line segments as vertex index pairs.
    pub lines: Vec<[u32; 2]>,
    /// Triangles as vertex index triples.
    pub triangles: Vec<[u32; 3]>,
}

impl IndexedMesh {
    /// Creates an empty mesh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of vertices.
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Returns the number of triangles.
    #[must_use]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Returns the number of line segments.
    #[must_use]
    pub fn num_lines(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if the mesh has no vertices.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Position of a vertex.
    #[must_use]
    pub fn position(&self, id: VertexId) -> Vec3 {
        self.vertices[id.index()]
    }

    /// Triangles resolved to their corner positions.
    pub fn triangle_positions(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.triangles.iter().map(|t| {
            [
                self.vertices[t[0] as usize],
                self.vertices[t[1] as usize],
                self.vertices[t[2] as usize],
            ]
        })
    }

    /// Replaces all normals by area-weighted averages of the adjacent
    /// triangle normals. Vertices used only by lines get a zero normal.
    pub fn compute_normals(&mut self) {
        self.normals.clear();
        self.normals.resize(self.vertices.len(), Vec3::ZERO);
        for &[a, b, c] in &self.triangles {
            let va = self.vertices[a as usize];
            let vb = self.vertices[b as usize];
            let vc = self.vertices[c as usize];
            let n = (vc - vb).cross(va - vb);
            self.normals[a as usize] += n;
            self.normals[b as usize] += n;
            self.normals[c as usize] += n;
        }
        for normal in &mut self.normals {
            let len = normal.length();
            if len > 1e-10 {
                *normal /= len;
            }
        }
    }

    /// Vertices as interleaved records.
    #[must_use]
    pub fn interleaved(&self) -> Vec<MeshVertex> {
        self.vertices
            .iter()
            .zip(&self.normals)
            .zip(&self.colors)
            .map(|((p, n), c)| MeshVertex {
                position: p.to_array(),
                normal: n.to_array(),
                color: c.to_array(),
            })
            .collect()
    }

    /// Interleaved vertices as raw bytes.
    #[must_use]
    pub fn vertex_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.interleaved()).to_vec()
    }

    /// Triangle indices as a flat list.
    #[must_use]
    pub fn triangle_indices(&self) -> &[u32] {
        bytemuck::cast_slice(&self.triangles)
    }

    /// Line indices as a flat list.
    #[must_use]
    pub fn line_indices(&self) -> &[u32] {
        bytemuck::cast_slice(&self.lines)
    }
}

impl VertexSink for IndexedMesh {
    #[allow(clippy::cast_possible_truncation)]
    fn add(&mut self, position: Vec3, normal: Vec3, color: Vec4) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(position);
        self.normals.push(normal);
        self.colors.push(color);
        id
    }

    fn add_line(&mut self, a: VertexId, b: VertexId) {
        self.lines.push([a.0, b.0]);
    }

    fn add_tri(&mut self, a: VertexId, b: VertexId, c: VertexId) {
        self.triangles.push([a.0, b.0, c.0]);
    }

    fn clear(&mut self) {
        self.vertices.clear();
        self.normals.clear();
        self.colors.clear();
        self.lines.clear();
        self.triangles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_triangle() -> IndexedMesh {
        let mut mesh = IndexedMesh::new();
        let a = mesh.add(Vec3::ZERO, Vec3::ZERO, Vec4::ONE);
        let b = mesh.add(Vec3::X, Vec3::ZERO, Vec4::ONE);
        let c = mesh.add(Vec3::Y, Vec3::ZERO, Vec4::ONE);
        mesh.add_tri(a, b, c);
        mesh
    }

    #[test]
    fn test_first_vertex_is_zero() {
        let mesh = unit_triangle();
        assert_eq!(mesh.triangles, vec![[0, 1, 2]]);
        assert_eq!(mesh.position(VertexId(0)), Vec3::ZERO);
    }

    #[test]
    fn test_add_quad() {
        let mut mesh = IndexedMesh::new();
        let ids: Vec<VertexId> = [Vec3::ZERO, Vec3::X, Vec3::ONE, Vec3::Y]
            .into_iter()
            .map(|p| mesh.add(p, Vec3::ZERO, Vec4::ONE))
            .collect();
        mesh.add_quad(ids[0], ids[1], ids[2], ids[3]);
        assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_clear() {
        let mut mesh = unit_triangle();
        mesh.add_line(VertexId(0), VertexId(1));
        mesh.clear();
        assert!(mesh.is_empty());
        assert_eq!(mesh.num_triangles(), 0);
        assert_eq!(mesh.num_lines(), 0);
        assert!(mesh.normals.is_empty());
        assert!(mesh.colors.is_empty());
    }

    #[test]
    fn test_compute_normals() {
        let mut mesh = unit_triangle();
        mesh.compute_normals();
        for n in &mesh.normals {
            assert!((n.length() - 1.0).abs() < 1e-6);
            assert!((n.z.abs() - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_vertex_bytes() {
        let mesh = unit_triangle();
        let records = mesh.interleaved();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(
            mesh.vertex_bytes().len(),
            3 * std::mem::size_of::<MeshVertex>()
        );
        assert_eq!(mesh.triangle_indices(), &[0, 1, 2]);
    }
}
