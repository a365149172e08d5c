//! Branch-on-need min/max octree over the cubes of a scalar lattice.
//!
//! The tree indexes the field's cube extent (see [`ScalarField::cube_extent`]).
//! A node covering a range of cubes splits only the axes whose range has the
//! node's highest set bit, so non-power-of-two grids get no padding. Every
//! node stores the min and max of all samples touching its cubes, which lets
//! a traversal skip subtrees that cannot contain the level.
//!
//! Nodes are stored one flat `Vec` per level. The children of a node are
//! contiguous in the next level and only the first child's index is kept;
//! child extents are recomputed from the parent extent during traversal.

use std::collections::HashMap;

use glam::{BVec3, IVec3, UVec3};

use crate::case_table::CORNER_OFFSETS;
use crate::error::{IsosurfaceError, Result};
use crate::field::{Extent, ScalarField};

/// Maximum number of levels, enough for 255 cubes along an axis.
pub const MAX_OCTREE_DEPTH: usize = 9;

/// Largest child index a node can address (28 bits).
pub const MAX_CHILD_INDEX: usize = (1 << 28) - 1;

/// Largest map size along any axis the octree accepts.
pub const MAX_MANAGEABLE_SIZE: u32 = 255;

/// One octree node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OctreeNode {
    first_child: u32,
    branch: BVec3,
    leaf: bool,
    min: f32,
    max: f32,
}

impl OctreeNode {
    /// Creates a leaf node.
    #[must_use]
    pub fn leaf(min: f32, max: f32) -> Self {
        Self {
            first_child: 0,
            branch: BVec3::FALSE,
            leaf: true,
            min,
            max,
        }
    }

    /// Creates an internal node whose children start at `first_child` in the
    /// next level and which splits the axes set in `branch`.
    ///
    /// Returns an error if `first_child` does not fit in 28 bits.
    #[allow(clippy::cast_possible_truncation)]
    pub fn branch(first_child: usize, branch: BVec3, min: f32, max: f32) -> Result<Self> {
        if first_child > MAX_CHILD_INDEX {
            return Err(IsosurfaceError::ChildIndexOverflow {
                index: first_child,
                max: MAX_CHILD_INDEX,
            });
        }
        Ok(Self {
            first_child: first_child as u32,
            branch,
            leaf: false,
            min,
            max,
        })
    }

    /// Index of the first child in the next level.
    #[must_use]
    pub fn first_child(&self) -> usize {
        self.first_child as usize
    }

    /// Axes split by this node.
    #[must_use]
    pub fn branch_flags(&self) -> BVec3 {
        self.branch
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.leaf
    }

    #[must_use]
    pub fn min(&self) -> f32 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f32 {
        self.max
    }

    /// Number of children (0 for a leaf).
    #[must_use]
    pub fn num_children(&self) -> usize {
        if self.leaf {
            0
        } else {
            1 << self.branch.bitmask().count_ones()
        }
    }

    /// Whether the subtree can contain a crossing of `level`.
    #[must_use]
    pub fn brackets(&self, level: f32) -> bool {
        self.min < level && level <= self.max
    }
}

/// How a node's cube range is divided among its children.
#[derive(Debug, Clone, Copy)]
struct Split {
    branch: BVec3,
    /// Inclusive `(start, end)` halves per axis; only the first is used for
    /// axes that do not split.
    halves: [[(i32, i32); 2]; 3],
}

impl Split {
    /// Splits `extent` at the highest bit set in any axis range, or returns
    /// `None` when the extent is a single cube.
    fn of(extent: &Extent) -> Option<Self> {
        let range = (extent.end - extent.start).as_uvec3();
        let combined = range.x | range.y | range.z;
        if combined == 0 {
            return None;
        }
        let bit = 31 - combined.leading_zeros();
        let half = 1_i32 << bit;

        let mut branch = BVec3::FALSE;
        let mut halves = [[(0, 0); 2]; 3];
        for axis in 0..3 {
            let (start, end) = (extent.start[axis], extent.end[axis]);
            if range[axis] & (1 << bit) != 0 {
                branch.set(axis, true);
                halves[axis] = [(start, start + half - 1), (start + half, end)];
            } else {
                halves[axis][0] = (start, end);
            }
        }
        Some(Self { branch, halves })
    }

    /// Child extents, x fastest, then y, then z.
    fn children(self) -> impl Iterator<Item = Extent> {
        let branch = self.branch;
        let count = move |axis: usize| if branch.test(axis) { 2 } else { 1 };
        let h = self.halves;
        (0..count(2)).flat_map(move |k| {
            (0..count(1)).flat_map(move |j| {
                (0..count(0)).map(move |i| {
                    Extent::new(
                        IVec3::new(h[0][i].0, h[1][j].0, h[2][k].0),
                        IVec3::new(h[0][i].1, h[1][j].1, h[2][k].1),
                    )
                })
            })
        })
    }
}

/// Node count per level of the subtree over a cube range, memoised on the
/// range since the shape of a subtree depends on nothing else.
fn subtree_level_counts(range: UVec3, memo: &mut HashMap<UVec3, Vec<usize>>) -> Vec<usize> {
    if let Some(counts) = memo.get(&range) {
        return counts.clone();
    }
    let mut counts = vec![1];
    if let Some(split) = Split::of(&Extent::new(IVec3::ZERO, range.as_ivec3())) {
        for child in split.children() {
            let child_counts = subtree_level_counts((child.end - child.start).as_uvec3(), memo);
            if counts.len() < child_counts.len() + 1 {
                counts.resize(child_counts.len() + 1, 0);
            }
            for (level, n) in child_counts.iter().enumerate() {
                counts[level + 1] += n;
            }
        }
    }
    memo.insert(range, counts.clone());
    counts
}

/// Min and max of the 8 corners of the cube at `origin`.
fn cube_min_max<F: ScalarField + ?Sized>(field: &F, origin: IVec3) -> (f32, f32) {
    CORNER_OFFSETS
        .iter()
        .map(|&offset| field.wrapped_value(origin + offset))
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), v| {
            (min.min(v), max.max(v))
        })
}

/// Callbacks for [`Octree::visit_df`].
pub trait OctreeVisitor<F: ScalarField + ?Sized> {
    /// Called for every reached node; returning `false` skips its subtree.
    fn visit_node(&mut self, node: &OctreeNode, level: usize, extent: &Extent) -> bool;

    /// Called for every cube origin covered by a reached leaf.
    fn visit_leaf(&mut self, field: &F, point: IVec3);
}

/// Min/max octree over the cubes of one map.
#[derive(Debug, Clone)]
pub struct Octree {
    levels: Vec<Vec<OctreeNode>>,
    level_counts: Vec<usize>,
    extent: Option<Extent>,
    dirty: bool,
}

impl Default for Octree {
    fn default() -> Self {
        Self::new()
    }
}

impl Octree {
    /// Creates an empty, dirty octree.
    #[must_use]
    pub fn new() -> Self {
        Self {
            levels: Vec::new(),
            level_counts: Vec::new(),
            extent: None,
            dirty: true,
        }
    }

    /// Returns true if every axis of the map is small enough to index.
    pub fn is_map_manageable<F: ScalarField + ?Sized>(field: &F) -> bool {
        field.size().max_element() <= MAX_MANAGEABLE_SIZE
    }

    /// Indexes a new map, replacing whatever the tree held before.
    pub fn set_new_map<F: ScalarField + ?Sized>(&mut self, field: &F) -> Result<()> {
        self.make_dirty();
        self.initialize(field)
    }

    /// Flags the tree for rebuild, e.g. after the map's samples changed.
    pub fn make_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns true if the tree must be rebuilt before use.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns true if the tree is clean and was built for `field`'s extent.
    pub fn indexes<F: ScalarField + ?Sized>(&self, field: &F) -> bool {
        !self.dirty && self.extent == Some(field.cube_extent())
    }

    /// Builds the tree for `field` unless it already indexes it.
    ///
    /// # Errors
    ///
    /// [`IsosurfaceError::MapTooLarge`] if the map is not manageable; the
    /// resource-limit errors if the tree would overflow its index fields.
    pub fn initialize<F: ScalarField + ?Sized>(&mut self, field: &F) -> Result<()> {
        if self.indexes(field) {
            return Ok(());
        }
        if !Self::is_map_manageable(field) {
            return Err(IsosurfaceError::MapTooLarge { size: field.size() });
        }
        self.build(field)
    }

    fn build<F: ScalarField + ?Sized>(&mut self, field: &F) -> Result<()> {
        self.dirty = true;
        self.levels.clear();
        self.level_counts.clear();

        let extent = field.cube_extent();
        if !extent.is_empty() {
            let range = (extent.end - extent.start).as_uvec3();
            let counts = subtree_level_counts(range, &mut HashMap::new());
            if counts.len() > MAX_OCTREE_DEPTH {
                return Err(IsosurfaceError::OctreeTooDeep {
                    depth: counts.len(),
                    max: MAX_OCTREE_DEPTH,
                });
            }
            self.levels = counts.iter().map(|&n| Vec::with_capacity(n)).collect();
            let root = self.build_node(field, &extent, 0)?;
            self.levels[0].push(root);
            self.level_counts = counts;
            log::info!(
                "built octree over {} cubes: {} levels, {} nodes",
                extent.num_points(),
                self.levels.len(),
                self.num_nodes()
            );
        }

        self.extent = Some(extent);
        self.dirty = false;
        Ok(())
    }

    fn build_node<F: ScalarField + ?Sized>(
        &mut self,
        field: &F,
        extent: &Extent,
        level: usize,
    ) -> Result<OctreeNode> {
        let Some(split) = Split::of(extent) else {
            let (min, max) = cube_min_max(field, extent.start);
            return Ok(OctreeNode::leaf(min, max));
        };
        // levels are sized from the precomputed counts; a split past them means
        // the counts and the split disagree
        if level + 1 >= self.levels.len() {
            return Err(IsosurfaceError::OctreeTooDeep {
                depth: level + 2,
                max: self.levels.len(),
            });
        }

        let mut children = [OctreeNode::leaf(0.0, 0.0); 8];
        let mut n = 0;
        let (mut min, mut max) = (f32::INFINITY, f32::NEG_INFINITY);
        for child_extent in split.children() {
            let child = self.build_node(field, &child_extent, level + 1)?;
            min = min.min(child.min);
            max = max.max(child.max);
            children[n] = child;
            n += 1;
        }

        let next = &mut self.levels[level + 1];
        let first_child = next.len();
        next.extend_from_slice(&children[..n]);
        OctreeNode::branch(first_child, split.branch, min, max)
    }

    /// Depth-first traversal; see [`OctreeVisitor`]. A no-op on an empty tree.
    pub fn visit_df<F, V>(&self, field: &F, visitor: &mut V)
    where
        F: ScalarField + ?Sized,
        V: OctreeVisitor<F> + ?Sized,
    {
        if let (Some(extent), false) = (self.extent, self.levels.is_empty()) {
            self.visit_node(field, visitor, 0, 0, &extent);
        }
    }

    fn visit_node<F, V>(
        &self,
        field: &F,
        visitor: &mut V,
        level: usize,
        index: usize,
        extent: &Extent,
    ) where
        F: ScalarField + ?Sized,
        V: OctreeVisitor<F> + ?Sized,
    {
        let node = &self.levels[level][index];
        if !visitor.visit_node(node, level, extent) {
            return;
        }
        match Split::of(extent) {
            None => {
                debug_assert!(node.is_leaf());
                for point in extent.points() {
                    visitor.visit_leaf(field, point);
                }
            }
            Some(split) => {
                debug_assert!(!node.is_leaf());
                for (i, child) in split.children().enumerate() {
                    self.visit_node(field, visitor, level + 1, node.first_child() + i, &child);
                }
            }
        }
    }

    /// Number of levels (0 for an empty tree).
    #[must_use]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Nodes of one level.
    #[must_use]
    pub fn level(&self, level: usize) -> &[OctreeNode] {
        self.levels.get(level).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Exact node count of a level, known before the build starts.
    #[must_use]
    pub fn num_nodes_for_level(&self, level: usize) -> usize {
        self.level_counts.get(level).copied().unwrap_or(0)
    }

    /// Total node count.
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    /// The root node, if the tree is not empty.
    #[must_use]
    pub fn root(&self) -> Option<&OctreeNode> {
        self.levels.first().and_then(|l| l.first())
    }

    /// Children of `node`, which must belong to `level`.
    #[must_use]
    pub fn children(&self, level: usize, node: &OctreeNode) -> &[OctreeNode] {
        if node.is_leaf() {
            return &[];
        }
        let start = node.first_child();
        &self.level(level + 1)[start..start + node.num_children()]
    }

    /// Cube extent the tree was built for.
    #[must_use]
    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }

    /// Returns true if the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
