//! The query octree: a frozen, per-level-indexed view of a linear octree.

use std::fmt;

use glam::IVec3;
use rustc_hash::FxHashSet;

use crate::linear::LinearOctree;
use crate::morton;
use crate::octant::OctantId;
use crate::types::{Box3i, MortonCode};
use crate::validation::{self, OctreeState};

/// A face of an octree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Face {
    Left,
    Right,
    Front,
    Back,
    Bottom,
    Top,
}

impl Face {
    /// The unit outward normal of the face.
    #[inline]
    pub fn normal(&self) -> IVec3 {
        match self {
            Face::Left => IVec3::new(-1, 0, 0),
            Face::Right => IVec3::new(1, 0, 0),
            Face::Front => IVec3::new(0, -1, 0),
            Face::Back => IVec3::new(0, 1, 0),
            Face::Bottom => IVec3::new(0, 0, -1),
            Face::Top => IVec3::new(0, 0, 1),
        }
    }

    /// All six faces.
    pub const ALL: [Face; 6] = [
        Face::Left,
        Face::Right,
        Face::Front,
        Face::Back,
        Face::Bottom,
        Face::Top,
    ];

    /// Indices (in canonical child order) of the four children of a
    /// same-level neighbor that share this face of the querying node.
    #[inline]
    fn neighbor_child_indices(&self) -> [usize; 4] {
        match self {
            Face::Left => [4, 5, 6, 7],
            Face::Right => [0, 1, 2, 3],
            Face::Front => [2, 3, 6, 7],
            Face::Back => [0, 1, 4, 5],
            Face::Bottom => [1, 3, 5, 7],
            Face::Top => [0, 2, 4, 6],
        }
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Face::Left => "LEFT",
            Face::Right => "RIGHT",
            Face::Front => "FRONT",
            Face::Back => "BACK",
            Face::Bottom => "BOTTOM",
            Face::Top => "TOP",
        };
        f.write_str(name)
    }
}

/// A node of the octree: a cube with a power-of-two side length.
///
/// A distinguished invalid node marks "no such node" results; it compares
/// unequal to every node including itself, so `==` on nodes behaves like a
/// float comparison against NaN. Use [`is_valid`](Self::is_valid) to test
/// for it.
#[derive(Debug, Clone, Copy)]
pub struct OctreeNode {
    morton_llf: MortonCode,
    level: u32,
}

const INVALID_MORTON: MortonCode = MortonCode::MAX;
const INVALID_LEVEL: u32 = u32::MAX;

impl OctreeNode {
    /// The invalid node.
    pub const INVALID: OctreeNode = OctreeNode {
        morton_llf: INVALID_MORTON,
        level: INVALID_LEVEL,
    };

    #[inline]
    fn from_octant(octant: OctantId) -> Self {
        Self {
            morton_llf: octant.mcode(),
            level: octant.level(),
        }
    }

    /// False for the distinguished invalid node.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.morton_llf != INVALID_MORTON && self.level != INVALID_LEVEL
    }

    /// Lower-left-front corner of the cube.
    #[inline]
    pub fn llf(&self) -> IVec3 {
        morton::decode(self.morton_llf)
    }

    /// Morton-encoded lower-left-front corner.
    #[inline]
    pub fn morton_llf(&self) -> MortonCode {
        self.morton_llf
    }

    /// Side length of the cube.
    #[inline]
    pub fn size(&self) -> i32 {
        morton::octant_size_for_level(self.level)
    }

    /// Level of the node; 0 is a unit cube.
    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }
}

impl PartialEq for OctreeNode {
    fn eq(&self, other: &Self) -> bool {
        if !self.is_valid() || !other.is_valid() {
            return false;
        }
        self.level == other.level && self.morton_llf == other.morton_llf
    }
}

impl fmt::Display for OctreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return f.write_str("{ invalid node }");
        }
        let llf = self.llf();
        write!(
            f,
            "{{ llf: ({}, {}, {}), level: {}, size: {}, morton_llf: {} }}",
            llf.x,
            llf.y,
            llf.z,
            self.level,
            self.size(),
            self.morton_llf
        )
    }
}

/// An octree optimized for spatial queries.
///
/// Nodes are non-overlapping cubes tiling the domain, a cube with origin
/// `(0, 0, 0)` and side `2^depth`. Level-zero nodes have size 1. In a
/// balanced octree the level of nodes sharing at least one vertex differs
/// by at most 1.
///
/// Immutable: built once from a [`LinearOctree`] by the builders, then
/// queried. Lookup by `(corner, level)` is O(1) through a per-level hash
/// index.
#[derive(Debug, Clone)]
pub struct Octree {
    linear: LinearOctree,
    /// Codes of the stored nodes, grouped by level (index 0..=depth).
    levels: Vec<FxHashSet<MortonCode>>,
    bounds: Box3i,
}

impl Octree {
    /// Freezes a linear octree into the query form, consuming it.
    pub(crate) fn from_linear(linear: LinearOctree) -> Self {
        let depth = linear.depth();
        let bounds = Box3i::from_urb(morton::max_xyz_for_depth(depth));
        debug_assert!(bounds.valid());

        // Pre-size each level's set with one counting pass.
        let mut counts = vec![0usize; depth as usize + 1];
        for leaf in linear.leaves() {
            counts[leaf.level() as usize] += 1;
        }

        let mut levels: Vec<FxHashSet<MortonCode>> = counts
            .iter()
            .map(|&n| FxHashSet::with_capacity_and_hasher(n, Default::default()))
            .collect();
        for leaf in linear.leaves() {
            levels[leaf.level() as usize].insert(leaf.mcode());
        }

        Self {
            linear,
            levels,
            bounds,
        }
    }

    /// The most upper-right-back corner of any possible node.
    #[inline]
    pub fn max_xyz(&self) -> IVec3 {
        self.bounds.urb()
    }

    /// Length of the path from the root to a unit leaf.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.linear.depth()
    }

    /// The maximum level over all stored nodes.
    ///
    /// Panics on an empty octree, which the builders never produce.
    pub fn max_level(&self) -> u32 {
        for (level, codes) in self.levels.iter().enumerate().rev() {
            if !codes.is_empty() {
                return level as u32;
            }
        }
        panic!("max_level: empty octree");
    }

    /// Number of nodes.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.linear.leaves().len()
    }

    /// The i-th node in z-order. Panics if `i >= num_nodes()`.
    #[inline]
    pub fn node(&self, i: usize) -> OctreeNode {
        OctreeNode::from_octant(self.linear.leaves()[i])
    }

    /// Iterates the nodes in z-order.
    pub fn nodes(&self) -> impl Iterator<Item = OctreeNode> + '_ {
        self.linear
            .leaves()
            .iter()
            .map(|octant| OctreeNode::from_octant(*octant))
    }

    /// The node with the given corner and level, or the invalid node.
    pub fn try_node_at(&self, llf: IVec3, level: u32) -> OctreeNode {
        if level as usize >= self.levels.len() || !self.bounds.contains(llf) {
            return OctreeNode::INVALID;
        }

        let mcode = morton::encode(llf);
        if self.levels[level as usize].contains(&mcode) {
            OctreeNode {
                morton_llf: mcode,
                level,
            }
        } else {
            OctreeNode::INVALID
        }
    }

    /// The 0, 1 or 4 nodes that share (all or part of) the given face of
    /// `node`.
    ///
    /// In a balanced octree a neighbor can only live on the node's own
    /// level, one level above, or one level below, so three probes suffice.
    ///
    /// Panics if `node` is invalid, or if the octree violates completeness
    /// where a finer neighbor was implied.
    pub fn neighbors(&self, node: &OctreeNode, face: Face) -> Vec<OctreeNode> {
        assert!(node.is_valid(), "neighbors: invalid node");

        if node.level() == self.depth() {
            // The root is the only node; nothing borders it.
            return Vec::new();
        }

        let neighbor_llf = node.llf() + face.normal() * node.size();
        if !self.bounds.contains(neighbor_llf) {
            // Outside the domain on this side; neither coarser nor finer
            // neighbors can exist there either.
            return Vec::new();
        }

        // Same level.
        let candidate = OctantId::new(neighbor_llf, node.level());
        if self.levels[node.level() as usize].contains(&candidate.mcode()) {
            return vec![OctreeNode::from_octant(candidate)];
        }

        // Parent level: mask the candidate's code to the coarser alignment.
        let parent = candidate.parent();
        if self.levels[parent.level() as usize].contains(&parent.mcode()) {
            return vec![OctreeNode::from_octant(parent)];
        }

        // Child level: the four children of the would-be same-level
        // neighbor that touch the shared face.
        if node.level() == 0 {
            missing_neighbor(node, face, &candidate);
        }

        let children = candidate.children();
        let child_level = node.level() - 1;

        let mut neighbors = Vec::with_capacity(4);
        for index in face.neighbor_child_indices() {
            let child = children[index];
            debug_assert_eq!(child.level(), child_level);

            if !self.levels[child_level as usize].contains(&child.mcode()) {
                // A neighbor must exist in a complete tree: the face is
                // interior, and neither the same level nor the parent level
                // held one.
                missing_neighbor(node, face, &child);
            }
            neighbors.push(OctreeNode::from_octant(child));
        }

        neighbors
    }

    /// Validates sortedness, completeness, disjointness and the 2:1 balance
    /// of the stored nodes.
    pub fn check_state(&self) -> OctreeState {
        validation::check_state(self)
    }

    pub(crate) fn linear(&self) -> &LinearOctree {
        &self.linear
    }
}

#[cold]
fn missing_neighbor(node: &OctreeNode, face: Face, expected: &OctantId) -> ! {
    panic!(
        "octree is defect: node {} has no neighbor at face {} although it is not \
         a boundary node there (missing {})",
        node, face, expected
    );
}

impl fmt::Display for Octree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let max_xyz = self.max_xyz();
        write!(
            f,
            "{{ depth: {}, maxXYZ: ({}, {}, {}), numNodes: {} }}",
            self.depth(),
            max_xyz.x,
            max_xyz.y,
            max_xyz.z,
            self.num_nodes()
        )
    }
}
