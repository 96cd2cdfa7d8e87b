//! Octant identity: Morton code plus level.

use std::fmt;

use glam::IVec3;

use crate::linear::LinearOctree;
use crate::morton;
use crate::types::MortonCode;

/// Uniquely identifies an octant — an axis-aligned cube whose side is
/// `2^level` and whose corner is aligned to that side on every axis.
///
/// The code and the level together form the identity; the code alone is
/// ambiguous because an octant and its first child share a corner.
///
/// `OctantId` carries a total order with the property that an octant
/// precedes all of its descendants, and the descendants of a common
/// ancestor form a contiguous run. Sorting a complete set of leaves by
/// this order yields the z-order space-filling curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct OctantId {
    mcode: MortonCode,
    level: u32,
}

/// The 26 unit offsets of the Moore neighborhood, z fastest.
const NEIGHBOR_OFFSETS: [IVec3; 26] = [
    IVec3::new(-1, -1, -1),
    IVec3::new(0, -1, -1),
    IVec3::new(1, -1, -1),
    IVec3::new(-1, 0, -1),
    IVec3::new(0, 0, -1),
    IVec3::new(1, 0, -1),
    IVec3::new(-1, 1, -1),
    IVec3::new(0, 1, -1),
    IVec3::new(1, 1, -1),
    IVec3::new(-1, -1, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(1, -1, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(1, 0, 0),
    IVec3::new(-1, 1, 0),
    IVec3::new(0, 1, 0),
    IVec3::new(1, 1, 0),
    IVec3::new(-1, -1, 1),
    IVec3::new(0, -1, 1),
    IVec3::new(1, -1, 1),
    IVec3::new(-1, 0, 1),
    IVec3::new(0, 0, 1),
    IVec3::new(1, 0, 1),
    IVec3::new(-1, 1, 1),
    IVec3::new(0, 1, 1),
    IVec3::new(1, 1, 1),
];

/// Offsets from the search corner to the LLFs of the eight unit cubes
/// touching it.
const SEARCH_CORNER_OFFSETS: [IVec3; 8] = [
    IVec3::new(0, 0, 0),
    IVec3::new(-1, 0, 0),
    IVec3::new(0, -1, 0),
    IVec3::new(-1, -1, 0),
    IVec3::new(0, 0, -1),
    IVec3::new(-1, 0, -1),
    IVec3::new(0, -1, -1),
    IVec3::new(-1, -1, -1),
];

impl OctantId {
    #[inline]
    pub fn new(coord: IVec3, level: u32) -> Self {
        Self {
            mcode: morton::encode(coord),
            level,
        }
    }

    #[inline]
    pub fn from_code(mcode: MortonCode, level: u32) -> Self {
        debug_assert_eq!(
            mcode,
            mcode & morton::level_mask(level),
            "octant code not aligned to its level"
        );
        Self { mcode, level }
    }

    #[inline]
    pub fn mcode(&self) -> MortonCode {
        self.mcode
    }

    #[inline]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Lower-left-front corner of the octant.
    #[inline]
    pub fn coord(&self) -> IVec3 {
        morton::decode(self.mcode)
    }

    /// Side length of the octant.
    #[inline]
    pub fn size(&self) -> i32 {
        morton::octant_size_for_level(self.level)
    }

    /// The octant one level up that contains this octant.
    #[inline]
    pub fn parent(&self) -> OctantId {
        OctantId {
            mcode: morton::parent_code(self.mcode, self.level),
            level: self.level + 1,
        }
    }

    /// The ancestor (self, parent, grandparent, ...) at `level`.
    ///
    /// Panics if `level` is below this octant's level.
    #[inline]
    pub fn ancestor_at_level(&self, level: u32) -> OctantId {
        OctantId {
            mcode: morton::ancestor_code(self.mcode, self.level, level),
            level,
        }
    }

    /// The eight direct children, in canonical z-minor order
    /// (0,0,0), (0,0,1), (0,1,0), (0,1,1), (1,0,0), (1,0,1), (1,1,0), (1,1,1).
    ///
    /// Panics on a level-0 octant.
    pub fn children(&self) -> [OctantId; 8] {
        let codes = morton::children_codes(self.mcode, self.level);
        let child_level = self.level - 1;
        codes.map(|mcode| OctantId {
            mcode,
            level: child_level,
        })
    }

    /// True iff this octant is a proper descendant of `possible_ancestor`.
    #[inline]
    pub fn is_descendant_of(&self, possible_ancestor: &OctantId) -> bool {
        morton::is_descendant(
            self.mcode,
            self.level,
            possible_ancestor.mcode,
            possible_ancestor.level,
        )
    }

    /// Code of the greatest level-0 octant contained in this octant.
    #[inline]
    pub fn last_descendant_code(&self) -> MortonCode {
        morton::last_descendant_code(self.mcode, self.level)
    }

    /// The corner this octant shares with none of its siblings.
    #[inline]
    pub fn search_corner(&self) -> IVec3 {
        morton::search_corner(self.mcode, self.level)
    }

    /// The same-level octants sharing at least one vertex with this octant
    /// that lie inside the bounds of `octree`. At most 26.
    pub fn potential_neighbors(&self, octree: &LinearOctree) -> Vec<OctantId> {
        self.neighbors_impl(octree, false)
    }

    /// Same as [`potential_neighbors`](Self::potential_neighbors) but
    /// excluding octants with the same parent. At most 19.
    pub fn potential_neighbors_without_siblings(&self, octree: &LinearOctree) -> Vec<OctantId> {
        self.neighbors_impl(octree, true)
    }

    fn neighbors_impl(&self, octree: &LinearOctree, skip_siblings: bool) -> Vec<OctantId> {
        if !octree.inside_tree_bounds(self) {
            return Vec::new();
        }

        let size = self.size();
        let llf = self.coord();
        let parent = if skip_siblings {
            Some(self.parent())
        } else {
            None
        };

        let mut result = Vec::with_capacity(26);
        for offset in NEIGHBOR_OFFSETS {
            let neighbor_llf = llf + offset * size;
            if !morton::fits_in_morton_code(neighbor_llf) {
                continue;
            }

            let neighbor = OctantId::new(neighbor_llf, self.level);
            if !octree.inside_tree_bounds(&neighbor) {
                continue;
            }
            if let Some(parent) = parent {
                if neighbor.parent() == parent {
                    continue;
                }
            }
            result.push(neighbor);
        }

        result
    }

    /// True iff this octant touches the boundary of `block` without
    /// touching the boundary of `global` on that same side.
    ///
    /// Leaves with this property are the only ones that can violate the 2:1
    /// balance against a neighboring block.
    pub fn is_boundary_octant(&self, block: &LinearOctree, global: &LinearOctree) -> bool {
        debug_assert!(global.inside_tree_bounds(&block.root()) && block.inside_tree_bounds(self));

        let size = self.size();
        let llf = self.coord();
        let urb = llf + IVec3::splat(size);

        let block_llf = block.root().coord();
        let block_urb = block_llf + IVec3::splat(block.root().size());
        let global_llf = global.root().coord();
        let global_urb = global_llf + IVec3::splat(global.root().size());

        for axis in 0..3 {
            if llf[axis] == block_llf[axis] && llf[axis] != global_llf[axis] {
                return true;
            }
            if urb[axis] == block_urb[axis] && urb[axis] != global_urb[axis] {
                return true;
            }
        }

        false
    }

    /// The level-0 octants whose ancestors could violate the 2:1 balance
    /// with respect to this octant: the unit cubes of the 2x2x2 block around
    /// the search corner, minus this octant and its descendants, filtered to
    /// the bounds of `octree`. At most 7.
    pub fn search_keys(&self, octree: &LinearOctree) -> Vec<OctantId> {
        let corner = self.search_corner();

        let mut keys = Vec::with_capacity(7);
        for offset in SEARCH_CORNER_OFFSETS {
            let key_llf = corner + offset;
            if !morton::fits_in_morton_code(key_llf) {
                continue;
            }

            let key = OctantId::new(key_llf, 0);
            if key != *self && octree.inside_tree_bounds(&key) && !key.is_descendant_of(self) {
                keys.push(key);
            }
        }

        keys
    }
}

// Code ascending; on ties the deeper octant (larger level) comes first so
// that every octant precedes its descendants.
impl Ord for OctantId {
    #[inline]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.mcode
            .cmp(&other.mcode)
            .then_with(|| other.level.cmp(&self.level))
    }
}

impl PartialOrd for OctantId {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for OctantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let llf = self.coord();
        write!(
            f,
            "{{ mcode: {}, llf: ({}, {}, {}), level: {} }}",
            self.mcode, llf.x, llf.y, llf.z, self.level
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(coord: (i32, i32, i32), level: u32) -> OctantId {
        OctantId::new(IVec3::new(coord.0, coord.1, coord.2), level)
    }

    #[test]
    fn test_order_ancestors_first() {
        assert!(OctantId::from_code(0, 1) < OctantId::from_code(0, 0));
        assert!(OctantId::from_code(0, 0) < OctantId::from_code(1, 0));
        assert!(OctantId::from_code(0, 2) < OctantId::from_code(8, 1));

        let root = OctantId::from_code(0, 3);
        for code in 0..512 {
            assert!(root <= OctantId::from_code(code, 0));
        }
    }

    #[test]
    fn test_parent_and_children_roundtrip() {
        let octant = id((4, 2, 6), 1);
        let parent = octant.parent();
        assert_eq!(parent.level(), 2);

        let children = parent.children();
        assert!(children.contains(&octant));
        for child in children {
            assert_eq!(child.parent(), parent);
            assert!(child.is_descendant_of(&parent));
        }
    }

    #[test]
    fn test_children_tile_parent() {
        let parent = id((4, 4, 0), 2);
        let children = parent.children();

        let mut codes: Vec<MortonCode> = children.iter().map(|c| c.mcode()).collect();
        codes.sort_unstable();
        for (i, &code) in codes.iter().enumerate() {
            assert_eq!(code, parent.mcode() + (i as u64) * 8);
        }
        assert_eq!(
            children[7].last_descendant_code(),
            parent.last_descendant_code()
        );
    }

    #[test]
    fn test_ancestor_contains_self() {
        let octant = id((5, 2, 0), 0);
        for level in 1..=3 {
            let ancestor = octant.ancestor_at_level(level);
            assert!(octant.is_descendant_of(&ancestor));
        }
        assert_eq!(octant.ancestor_at_level(0), octant);
    }

    #[test]
    fn test_potential_neighbors_interior() {
        let octree = LinearOctree::new(OctantId::from_code(0, 2));

        let center = id((1, 1, 1), 0);
        let neighbors = center.potential_neighbors(&octree);
        assert_eq!(neighbors.len(), 26);

        // Every neighbor shares at least a vertex: coordinates differ by
        // exactly the size on some axes and match on the rest.
        for n in &neighbors {
            let delta = (n.coord() - center.coord()).abs();
            assert!(delta.max_element() == 1 && *n != center);
        }
    }

    #[test]
    fn test_potential_neighbors_at_corner() {
        let octree = LinearOctree::new(OctantId::from_code(0, 2));

        assert_eq!(id((0, 0, 0), 0).potential_neighbors(&octree).len(), 7);
        assert_eq!(id((3, 3, 3), 0).potential_neighbors(&octree).len(), 7);
        assert_eq!(id((2, 2, 2), 1).potential_neighbors(&octree).len(), 7);
    }

    #[test]
    fn test_neighbors_without_siblings() {
        let octree = LinearOctree::new(OctantId::from_code(0, 3));

        let octant = id((3, 3, 3), 0);
        let all = octant.potential_neighbors(&octree);
        let without = octant.potential_neighbors_without_siblings(&octree);

        assert_eq!(all.len(), 26);
        assert_eq!(without.len(), 19);
        for n in &without {
            assert_ne!(n.parent(), octant.parent());
            assert!(all.contains(n));
        }
    }

    #[test]
    fn test_outside_octant_has_no_neighbors() {
        let octree = LinearOctree::new(OctantId::from_code(0, 1));
        assert!(id((4, 0, 0), 0).potential_neighbors(&octree).is_empty());
    }

    #[test]
    fn test_is_boundary_octant() {
        let global = LinearOctree::new(OctantId::from_code(0, 3));
        let block = LinearOctree::new(id((4, 0, 0), 2));

        // Touches the block's low-x face, which is interior to the domain.
        assert!(id((4, 0, 0), 0).is_boundary_octant(&block, &global));
        assert!(id((4, 2, 2), 1).is_boundary_octant(&block, &global));

        // The block's high-x face coincides with the domain edge, and the
        // low y/z faces with the domain corner: not a boundary octant.
        assert!(!id((6, 0, 0), 1).is_boundary_octant(&block, &global));
        assert!(!id((6, 0, 0), 0).is_boundary_octant(&block, &global));

        // Touches the block's high-y face at y=4, interior to the domain.
        assert!(id((5, 3, 1), 0).is_boundary_octant(&block, &global));
    }

    #[test]
    fn test_search_keys_fixtures() {
        let octree = LinearOctree::new(OctantId::from_code(0, 4));

        // All keys of the lower-left-front octant fall outside the domain.
        assert!(id((0, 0, 0), 0).search_keys(&octree).is_empty());
        assert!(id((0, 0, 0), 4)
            .search_keys(&LinearOctree::new(OctantId::from_code(0, 5)))
            .is_empty());

        assert_eq!(
            id((1, 0, 0), 0).search_keys(&octree),
            vec![id((2, 0, 0), 0)]
        );
        assert_eq!(
            id((0, 1, 0), 0).search_keys(&octree),
            vec![id((0, 2, 0), 0)]
        );
        assert_eq!(
            id((0, 0, 1), 0).search_keys(&octree),
            vec![id((0, 0, 2), 0)]
        );

        let keys = id((1, 0, 1), 0).search_keys(&octree);
        assert_eq!(keys.len(), 3);
        for expected in [id((2, 0, 1), 0), id((2, 0, 2), 0), id((1, 0, 2), 0)] {
            assert!(keys.contains(&expected));
        }

        let keys = id((1, 1, 1), 0).search_keys(&octree);
        assert_eq!(keys.len(), 7);

        let keys = id((4, 4, 2), 1).search_keys(&octree);
        assert_eq!(keys.len(), 7);
        for expected in [
            id((3, 4, 4), 0),
            id((4, 3, 4), 0),
            id((4, 4, 4), 0),
            id((3, 3, 4), 0),
            id((3, 4, 3), 0),
            id((4, 3, 3), 0),
            id((3, 3, 3), 0),
        ] {
            assert!(keys.contains(&expected));
        }

        // The search corner of (4,4,4) at level 1 points back into the
        // origin octant; its own corner cube is excluded as a descendant.
        let keys = id((4, 4, 4), 1).search_keys(&octree);
        assert_eq!(keys.len(), 7);
        assert!(keys.contains(&id((3, 3, 3), 0)));
        assert!(!keys.contains(&id((4, 4, 4), 0)));

        // Upper-right-back octants have no keys inside the domain.
        assert!(id((8, 8, 8), 3).search_keys(&octree).is_empty());
        assert!(id((12, 12, 12), 2).search_keys(&octree).is_empty());
        assert!(id((14, 14, 14), 1).search_keys(&octree).is_empty());
        assert!(id((15, 15, 15), 0).search_keys(&octree).is_empty());
    }
}
