//! Bottom-up construction of a 2:1-balanced complete subtree.

use glam::IVec3;
use rustc_hash::FxHashSet;

use crate::linear::LinearOctree;
use crate::morton;
use crate::octant::OctantId;

/// Grows `tree` from its level-0 leaves into a complete subtree of its root
/// in which any two leaves sharing a vertex differ in level by at most one.
///
/// Works level by level: the parents of all non-empty octants are completed
/// with their missing children, and "guard" octants one level up are planted
/// around each new parent so that the level difference of one is enforced
/// across the parent's whole vertex neighborhood. Either a guard itself or
/// its children end up in the final tree.
///
/// `max_level` caps the size of fill octants; when the cap binds, the space
/// not reached by the bottom-up growth is tiled with a grid of
/// `2^max_level` octants (and the result may be unbalanced at the cap).
/// An empty tree becomes its root as the single leaf.
pub(crate) fn create_balanced_subtree(tree: &mut LinearOctree, max_level: u32) {
    if tree.leaves().is_empty() {
        let root = tree.root();
        tree.insert(root);
        return;
    }

    let mut non_empty: FxHashSet<OctantId> =
        FxHashSet::with_capacity_and_hasher(tree.leaves().len(), Default::default());
    for leaf in tree.leaves() {
        debug_assert_eq!(leaf.level(), 0, "subtree seeds must be level-0 octants");
        non_empty.insert(*leaf);
    }

    let max_level = max_level.min(tree.depth());

    for current_level in 0..max_level {
        let mut non_empty_parents = FxHashSet::default();

        // Octants of the next level that must exist (themselves or their
        // children) to keep a level difference of one across every shared
        // vertex of the new parents.
        let mut guard_parents = FxHashSet::default();

        for node in &non_empty {
            let parent = node.parent();
            if !non_empty_parents.insert(parent) {
                continue;
            }

            // Complete the parent with the siblings of this octant. Other
            // non-empty octants are represented by their own children.
            for child in parent.children() {
                if child != *node && !non_empty.contains(&child) {
                    tree.insert(child);
                }
            }

            // Siblings of the parent are completed in the next iteration
            // anyway, so only the 19 non-sibling neighbors need guards.
            if current_level + 1 < max_level {
                for guard in parent.potential_neighbors_without_siblings(tree) {
                    guard_parents.insert(guard);
                }
            }
        }

        for guard in guard_parents {
            // A guard already among the non-empty parents is represented by
            // its children; any other becomes a leaf and takes part in the
            // next iteration.
            if non_empty_parents.insert(guard) {
                tree.insert(guard);
            }
        }

        non_empty = non_empty_parents;
    }

    if max_level != tree.depth() {
        // The cap is binding: tile the rest of the domain with octants of
        // the capped size.
        let node_size = morton::octant_size_for_level(max_level);
        let side = morton::octant_size_for_level(tree.depth());
        let base = tree.root().coord();

        for x in (0..side).step_by(node_size as usize) {
            for y in (0..side).step_by(node_size as usize) {
                for z in (0..side).step_by(node_size as usize) {
                    let octant = OctantId::new(base + IVec3::new(x, y, z), max_level);
                    if !non_empty.contains(&octant) {
                        tree.insert(octant);
                    }
                }
            }
        }
    }

    tree.sort_and_compact();
}

/// Convenience wrapper: builds the balanced subtree of `root` over a set of
/// level-0 leaves.
pub(crate) fn create_balanced_subtree_from(
    root: OctantId,
    level_zero_leaves: Vec<OctantId>,
    max_level: u32,
) -> LinearOctree {
    let mut tree = LinearOctree::with_leaves(root, level_zero_leaves);
    create_balanced_subtree(&mut tree, max_level);
    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(code: u64, level: u32) -> OctantId {
        OctantId::from_code(code, level)
    }

    fn at(coord: (i32, i32, i32), level: u32) -> OctantId {
        OctantId::new(IVec3::new(coord.0, coord.1, coord.2), level)
    }

    #[test]
    fn test_no_leaves_yields_root_leaf() {
        for root in [id(0, 0), id(0, 4), at((2, 2, 2), 1)] {
            let tree = create_balanced_subtree_from(root, Vec::new(), u32::MAX);
            assert_eq!(tree.leaves(), &[root]);
        }
    }

    #[test]
    fn test_single_seed_at_origin() {
        let tree = create_balanced_subtree_from(id(0, 4), vec![id(0, 0)], u32::MAX);

        assert_eq!(tree.leaves().len(), 29);

        for x in 0..2 {
            for y in 0..2 {
                for z in 0..2 {
                    let c = (x, y, z);
                    assert!(tree.leaves().contains(&at(c, 0)));
                    if c != (0, 0, 0) {
                        assert!(tree.leaves().contains(&at((x * 2, y * 2, z * 2), 1)));
                        assert!(tree.leaves().contains(&at((x * 4, y * 4, z * 4), 2)));
                        assert!(tree.leaves().contains(&at((x * 8, y * 8, z * 8), 3)));
                    }
                }
            }
        }
    }

    #[test]
    fn test_single_seed_offset_root() {
        let root = at((16, 0, 0), 4);
        let tree = create_balanced_subtree_from(root, vec![at((16, 0, 0), 0)], u32::MAX);

        assert_eq!(tree.leaves().len(), 29);

        for x in 0..2 {
            for y in 0..2 {
                for z in 0..2 {
                    assert!(tree.leaves().contains(&at((16 + x, y, z), 0)));
                    if (x, y, z) != (0, 0, 0) {
                        assert!(tree
                            .leaves()
                            .contains(&at((16 + x * 2, y * 2, z * 2), 1)));
                        assert!(tree
                            .leaves()
                            .contains(&at((16 + x * 4, y * 4, z * 4), 2)));
                        assert!(tree
                            .leaves()
                            .contains(&at((16 + x * 8, y * 8, z * 8), 3)));
                    }
                }
            }
        }
    }

    #[test]
    fn test_result_is_sorted_and_tiles_root() {
        let tree =
            create_balanced_subtree_from(id(0, 3), vec![at((5, 2, 0), 0)], u32::MAX);

        let leaves = tree.leaves();
        let mut next_code = 0;
        for leaf in leaves {
            assert_eq!(leaf.mcode(), next_code, "gap or overlap at {}", leaf);
            next_code = leaf.last_descendant_code() + 1;
        }
        assert_eq!(next_code, tree.root().last_descendant_code() + 1);
    }

    #[test]
    fn test_capped_level_tiles_with_grid() {
        let tree = create_balanced_subtree_from(id(0, 3), vec![at((5, 2, 0), 0)], 1);

        // 8 unit leaves in the seed's parent; the remaining 63 grid cells of
        // size 2 tile the rest of the 8^3 domain.
        assert_eq!(tree.leaves().len(), 71);
        assert!(tree.leaves().iter().all(|l| l.level() <= 1));

        let mut next_code = 0;
        for leaf in tree.leaves() {
            assert_eq!(leaf.mcode(), next_code);
            next_code = leaf.last_descendant_code() + 1;
        }
        assert_eq!(next_code, 512);
    }

    #[test]
    fn test_cap_at_zero_refines_everything() {
        let tree = create_balanced_subtree_from(id(0, 2), vec![at((1, 1, 1), 0)], 0);

        assert_eq!(tree.leaves().len(), 64);
        assert!(tree.leaves().iter().all(|l| l.level() == 0));
    }
}
