//! 2:1 balancing of an existing (possibly incomplete) linear octree.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::builder::region::complete_subtree;
use crate::linear::LinearOctree;
use crate::octant::OctantId;

/// Splits every octant that violates the 2:1 balance against a coarser
/// vertex-sharing neighbor, propagating splits upward level by level
/// ("ripple propagation").
///
/// The input must be sorted. It does not have to be complete, but it must
/// contain every unbalanced octant and every octant that balancing their
/// neighborhood can affect. The result is an equivalent octree in which no
/// leaf has a vertex-sharing ancestor-neighbor more than one level above it.
pub(crate) fn balance_tree(octree: &LinearOctree) -> LinearOctree {
    // A tree of depth 2 only has leaves of level 0 and 1.
    if octree.depth() < 3 {
        return octree.clone();
    }

    let mut result = octree.clone();

    // Only leaves up to depth - 3 can see a neighbor more than one level
    // above them (the maximum leaf level is depth - 1).
    let num_levels_to_check = octree.depth() - 2;

    let mut octants_per_level: Vec<Vec<OctantId>> =
        vec![Vec::new(); num_levels_to_check as usize];
    for leaf in octree.leaves() {
        if leaf.level() < num_levels_to_check {
            octants_per_level[leaf.level() as usize].push(*leaf);
        }
    }

    for current_level in 0..num_levels_to_check {
        // Offenders found while scanning this level, with the search keys
        // that reached them. The keys decide where the offender's subtree
        // must be refined down to current_level + 1.
        let mut unbalanced_nodes: FxHashMap<OctantId, FxHashSet<OctantId>> = FxHashMap::default();

        for octant in &octants_per_level[current_level as usize] {
            debug_assert_eq!(octant.level(), current_level);

            for search_key in octant.search_keys(octree) {
                let Some(candidate) = result.maximum_lower_bound(&search_key) else {
                    continue;
                };

                debug_assert!(candidate < search_key);
                if candidate.level() <= current_level + 1
                    || !search_key.is_descendant_of(&candidate)
                {
                    // Either already balanced or some other leaf lies
                    // between the key and the candidate and isolates it.
                    continue;
                }

                unbalanced_nodes.entry(candidate).or_default().insert(search_key);
            }
        }

        if unbalanced_nodes.is_empty() {
            continue;
        }

        for (unbalanced, keys) in &unbalanced_nodes {
            let subtree = complete_subtree(unbalanced, current_level + 1, keys);

            result.replace_with_subtree(*unbalanced, &subtree);

            for subtree_octant in subtree {
                if subtree_octant.level() > current_level
                    && subtree_octant.level() < num_levels_to_check
                {
                    octants_per_level[subtree_octant.level() as usize].push(subtree_octant);
                }
            }
        }

        result.sort_and_compact();
    }

    result
}
