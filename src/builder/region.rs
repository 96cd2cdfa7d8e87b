//! Region and subtree completion on the z-order curve.

use rustc_hash::FxHashSet;

use crate::linear::LinearOctree;
use crate::morton;
use crate::octant::OctantId;

/// The octant of minimal level that contains both `a` and `b`.
pub(crate) fn nearest_common_ancestor(a: &OctantId, b: &OctantId) -> OctantId {
    let (mcode, level) =
        morton::nearest_common_ancestor(a.mcode(), b.mcode(), a.level(), b.level());
    OctantId::from_code(mcode, level)
}

/// All octants strictly between `start` and `end` at their maximum possible
/// level, in sorted order: for each emitted octant O, `start < O < end` and
/// O contains neither endpoint.
///
/// Returns an empty list for `start == end`. Panics if `start > end`.
pub(crate) fn complete_region(start: &OctantId, end: &OctantId) -> Vec<OctantId> {
    assert!(
        start <= end,
        "complete_region: start {} is greater than end {}",
        start,
        end
    );
    if start == end {
        return Vec::new();
    }

    let root = nearest_common_ancestor(start, end);
    let mut result = LinearOctree::new(root);

    // Descend from the root's children: emit candidates that fit strictly
    // between the endpoints, recurse into candidates containing either one.
    let mut candidates: Vec<OctantId> = root.children().to_vec();
    while !candidates.is_empty() {
        let mut finer = Vec::with_capacity(8 * candidates.len());

        for candidate in candidates {
            if *start < candidate && candidate < *end && !end.is_descendant_of(&candidate) {
                result.insert(candidate);
            } else if end.is_descendant_of(&candidate) || start.is_descendant_of(&candidate) {
                finer.extend_from_slice(&candidate.children());
            }
        }

        candidates = finer;
    }

    result.sort_and_compact();
    result.into_leaves()
}

/// The minimal complete subtree of `root` whose level-`lowest_level` leaves
/// include the ancestors of every key, built by repeated sibling completion.
///
/// Keys must be level-0 octants inside `root`. The result tiles `root`
/// exactly and is unsorted. Panics if `lowest_level` equals the root level
/// or no keys are given.
pub(crate) fn complete_subtree(
    root: &OctantId,
    lowest_level: u32,
    keys: &FxHashSet<OctantId>,
) -> Vec<OctantId> {
    assert!(
        root.level() != lowest_level && !keys.is_empty(),
        "complete_subtree: empty subtree (lowest level {} at root {}, {} keys)",
        lowest_level,
        root,
        keys.len()
    );

    if root.level() == lowest_level + 1 {
        return root.children().to_vec();
    }

    let mut result = Vec::new();

    let mut current_level_leaves = FxHashSet::default();
    for key in keys {
        debug_assert_eq!(key.level(), 0);

        let leaf = key.ancestor_at_level(lowest_level);
        if current_level_leaves.insert(leaf) {
            result.push(leaf);
        }
    }

    for _ in lowest_level..root.level() {
        let mut current_level_parents = FxHashSet::default();

        for leaf in &current_level_leaves {
            let parent = leaf.parent();
            if !current_level_parents.insert(parent) {
                continue;
            }

            for child in parent.children() {
                if !current_level_leaves.contains(&child) {
                    result.push(child);
                }
            }
        }

        current_level_leaves = current_level_parents;
    }

    result
}
