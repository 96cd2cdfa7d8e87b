//! Structural validation of a query octree.
//!
//! Checks sortedness, completeness, disjointness and the 2:1 balance of the
//! stored nodes. Useful for debugging, testing, and catching construction
//! bugs early.

use std::fmt;

use crate::octree::Octree;

/// Verdict of [`check_state`].
///
/// Exactly one defect is reported; the checks run in the order sortedness,
/// tiling (overlap before gap at each step), balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OctreeState {
    /// Sorted, complete, non-overlapping and 2:1 balanced.
    Valid,
    /// The domain is not fully covered (a gap, or a missing first/last
    /// node).
    Incomplete,
    /// Two stored nodes cover the same space.
    Overlapping,
    /// The nodes are not in ascending z-order.
    Unsorted,
    /// A node has a vertex-sharing neighbor more than one level above it.
    Unbalanced,
}

impl fmt::Display for OctreeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OctreeState::Valid => "VALID",
            OctreeState::Incomplete => "INCOMPLETE",
            OctreeState::Overlapping => "OVERLAPPING",
            OctreeState::Unsorted => "UNSORTED",
            OctreeState::Unbalanced => "UNBALANCED",
        };
        f.write_str(name)
    }
}

pub(crate) fn check_state(octree: &Octree) -> OctreeState {
    let linear = octree.linear();
    let leaves = linear.leaves();

    if leaves.is_empty() {
        return OctreeState::Incomplete;
    }

    for pair in leaves.windows(2) {
        if pair[1] <= pair[0] {
            return OctreeState::Unsorted;
        }
    }

    // A complete tiling starts at the root's corner, ends at its last unit
    // cube, and each node starts right after the previous one ends.
    if leaves[0].mcode() != linear.deepest_first_descendant().mcode() {
        return OctreeState::Incomplete;
    }

    for pair in leaves.windows(2) {
        let expected = pair[0].last_descendant_code() + 1;
        if pair[1].mcode() < expected {
            return OctreeState::Overlapping;
        }
        if pair[1].mcode() > expected {
            return OctreeState::Incomplete;
        }
    }

    if leaves.last().unwrap().last_descendant_code()
        != linear.deepest_last_descendant().mcode()
    {
        return OctreeState::Incomplete;
    }

    // Balance: a leaf is unbalanced iff the containing leaf of one of its
    // search keys is an ancestor of the key more than one level above the
    // leaf. Only levels up to depth - 3 can observe such a neighbor.
    let num_levels_to_check = linear.depth().saturating_sub(2);
    for leaf in leaves {
        if leaf.level() >= num_levels_to_check {
            continue;
        }

        for key in leaf.search_keys(linear) {
            let Some(candidate) = linear.maximum_lower_bound(&key) else {
                continue;
            };
            if key.is_descendant_of(&candidate) && candidate.level() > leaf.level() + 1 {
                return OctreeState::Unbalanced;
            }
        }
    }

    OctreeState::Valid
}
