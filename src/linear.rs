//! Linear octree: a flat, sorted bag of octants with deferred bulk mutation.
//!
//! The container holds an append-only leaf list plus a tombstone set. Bulk
//! replace operations cost O(1) per call; a single
//! [`sort_and_compact`](LinearOctree::sort_and_compact) applies the pending
//! removals and restores the z-order with one stable parallel sort.

use rayon::prelude::*;
use rustc_hash::FxHashSet;

use crate::octant::OctantId;

/// A list of octants inside the bounds of a root octant.
///
/// Usually only leaves are stored, but the container itself does not
/// enforce that. The binary-search queries ([`has_leaf`](Self::has_leaf),
/// [`maximum_lower_bound`](Self::maximum_lower_bound)) require a prior
/// [`sort_and_compact`](Self::sort_and_compact) with no mutation in between.
#[derive(Debug, Clone)]
pub(crate) struct LinearOctree {
    root: OctantId,
    deepest_last: OctantId,
    leaves: Vec<OctantId>,
    pending_removals: FxHashSet<OctantId>,
}

impl LinearOctree {
    pub fn new(root: OctantId) -> Self {
        Self::with_leaves(root, Vec::new())
    }

    pub fn with_capacity(root: OctantId, capacity: usize) -> Self {
        Self::with_leaves(root, Vec::with_capacity(capacity))
    }

    pub fn with_leaves(root: OctantId, leaves: Vec<OctantId>) -> Self {
        let deepest_last = OctantId::from_code(root.last_descendant_code(), 0);
        Self {
            root,
            deepest_last,
            leaves,
            pending_removals: FxHashSet::default(),
        }
    }

    /// The root octant. Defines the bounds: every stored octant is a
    /// descendant of the root (or the root itself).
    #[inline]
    pub fn root(&self) -> OctantId {
        self.root
    }

    /// Distance from the root to level 0.
    #[inline]
    pub fn depth(&self) -> u32 {
        self.root.level()
    }

    #[inline]
    pub fn leaves(&self) -> &[OctantId] {
        &self.leaves
    }

    /// The level-0 octant at the root's corner (minimal octant in bounds).
    #[inline]
    pub fn deepest_first_descendant(&self) -> OctantId {
        OctantId::from_code(self.root.mcode(), 0)
    }

    /// The level-0 octant with the maximal id inside the bounds.
    #[inline]
    pub fn deepest_last_descendant(&self) -> OctantId {
        self.deepest_last
    }

    /// True iff `octant` lies between the deepest first and deepest last
    /// descendants in the total order, i.e. inside the root's domain.
    #[inline]
    pub fn inside_tree_bounds(&self, octant: &OctantId) -> bool {
        *octant >= self.root && *octant <= self.deepest_last
    }

    /// Appends `octant` to the leaf list.
    ///
    /// Panics if `octant` is outside the tree bounds. Duplicates are not
    /// permitted (checked only in debug builds).
    pub fn insert(&mut self, octant: OctantId) {
        assert!(
            self.inside_tree_bounds(&octant),
            "insert: octant {} out of bounds of root {}",
            octant,
            self.root
        );
        debug_assert!(
            !self.leaves.contains(&octant),
            "insert: duplicate octant {}",
            octant
        );
        self.leaves.push(octant);
    }

    /// Appends every octant of `iter`, bounds-checked.
    pub fn extend<I: IntoIterator<Item = OctantId>>(&mut self, iter: I) {
        for octant in iter {
            assert!(
                self.inside_tree_bounds(&octant),
                "extend: octant {} out of bounds of root {}",
                octant,
                self.root
            );
            self.leaves.push(octant);
        }
    }

    /// Marks `octant` for removal and appends its eight children.
    ///
    /// The octant is only tombstoned; it stays in [`leaves`](Self::leaves)
    /// until the next compaction. A second call for the same octant before
    /// compaction is a no-op. The octant does not have to be present.
    pub fn replace_with_children(&mut self, octant: OctantId) -> [OctantId; 8] {
        let children = octant.children();
        self.replace_with_subtree(octant, &children);
        children
    }

    /// Marks `octant` for removal and appends `subtree` in its place.
    ///
    /// Every octant of `subtree` should be a descendant of `octant`
    /// (not checked). Idempotent until the next compaction; the octant does
    /// not have to be present.
    pub fn replace_with_subtree(&mut self, octant: OctantId, subtree: &[OctantId]) {
        assert!(
            self.inside_tree_bounds(&octant),
            "replace_with_subtree: octant {} out of bounds of root {}",
            octant,
            self.root
        );

        if self.pending_removals.insert(octant) {
            self.leaves.extend_from_slice(subtree);
        }
    }

    /// Checks whether the exact `(code, level)` pair is stored.
    ///
    /// Requires a compacted tree.
    pub fn has_leaf(&self, octant: &OctantId) -> bool {
        if !self.inside_tree_bounds(octant) {
            return false;
        }

        self.leaves.binary_search(octant).is_ok()
    }

    /// The greatest stored octant strictly less than `octant`, or `None` if
    /// every stored octant is at or above it.
    ///
    /// Requires a compacted tree. Used to locate the leaf whose subtree a
    /// level-0 search key falls within.
    pub fn maximum_lower_bound(&self, octant: &OctantId) -> Option<OctantId> {
        let idx = self.leaves.partition_point(|leaf| leaf < octant);
        if idx == 0 {
            None
        } else {
            Some(self.leaves[idx - 1])
        }
    }

    /// Applies pending removals and restores sorted order.
    pub fn sort_and_compact(&mut self) {
        if !self.pending_removals.is_empty() {
            let pending = &self.pending_removals;
            self.leaves.retain(|octant| !pending.contains(octant));
            self.pending_removals.clear();
        }

        self.leaves.par_sort();
    }

    /// Hands the leaf list to the caller, consuming the tree.
    pub fn into_leaves(self) -> Vec<OctantId> {
        self.leaves
    }
}
