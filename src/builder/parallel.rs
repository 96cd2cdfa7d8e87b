//! Parallel construction pipeline: partition, build, balance across
//! boundaries, merge.

use rayon::prelude::*;

#[cfg(feature = "timing")]
use std::sync::OnceLock;
#[cfg(feature = "timing")]
use std::time::{Duration, Instant};

use crate::builder::partition::compute_partition;
use crate::builder::ripple::balance_tree;
use crate::builder::subtree::create_balanced_subtree;
use crate::error::OctreeError;
use crate::linear::LinearOctree;
use crate::octant::OctantId;

#[cfg(feature = "timing")]
fn log_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| {
        std::env::var("BALANCED_OCTREE_LOG")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

/// Per-phase wall-clock timings of the parallel build.
#[cfg(feature = "timing")]
#[derive(Debug, Clone, Default)]
pub(crate) struct BuildTimings {
    pub partition: Duration,
    pub subtrees: Duration,
    pub collect_boundary: Duration,
    pub balance_boundary: Duration,
    pub merge: Duration,
}

#[cfg(feature = "timing")]
impl BuildTimings {
    pub fn log(&self) {
        eprintln!(
            "parallel build: partition {:?}, subtrees {:?}, collect {:?}, balance {:?}, merge {:?}",
            self.partition, self.subtrees, self.collect_boundary, self.balance_boundary, self.merge
        );
    }
}

/// The leaves of `block` that touch its boundary without touching the
/// global domain boundary — exactly the leaves that can still be unbalanced
/// against other blocks.
fn collect_boundary_leaves(block: &LinearOctree, global: &LinearOctree) -> Vec<OctantId> {
    block
        .leaves()
        .iter()
        .filter(|leaf| leaf.is_boundary_octant(block, global))
        .copied()
        .collect()
}

fn flatten_blocks(blocks: &[LinearOctree]) -> Vec<OctantId> {
    let num_leaves = blocks.iter().map(|block| block.leaves().len()).sum();

    let mut all_leaves = Vec::with_capacity(num_leaves);
    for block in blocks {
        all_leaves.extend_from_slice(block.leaves());
    }
    all_leaves
}

/// Interleaves the flattened per-block leaves with the balanced boundary
/// tree in one linear pass.
///
/// Wherever the boundary tree holds a leaf whose code matches a block leaf,
/// the boundary tree carries a strictly finer (or identical) tiling of
/// exactly that leaf's cube, so the block leaf is dropped and the boundary
/// run up to the next block leaf is spliced in.
pub(crate) fn merge_with_balanced_boundary(
    flat_leaves: Vec<OctantId>,
    balanced_boundary: &LinearOctree,
) -> LinearOctree {
    let boundary = balanced_boundary.leaves();
    if boundary.is_empty() {
        return LinearOctree::with_leaves(balanced_boundary.root(), flat_leaves);
    }

    let mut merged = Vec::with_capacity(flat_leaves.len() + boundary.len());
    let mut bi = 0;

    for (i, current) in flat_leaves.iter().enumerate() {
        if bi < boundary.len() && boundary[bi].mcode() == current.mcode() {
            debug_assert!(
                boundary[bi] == *current || boundary[bi].is_descendant_of(current),
                "boundary leaf {} does not refine block leaf {}",
                boundary[bi],
                current
            );

            match flat_leaves.get(i + 1) {
                Some(next) => {
                    while bi < boundary.len() && boundary[bi] < *next {
                        merged.push(boundary[bi]);
                        bi += 1;
                    }
                }
                None => {
                    while bi < boundary.len() {
                        merged.push(boundary[bi]);
                        bi += 1;
                    }
                }
            }
        } else {
            merged.push(*current);
        }
    }

    debug_assert_eq!(bi, boundary.len(), "unconsumed boundary leaves");

    LinearOctree::with_leaves(balanced_boundary.root(), merged)
}

/// Builds the complete 2:1-balanced octree over `root` from sorted,
/// deduplicated level-0 seeds.
///
/// The per-block subtree construction and the boundary collection fan out
/// over the current rayon pool (one block per task, dynamic scheduling);
/// everything else is single-threaded. For fixed seeds, thread count and
/// partitioning the result is byte-identical across runs.
pub(crate) fn create_balanced_octree_parallel(
    root: OctantId,
    level_zero_leaves: &[OctantId],
    num_threads: usize,
    max_level: u32,
) -> Result<LinearOctree, OctreeError> {
    #[cfg(feature = "timing")]
    let mut timings = BuildTimings::default();

    #[cfg(feature = "timing")]
    let t = Instant::now();
    let partition = compute_partition(root, level_zero_leaves, num_threads)?;
    #[cfg(feature = "timing")]
    {
        timings.partition = t.elapsed();
    }

    #[cfg(feature = "timing")]
    let t = Instant::now();
    let mut blocks = partition.blocks;
    blocks
        .par_iter_mut()
        .for_each(|block| create_balanced_subtree(block, max_level));
    #[cfg(feature = "timing")]
    {
        timings.subtrees = t.elapsed();
    }

    #[cfg(feature = "timing")]
    let t = Instant::now();
    let global = LinearOctree::new(partition.root);
    let boundary_per_block: Vec<Vec<OctantId>> = blocks
        .par_iter()
        .map(|block| collect_boundary_leaves(block, &global))
        .collect();
    #[cfg(feature = "timing")]
    {
        timings.collect_boundary = t.elapsed();
    }

    #[cfg(feature = "timing")]
    let t = Instant::now();
    // Blocks are disjoint and ordered, so the concatenation is sorted.
    let num_boundary = boundary_per_block.iter().map(Vec::len).sum();
    let mut boundary_tree = LinearOctree::with_capacity(partition.root, num_boundary);
    for boundary_leaves in &boundary_per_block {
        boundary_tree.extend(boundary_leaves.iter().copied());
    }
    debug_assert!(boundary_tree.leaves().windows(2).all(|w| w[0] < w[1]));

    let balanced_boundary = balance_tree(&boundary_tree);
    #[cfg(feature = "timing")]
    {
        timings.balance_boundary = t.elapsed();
    }

    #[cfg(feature = "timing")]
    let t = Instant::now();
    let flat_leaves = flatten_blocks(&blocks);
    let merged = merge_with_balanced_boundary(flat_leaves, &balanced_boundary);
    #[cfg(feature = "timing")]
    {
        timings.merge = t.elapsed();
        if log_enabled() {
            timings.log();
        }
    }

    Ok(merged)
}
