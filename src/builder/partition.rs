//! Partitioning of sorted seeds into contiguous blocks for parallel work.

use crate::builder::region::{complete_region, nearest_common_ancestor};
use crate::error::OctreeError;
use crate::linear::LinearOctree;
use crate::octant::OctantId;

/// A partition of an octree domain into non-overlapping subtrees, each
/// owning a contiguous range of the sorted level-0 seeds.
pub(crate) struct Partition {
    pub root: OctantId,
    pub blocks: Vec<LinearOctree>,
}

/// Splits the sorted, deduplicated `level_zero_leaves` into blocks so that
/// the construction effort is spread over `num_threads` workers while the
/// partition boundaries stay as coarse as possible.
///
/// Each returned block contains the seeds inside its bounds. When there are
/// too few seeds to be worth splitting, a single block rooted at
/// `global_root` owns them all.
pub(crate) fn compute_partition(
    global_root: OctantId,
    level_zero_leaves: &[OctantId],
    num_threads: usize,
) -> Result<Partition, OctreeError> {
    if level_zero_leaves.is_empty() {
        return Err(OctreeError::InvalidArgument(
            "no level zero leaves".to_string(),
        ));
    }

    debug_assert!(
        level_zero_leaves.first() <= level_zero_leaves.last(),
        "seeds must be sorted"
    );

    let leaves_per_thread = level_zero_leaves.len() / num_threads.max(1);

    let mut completed_regions = Vec::new();
    if leaves_per_thread > 2 {
        completed_regions.reserve(num_threads);

        for t in 0..num_threads {
            let start = t * leaves_per_thread;
            let end = if t < num_threads - 1 {
                (t + 1) * leaves_per_thread
            } else {
                level_zero_leaves.len()
            } - 1;

            let region = complete_region(&level_zero_leaves[start], &level_zero_leaves[end]);
            if !region.is_empty() {
                completed_regions.push(region);
            }
        }
    }

    let block_tree = compute_blocks_from_regions(global_root, completed_regions);

    if block_tree.leaves().is_empty() {
        let blocks = vec![LinearOctree::with_leaves(
            global_root,
            level_zero_leaves.to_vec(),
        )];
        return Ok(Partition {
            root: global_root,
            blocks,
        });
    }

    let mut blocks: Vec<LinearOctree> = block_tree
        .leaves()
        .iter()
        .map(|block| LinearOctree::new(*block))
        .collect();

    // Both the blocks and the seeds are sorted, so one monotonic scan
    // assigns every seed to its block.
    let mut block_iter = blocks.iter_mut().peekable();
    for leaf in level_zero_leaves {
        while let Some(block) = block_iter.peek_mut() {
            if block.inside_tree_bounds(leaf) {
                block.insert(*leaf);
                break;
            }
            block_iter.next();
        }

        if block_iter.peek().is_none() {
            // Either a bug or the seeds were not sorted.
            return Err(OctreeError::InvariantViolation(format!(
                "no block found for level zero leaf {}",
                leaf
            )));
        }
    }

    Ok(Partition {
        root: global_root,
        blocks,
    })
}

/// Builds the global block tree from per-group completed regions: keeps only
/// each region's coarsest octants as candidate block boundaries and fills
/// the gaps between consecutive candidates (and toward the domain's first
/// and last corners) with octants that are as coarse as possible.
pub(crate) fn compute_blocks_from_regions(
    global_root: OctantId,
    mut completed_regions: Vec<Vec<OctantId>>,
) -> LinearOctree {
    let mut result = LinearOctree::new(global_root);

    if completed_regions.is_empty() {
        return result;
    }

    // Retain only the coarsest octants (level at least 1) of each region.
    for region in &mut completed_regions {
        let max_level = region.iter().map(|o| o.level()).max().unwrap_or(0).max(1);
        region.retain(|octant| octant.level() == max_level);
    }
    completed_regions.retain(|region| !region.is_empty());

    let num_regions = completed_regions.len();
    for i in 0..num_regions {
        // Extend the first and last regions toward the domain corners, and
        // bridge consecutive regions with the next region's first block.
        let mut blocks = std::mem::take(&mut completed_regions[i]);

        if i == 0 {
            let first =
                nearest_common_ancestor(&result.deepest_first_descendant(), &blocks[0]);
            if first != blocks[0] {
                blocks.insert(0, first.children()[0]);
            }
        }

        if i < num_regions - 1 {
            blocks.push(completed_regions[i + 1][0]);
        } else {
            let last =
                nearest_common_ancestor(&result.deepest_last_descendant(), blocks.last().unwrap());
            if last != *blocks.last().unwrap() {
                blocks.push(last.children()[7]);
            }
        }

        for y in 0..blocks.len() - 1 {
            let completed = complete_region(&blocks[y], &blocks[y + 1]);
            result.insert(blocks[y]);
            result.extend(completed);
        }

        if i == num_regions - 1 {
            result.insert(*blocks.last().unwrap());
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(code: u64, level: u32) -> OctantId {
        OctantId::from_code(code, level)
    }

    fn assert_valid_partition(
        partition: &Partition,
        seeds: &[OctantId],
        global: &LinearOctree,
    ) {
        assert_eq!(partition.root, global.root());
        assert!(!partition.blocks.is_empty());

        // The blocks tile the domain seamlessly.
        assert_eq!(
            partition.blocks[0].deepest_first_descendant(),
            global.deepest_first_descendant()
        );
        assert_eq!(
            partition.blocks.last().unwrap().deepest_last_descendant(),
            global.deepest_last_descendant()
        );
        for pair in partition.blocks.windows(2) {
            assert_eq!(
                pair[0].deepest_last_descendant().mcode() + 1,
                pair[1].deepest_first_descendant().mcode()
            );
        }

        // Every seed is owned by exactly the block it falls into.
        let collected: Vec<OctantId> = partition
            .blocks
            .iter()
            .flat_map(|block| block.leaves().iter().copied())
            .collect();
        assert_eq!(collected, seeds);
    }

    #[test]
    fn test_compute_partition() {
        let global = LinearOctree::new(id(0, 3));

        let seeds: Vec<OctantId> = (32..=global.deepest_last_descendant().mcode() - 32)
            .step_by(8)
            .map(|code| id(code, 0))
            .collect();

        for threads in [2, 4, 8] {
            let partition = compute_partition(global.root(), &seeds, threads).unwrap();
            assert_valid_partition(&partition, &seeds, &global);
        }
    }

    #[test]
    fn test_partition_with_fewer_seeds_than_threads() {
        let global = LinearOctree::new(id(0, 3));
        let seeds = vec![id(0, 0), id(511, 0)];

        let partition = compute_partition(global.root(), &seeds, 4).unwrap();
        assert_valid_partition(&partition, &seeds, &global);
        assert_eq!(partition.blocks.len(), 1);
    }

    #[test]
    fn test_empty_seeds_is_an_error() {
        assert!(matches!(
            compute_partition(id(0, 3), &[], 4),
            Err(OctreeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_compute_blocks_from_regions_fixture() {
        let region0 = vec![
            id(37, 0),
            id(38, 0),
            id(39, 0),
            id(40, 1),
            id(48, 1),
            id(56, 1),
            id(64, 2),
            id(128, 2),
            id(192, 2),
            id(256, 1),
            id(264, 1),
            id(272, 1),
            id(280, 1),
            id(288, 0),
            id(289, 0),
            id(290, 0),
            id(291, 0),
            id(292, 0),
            id(293, 0),
        ];
        let region1 = vec![
            id(295, 0),
            id(296, 1),
            id(304, 1),
            id(312, 1),
            id(320, 2),
            id(385, 0),
        ];

        let blocks = compute_blocks_from_regions(id(0, 3), vec![region0, region1]);

        assert_eq!(blocks.root(), id(0, 3));
        assert_eq!(
            blocks.leaves(),
            &[
                id(0, 2),
                id(64, 2),
                id(128, 2),
                id(192, 2),
                id(256, 2),
                id(320, 2),
                id(384, 2),
                id(448, 2)
            ]
        );
    }

    #[test]
    fn test_no_regions_yields_empty_block_tree() {
        let blocks = compute_blocks_from_regions(id(0, 3), Vec::new());
        assert!(blocks.leaves().is_empty());
    }
}
