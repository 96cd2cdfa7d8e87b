//! Octree builders: collect level-zero leaves, then construct the balanced
//! query octree sequentially or in parallel.

mod parallel;
mod partition;
mod region;
mod ripple;
mod subtree;


use glam::IVec3;
use rustc_hash::FxHashSet;

use crate::error::OctreeError;
use crate::linear::LinearOctree;
use crate::morton;
use crate::octant::OctantId;
use crate::octree::Octree;
use crate::types::MortonCode;

use parallel::create_balanced_octree_parallel;
use subtree::create_balanced_subtree;

/// Configuration shared by both builders.
#[derive(Debug, Clone, Default)]
pub struct BuilderOptions {
    /// Approximate number of level-zero leaves that will be added. Used only
    /// to pre-size internal storage.
    pub size_hint: usize,
    /// Upper bound on the level of any octant in the finished tree.
    ///
    /// When the cap binds, the empty space is tiled with octants of side
    /// `2^max_level` and the result is no longer guaranteed to be balanced
    /// at the cap.
    pub max_level: Option<u32>,
    /// Worker count for the parallel builder. `None` uses rayon's default.
    /// The sequential builder ignores this.
    pub threads: Option<usize>,
}

/// Common contract of the two builders.
///
/// Implementations accept repeated leaves and deduplicate them; the tree is
/// constructed once by [`finish_building`](Self::finish_building), which
/// consumes the builder and moves ownership of all collected leaves into
/// the returned [`Octree`].
pub trait OctreeBuilder {
    /// Registers the unit cube with lower-left-front corner `coord` as a
    /// leaf, returning its Morton code.
    fn add_level_zero_leaf(&mut self, coord: IVec3) -> Result<MortonCode, OctreeError>;

    /// Builds the complete, 2:1-balanced octree over all added leaves.
    fn finish_building(self) -> Result<Octree, OctreeError>;
}

fn validate_domain(max_xyz: IVec3) -> Result<(), OctreeError> {
    if !morton::fits_in_morton_code(max_xyz) {
        return Err(OctreeError::OutOfDomain {
            coord: max_xyz,
            max_xyz: morton::max_xyz_for_depth(crate::types::MAX_DEPTH),
        });
    }
    Ok(())
}

fn validate_coord(coord: IVec3, max_xyz: IVec3) -> Result<(), OctreeError> {
    if coord.min_element() < 0 || coord.cmpgt(max_xyz).any() {
        return Err(OctreeError::OutOfDomain { coord, max_xyz });
    }
    Ok(())
}

/// Single-threaded builder.
///
/// Stores the deduplicated Morton codes of the added leaves and grows the
/// balanced tree bottom-up in one pass at
/// [`finish_building`](OctreeBuilder::finish_building).
#[derive(Debug)]
pub struct SequentialOctreeBuilder {
    max_xyz: IVec3,
    max_level: u32,
    leaves: FxHashSet<MortonCode>,
}

impl SequentialOctreeBuilder {
    /// Creates a builder for the domain `(0, 0, 0)..=max_xyz`.
    ///
    /// The bounding box of the octree is always a power-of-two cube, so it
    /// may be larger (never smaller) than the requested domain. Fails if a
    /// component of `max_xyz` exceeds the 21-bit Morton capacity.
    pub fn new(max_xyz: IVec3) -> Result<Self, OctreeError> {
        Self::with_options(max_xyz, BuilderOptions::default())
    }

    pub fn with_options(max_xyz: IVec3, options: BuilderOptions) -> Result<Self, OctreeError> {
        validate_domain(max_xyz)?;

        let mut leaves = FxHashSet::default();
        if options.size_hint > 0 {
            leaves.reserve(options.size_hint);
        }

        Ok(Self {
            max_xyz,
            max_level: options.max_level.unwrap_or(u32::MAX),
            leaves,
        })
    }
}

impl OctreeBuilder for SequentialOctreeBuilder {
    fn add_level_zero_leaf(&mut self, coord: IVec3) -> Result<MortonCode, OctreeError> {
        validate_coord(coord, self.max_xyz)?;

        let mcode = morton::encode(coord);
        self.leaves.insert(mcode);
        Ok(mcode)
    }

    fn finish_building(self) -> Result<Octree, OctreeError> {
        if self.leaves.is_empty() {
            return Err(OctreeError::InvalidArgument(
                "no level zero leaves were added".to_string(),
            ));
        }

        let depth = morton::octree_depth_for_bounding(self.max_xyz);
        let root = OctantId::from_code(0, depth);

        let mut tree = LinearOctree::with_capacity(root, self.leaves.len());
        for mcode in self.leaves {
            tree.insert(OctantId::from_code(mcode, 0));
        }

        create_balanced_subtree(&mut tree, self.max_level);

        Ok(Octree::from_linear(tree))
    }
}

/// Multi-threaded builder.
///
/// Partitions the seeds along the z-order curve, builds each block's
/// balanced subtree on its own worker, then balances across block
/// boundaries and merges. The result is identical to the sequential
/// builder's for the same leaves.
#[derive(Debug)]
pub struct ParallelOctreeBuilder {
    max_xyz: IVec3,
    max_level: u32,
    threads: Option<usize>,
    seen: FxHashSet<MortonCode>,
    leaves: Vec<OctantId>,
}

impl ParallelOctreeBuilder {
    /// Creates a builder for the domain `(0, 0, 0)..=max_xyz`.
    ///
    /// See [`SequentialOctreeBuilder::new`] for the domain contract.
    pub fn new(max_xyz: IVec3) -> Result<Self, OctreeError> {
        Self::with_options(max_xyz, BuilderOptions::default())
    }

    pub fn with_options(max_xyz: IVec3, options: BuilderOptions) -> Result<Self, OctreeError> {
        validate_domain(max_xyz)?;

        let mut seen = FxHashSet::default();
        let mut leaves = Vec::new();
        if options.size_hint > 0 {
            seen.reserve(options.size_hint);
            leaves.reserve(options.size_hint);
        }

        Ok(Self {
            max_xyz,
            max_level: options.max_level.unwrap_or(u32::MAX),
            threads: options.threads,
            seen,
            leaves,
        })
    }
}

impl OctreeBuilder for ParallelOctreeBuilder {
    fn add_level_zero_leaf(&mut self, coord: IVec3) -> Result<MortonCode, OctreeError> {
        validate_coord(coord, self.max_xyz)?;

        let leaf = OctantId::new(coord, 0);
        if self.seen.insert(leaf.mcode()) {
            self.leaves.push(leaf);
        }
        Ok(leaf.mcode())
    }

    fn finish_building(self) -> Result<Octree, OctreeError> {
        if self.leaves.is_empty() {
            return Err(OctreeError::InvalidArgument(
                "no level zero leaves were added".to_string(),
            ));
        }

        let depth = morton::octree_depth_for_bounding(self.max_xyz);
        let root = OctantId::from_code(0, depth);

        let num_threads = self.threads.unwrap_or_else(rayon::current_num_threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()
            .map_err(|e| {
                OctreeError::InvariantViolation(format!("failed to build thread pool: {}", e))
            })?;

        let max_level = self.max_level;
        let mut leaves = self.leaves;

        let balanced = pool.install(move || {
            use rayon::prelude::*;
            leaves.par_sort();
            create_balanced_octree_parallel(root, &leaves, num_threads, max_level)
        })?;

        Ok(Octree::from_linear(balanced))
    }
}
