//! Linear, 2:1-balanced complete octrees over integer voxel domains.
//!
//! This crate builds a *complete* octree — a tiling of a power-of-two cube
//! by non-overlapping axis-aligned cubes — from a set of "seed" unit cubes.
//! Seeds are refined to unit level; the surrounding space is filled with
//! the coarsest octants consistent with the *2:1 balance* rule: any two
//! leaves sharing at least a vertex differ in level by at most one.
//!
//! The finished [`Octree`] supports O(1) lookup by `(corner, level)` and
//! face-neighbor queries. Construction is available single-threaded
//! ([`SequentialOctreeBuilder`]) and multi-threaded
//! ([`ParallelOctreeBuilder`]); both produce identical trees.
//!
//! # Example
//!
//! ```
//! use balanced_octree::{OctreeBuilder, OctreeState, SequentialOctreeBuilder};
//! use glam::IVec3;
//!
//! let mut builder = SequentialOctreeBuilder::new(IVec3::new(7, 7, 7)).unwrap();
//! builder.add_level_zero_leaf(IVec3::new(5, 2, 0)).unwrap();
//!
//! let octree = builder.finish_building().unwrap();
//! assert_eq!(octree.num_nodes(), 43);
//! assert_eq!(octree.check_state(), OctreeState::Valid);
//! ```

mod builder;
mod error;
mod linear;
mod morton;
mod octant;
mod octree;
mod types;
pub mod validation;

pub use builder::{BuilderOptions, OctreeBuilder, ParallelOctreeBuilder, SequentialOctreeBuilder};
pub use error::OctreeError;
pub use octree::{Face, Octree, OctreeNode};
pub use types::MortonCode;
pub use validation::OctreeState;
