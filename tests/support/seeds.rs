#![allow(dead_code)]

use glam::IVec3;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Uniformly random seed coordinates inside `(0, 0, 0)..=max_xyz`,
/// duplicates included (the builders must deduplicate).
pub fn random_seeds(n: usize, max_xyz: IVec3, seed: u64) -> Vec<IVec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            IVec3::new(
                rng.gen_range(0..=max_xyz.x),
                rng.gen_range(0..=max_xyz.y),
                rng.gen_range(0..=max_xyz.z),
            )
        })
        .collect()
}

/// Seeds clustered in a small corner box, forcing deep refinement next to
/// large empty space.
pub fn clustered_seeds(n: usize, cluster_extent: i32, seed: u64) -> Vec<IVec3> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            IVec3::new(
                rng.gen_range(0..cluster_extent),
                rng.gen_range(0..cluster_extent),
                rng.gen_range(0..cluster_extent),
            )
        })
        .collect()
}

/// Seeds along the main diagonal, one per step. The worst case for the
/// partitioner: every block boundary cuts the refined region.
pub fn diagonal_seeds(extent: i32) -> Vec<IVec3> {
    (0..extent).map(IVec3::splat).collect()
}

/// Every unit cube of a filled box with the given corner and extent.
pub fn filled_box_seeds(llf: IVec3, extent: i32) -> Vec<IVec3> {
    let mut seeds = Vec::with_capacity((extent * extent * extent) as usize);
    for x in 0..extent {
        for y in 0..extent {
            for z in 0..extent {
                seeds.push(llf + IVec3::new(x, y, z));
            }
        }
    }
    seeds
}
