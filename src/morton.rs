//! Morton (z-order) code arithmetic on octant corners.
//!
//! A Morton code interleaves the bits of an `(x, y, z)` corner x-major, so
//! that the bit triplet at position `3 * L` selects the child slot within
//! the level-`L + 1` octant containing the corner. Ancestry is therefore a
//! high-bit prefix relation and all octant arithmetic reduces to shifts and
//! masks.

use glam::IVec3;

use crate::types::{MortonCode, MAX_BITS_PER_COMPONENT, MAX_DEPTH};

const COMPONENT_MASK: u64 = (1 << MAX_BITS_PER_COMPONENT) - 1;

/// Spread the low 21 bits of `x` into every third bit of a 64-bit word.
#[inline]
fn spread_bits(x: u64) -> u64 {
    let mut x = x & COMPONENT_MASK;
    x = (x | (x << 32)) & 0x1f00000000ffff;
    x = (x | (x << 16)) & 0x1f0000ff0000ff;
    x = (x | (x << 8)) & 0x100f00f00f00f00f;
    x = (x | (x << 4)) & 0x10c30c30c30c30c3;
    x = (x | (x << 2)) & 0x1249249249249249;
    x
}

/// Inverse of [`spread_bits`]: compact every third bit into the low 21 bits.
#[inline]
fn compact_bits(x: u64) -> u64 {
    let mut x = x & 0x1249249249249249;
    x = (x | (x >> 2)) & 0x10c30c30c30c30c3;
    x = (x | (x >> 4)) & 0x100f00f00f00f00f;
    x = (x | (x >> 8)) & 0x1f0000ff0000ff;
    x = (x | (x >> 16)) & 0x1f00000000ffff;
    x = (x | (x >> 32)) & COMPONENT_MASK;
    x
}

/// Mask clearing all code bits below level `level`.
#[inline]
pub(crate) fn level_mask(level: u32) -> u64 {
    debug_assert!(level <= MAX_DEPTH);
    u64::MAX << (3 * level)
}

/// Tests whether every coordinate in the box `(0, 0, 0)..=max_xyz` can be
/// Morton-encoded.
#[inline]
pub(crate) fn fits_in_morton_code(max_xyz: IVec3) -> bool {
    max_xyz.min_element() >= 0 && (max_xyz.max_element() >> MAX_BITS_PER_COMPONENT) == 0
}

/// The depth of an octree that tiles the box `(0, 0, 0)..=max_xyz` with unit
/// leaves. All components must be non-negative.
pub(crate) fn octree_depth_for_bounding(max_xyz: IVec3) -> u32 {
    let max = max_xyz.max_element();
    assert!(max >= 0, "bounding components must not be negative");

    // Bits required to store 0..=max.
    32 - (max as u32).leading_zeros()
}

/// The upper-right-back corner of an octree of the given depth.
#[inline]
pub(crate) fn max_xyz_for_depth(depth: u32) -> IVec3 {
    debug_assert!(depth <= MAX_DEPTH);
    IVec3::splat((1 << depth) - 1)
}

/// Side length of octants at `level`.
#[inline]
pub(crate) fn octant_size_for_level(level: u32) -> i32 {
    debug_assert!(level <= MAX_DEPTH);
    1 << level
}

/// Morton code of a coordinate. Components must be in `[0, 2^21)`.
#[inline]
pub(crate) fn encode(coordinate: IVec3) -> MortonCode {
    debug_assert!(
        fits_in_morton_code(coordinate),
        "coordinate not encodable: {:?}",
        coordinate
    );
    (spread_bits(coordinate.x as u64) << 2)
        | (spread_bits(coordinate.y as u64) << 1)
        | spread_bits(coordinate.z as u64)
}

/// Coordinate represented by a Morton code.
#[inline]
pub(crate) fn decode(code: MortonCode) -> IVec3 {
    IVec3::new(
        compact_bits(code >> 2) as i32,
        compact_bits(code >> 1) as i32,
        compact_bits(code) as i32,
    )
}

/// Code of the parent octant (one level up).
///
/// `code` may be any Morton-encoded coordinate inside the current octant;
/// the result is the aligned corner of the parent.
#[inline]
pub(crate) fn parent_code(code: MortonCode, current_level: u32) -> MortonCode {
    debug_assert!(current_level < MAX_DEPTH);
    code & level_mask(current_level + 1)
}

/// Code of the ancestor at `ancestor_level`.
///
/// Panics if `ancestor_level < current_level`.
#[inline]
pub(crate) fn ancestor_code(code: MortonCode, current_level: u32, ancestor_level: u32) -> MortonCode {
    assert!(
        ancestor_level >= current_level,
        "ancestor level {} below octant level {}",
        ancestor_level,
        current_level
    );
    code & level_mask(ancestor_level)
}

/// Codes of the eight children of the octant, in canonical order: the child
/// at local offset `(x, y, z) in {0, 1}^3` has index `x << 2 | y << 1 | z`.
///
/// `parent` may be any Morton-encoded coordinate inside the parent octant.
/// Panics if `parent_level` is zero.
#[inline]
pub(crate) fn children_codes(parent: MortonCode, parent_level: u32) -> [MortonCode; 8] {
    assert!(parent_level > 0, "a level 0 octant has no children");

    let child_level = parent_level - 1;
    let parent_llf = parent & level_mask(parent_level);

    let mut children = [0; 8];
    for (i, child) in children.iter_mut().enumerate() {
        *child = parent_llf | ((i as u64) << (3 * child_level));
    }
    children
}

/// Tests whether `(code, level)` is a proper descendant of
/// `(ancestor_code, ancestor_level)`.
#[inline]
pub(crate) fn is_descendant(
    code: MortonCode,
    level: u32,
    ancestor_code: MortonCode,
    ancestor_level: u32,
) -> bool {
    if level >= ancestor_level || ancestor_code > code {
        return false;
    }

    debug_assert_eq!(
        ancestor_code,
        ancestor_code & level_mask(ancestor_level),
        "ancestor code has stray low bits"
    );

    (code & level_mask(ancestor_level)) == ancestor_code
}

/// Code and level of the nearest common ancestor of two octants.
pub(crate) fn nearest_common_ancestor(
    a: MortonCode,
    b: MortonCode,
    a_level: u32,
    b_level: u32,
) -> (MortonCode, u32) {
    let diff = a ^ b;

    if diff == 0 {
        return (a, a_level.max(b_level));
    }

    // The first differing bit decides the coarsest level at which the codes
    // still share a prefix; the NCA can never be finer than either input.
    let first_diff_pos = 63 - diff.leading_zeros();
    let nca_level = (first_diff_pos / 3 + 1).max(a_level.max(b_level));

    (a & level_mask(nca_level), nca_level)
}

/// The corner of the octant that it shares with none of its siblings.
///
/// The child slot under the parent (the triplet at bit `3 * level`) selects
/// the corner: each set axis bit moves the corner by the octant's side along
/// that axis.
pub(crate) fn search_corner(code: MortonCode, level: u32) -> IVec3 {
    let mut corner = decode(code);
    let size = octant_size_for_level(level);

    let slot = (code >> (3 * level)) & 7;
    if slot & 4 != 0 {
        corner.x += size;
    }
    if slot & 2 != 0 {
        corner.y += size;
    }
    if slot & 1 != 0 {
        corner.z += size;
    }

    corner
}

/// Code of the greatest level-0 descendant of the octant.
#[inline]
pub(crate) fn last_descendant_code(code: MortonCode, level: u32) -> MortonCode {
    debug_assert!(level <= MAX_DEPTH);
    code | !level_mask(level)
}
