//! Core types shared across the crate.

use glam::IVec3;

/// Morton code (z-order index) of an octant's lower-left-front corner.
///
/// Bits are interleaved x-major: the triplet at bit position `3 * L`
/// holds `(x, y, z)` bits of weight `2^L` as `x << 2 | y << 1 | z`.
pub type MortonCode = u64;

/// Number of bits available per coordinate component (3 * 21 = 63 < 64).
pub(crate) const MAX_BITS_PER_COMPONENT: u32 = 21;

/// Maximum octree depth: a root of this level spans the whole encodable
/// domain.
pub(crate) const MAX_DEPTH: u32 = MAX_BITS_PER_COMPONENT;

/// An axis-aligned integer box with inclusive corners.
///
/// `llf` is the lower-left-front (componentwise minimum) corner and `urb`
/// the upper-right-back corner. A voxel coordinate `p` is inside the box iff
/// `llf <= p <= urb` componentwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Box3i {
    llf: IVec3,
    urb: IVec3,
}

impl Box3i {
    #[inline]
    pub fn new(llf: IVec3, urb: IVec3) -> Self {
        Self { llf, urb }
    }

    /// Box spanning the origin to `urb`.
    #[inline]
    pub fn from_urb(urb: IVec3) -> Self {
        Self::new(IVec3::ZERO, urb)
    }

    #[inline]
    pub fn urb(&self) -> IVec3 {
        self.urb
    }

    /// True if the box contains at least one voxel.
    #[inline]
    pub fn valid(&self) -> bool {
        self.llf.cmple(self.urb).all()
    }

    #[inline]
    pub fn contains(&self, point: IVec3) -> bool {
        point.cmpge(self.llf).all() && point.cmple(self.urb).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_inclusive() {
        let b = Box3i::from_urb(IVec3::new(3, 3, 3));

        assert!(b.contains(IVec3::ZERO));
        assert!(b.contains(IVec3::new(3, 3, 3)));
        assert!(b.contains(IVec3::new(1, 2, 3)));

        assert!(!b.contains(IVec3::new(4, 0, 0)));
        assert!(!b.contains(IVec3::new(0, 4, 0)));
        assert!(!b.contains(IVec3::new(0, 0, 4)));
        assert!(!b.contains(IVec3::new(-1, 0, 0)));
    }

    #[test]
    fn test_validity() {
        assert!(Box3i::from_urb(IVec3::ZERO).valid());
        assert!(Box3i::new(IVec3::new(2, 2, 2), IVec3::new(5, 5, 5)).valid());
        assert!(!Box3i::new(IVec3::new(1, 0, 0), IVec3::ZERO).valid());
    }
}
