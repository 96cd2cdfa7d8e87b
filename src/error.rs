//! Error types for octree construction.

use std::fmt;

use glam::IVec3;

/// Errors that can occur while setting up or running a build.
///
/// Queries on a finished [`Octree`](crate::Octree) never return errors; they
/// panic on programmer error (out-of-range index) or on a broken tree
/// invariant.
#[derive(Debug, Clone)]
pub enum OctreeError {
    /// A coordinate that cannot be Morton-encoded (a component is negative
    /// or does not fit in 21 bits) or that lies outside the configured
    /// bounding box.
    OutOfDomain { coord: IVec3, max_xyz: IVec3 },

    /// Logical misuse of the builder, e.g. finishing without having added a
    /// single level-zero leaf.
    InvalidArgument(String),

    /// Internal invariant violation.
    /// This should not happen with valid input and indicates a bug.
    InvariantViolation(String),
}

impl fmt::Display for OctreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OctreeError::OutOfDomain { coord, max_xyz } => {
                write!(
                    f,
                    "coordinate ({}, {}, {}) is outside the domain (0, 0, 0)..=({}, {}, {})",
                    coord.x, coord.y, coord.z, max_xyz.x, max_xyz.y, max_xyz.z
                )
            }
            OctreeError::InvalidArgument(msg) => {
                write!(f, "invalid argument: {}", msg)
            }
            OctreeError::InvariantViolation(msg) => {
                write!(f, "invariant violation: {}", msg)
            }
        }
    }
}

impl std::error::Error for OctreeError {}
