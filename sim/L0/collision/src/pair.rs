//! Overlapping pairs handed over by the broad phase.

use sim_types::{BodyId, Pose};

use crate::shape::CollisionShape;

/// Two bodies whose bounding volumes overlap, as reported by the broad phase.
///
/// Immutable for the duration of narrow-phase processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlappingPair {
    /// First body.
    pub body_a: BodyId,
    /// Second body.
    pub body_b: BodyId,
}

impl OverlappingPair {
    /// Create a pair.
    #[must_use]
    pub const fn new(body_a: BodyId, body_b: BodyId) -> Self {
        Self { body_a, body_b }
    }
}

/// One narrow-phase test: a pair plus the shapes and poses it borrows.
#[derive(Debug, Clone, Copy)]
pub struct PairQuery<'a> {
    /// Bodies being tested.
    pub pair: OverlappingPair,
    /// Shape of `pair.body_a`.
    pub shape_a: &'a CollisionShape,
    /// Pose of `shape_a`.
    pub pose_a: Pose,
    /// Shape of `pair.body_b`.
    pub shape_b: &'a CollisionShape,
    /// Pose of `shape_b`.
    pub pose_b: Pose,
}

impl<'a> PairQuery<'a> {
    /// Bundle a pair with its shapes and poses.
    #[must_use]
    pub fn new(
        pair: OverlappingPair,
        shape_a: &'a CollisionShape,
        pose_a: Pose,
        shape_b: &'a CollisionShape,
        pose_b: Pose,
    ) -> Self {
        Self {
            pair,
            shape_a,
            pose_a,
            shape_b,
            pose_b,
        }
    }
}
