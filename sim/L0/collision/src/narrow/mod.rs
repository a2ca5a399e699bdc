//! Narrow-phase algorithms.
//!
//! Every algorithm family implements [`NarrowPhaseAlgorithm`]:
//!
//! | algorithm | pairs | method |
//! |-----------|-------|--------|
//! | [`SphereVsSphereAlgorithm`] | sphere-sphere | closed form |
//! | [`SatAlgorithm`] | box/mesh-box/mesh | separating axes |
//! | [`GjkAlgorithm`] | any convex pair | GJK distance, EPA on deep overlap |
//!
//! [`CollisionDispatch`] maps a pair of shape kinds to an algorithm, and a
//! [`NarrowPhaseWorker`] owns one instance of each algorithm and routes
//! queries through the table.

pub mod dispatch;
pub(crate) mod epa;
pub mod gjk;
pub mod sat;
pub(crate) mod simplex;
pub mod sphere_sphere;

use sim_types::Pose;

use crate::arena::{ContactArena, ContactId};
use crate::pair::OverlappingPair;
use crate::shape::{CollisionShape, ShapeKind};

pub use dispatch::{CollisionDispatch, NarrowPhaseWorker};
pub use gjk::GjkAlgorithm;
pub use sat::SatAlgorithm;
pub use sphere_sphere::SphereVsSphereAlgorithm;

/// Capability shared by every narrow-phase algorithm.
///
/// An algorithm is bound to the overlapping pair it is currently testing;
/// rebinding discards any per-pair scratch state. Instances are owned by a
/// single worker and never shared between threads while in use.
pub trait NarrowPhaseAlgorithm {
    /// Set the pair the next tests belong to.
    fn bind_overlapping_pair(&mut self, pair: OverlappingPair);

    /// Pair currently bound, if any.
    fn current_pair(&self) -> Option<OverlappingPair>;

    /// Test two posed shapes for intersection.
    ///
    /// On a hit, exactly one contact is allocated from `arena` and its
    /// handle returned. `None` means no intersection within the margin
    /// tolerance, or an iterative method that did not converge.
    ///
    /// Must only be called with a bound pair.
    fn test_collision(
        &mut self,
        shape_a: &CollisionShape,
        pose_a: &Pose,
        shape_b: &CollisionShape,
        pose_b: &Pose,
        arena: &mut ContactArena,
    ) -> Option<ContactId>;
}

/// Algorithm families known to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmKind {
    /// [`SphereVsSphereAlgorithm`].
    SphereSphere,
    /// [`SatAlgorithm`].
    Sat,
    /// [`GjkAlgorithm`].
    Gjk,
}

impl AlgorithmKind {
    /// Check if this algorithm can test an `a`-`b` pair.
    #[must_use]
    pub const fn supports(self, a: ShapeKind, b: ShapeKind) -> bool {
        match self {
            Self::SphereSphere => matches!((a, b), (ShapeKind::Sphere, ShapeKind::Sphere)),
            Self::Sat => a.is_polyhedral() && b.is_polyhedral(),
            Self::Gjk => true,
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SphereSphere => "sphere-sphere",
            Self::Sat => "SAT",
            Self::Gjk => "GJK",
        }
    }
}

impl std::fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
