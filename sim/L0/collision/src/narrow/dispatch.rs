//! Algorithm selection by shape-kind pair.

use sim_types::{NarrowPhaseConfig, Result, SimError};
use tracing::trace;

use super::{
    AlgorithmKind, GjkAlgorithm, NarrowPhaseAlgorithm, SatAlgorithm, SphereVsSphereAlgorithm,
};
use crate::arena::{ContactArena, ContactId};
use crate::pair::PairQuery;
use crate::shape::ShapeKind;

/// Lookup table from `(ShapeKind, ShapeKind)` to the algorithm that tests it.
///
/// The default table sends sphere-sphere pairs to the closed form,
/// box/mesh pairs to SAT and everything else to GJK. The table is always
/// symmetric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionDispatch {
    table: [[AlgorithmKind; ShapeKind::COUNT]; ShapeKind::COUNT],
}

impl Default for CollisionDispatch {
    fn default() -> Self {
        let mut table = [[AlgorithmKind::Gjk; ShapeKind::COUNT]; ShapeKind::COUNT];
        for a in ShapeKind::all() {
            for b in ShapeKind::all() {
                table[a.index()][b.index()] = if AlgorithmKind::SphereSphere.supports(a, b) {
                    AlgorithmKind::SphereSphere
                } else if AlgorithmKind::Sat.supports(a, b) {
                    AlgorithmKind::Sat
                } else {
                    AlgorithmKind::Gjk
                };
            }
        }
        Self { table }
    }
}

impl CollisionDispatch {
    /// Default dispatch table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Algorithm for an `a`-`b` pair.
    #[must_use]
    pub fn select(&self, a: ShapeKind, b: ShapeKind) -> AlgorithmKind {
        self.table[a.index()][b.index()]
    }

    /// Route `a`-`b` (and `b`-`a`) pairs to `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnsupportedAlgorithm`] if `algorithm` cannot test
    /// that pair.
    pub fn with_algorithm(
        mut self,
        a: ShapeKind,
        b: ShapeKind,
        algorithm: AlgorithmKind,
    ) -> Result<Self> {
        if !algorithm.supports(a, b) {
            return Err(SimError::unsupported_algorithm(
                algorithm.name(),
                a.name(),
                b.name(),
            ));
        }
        trace!(%a, %b, %algorithm, "dispatch override");
        self.table[a.index()][b.index()] = algorithm;
        self.table[b.index()][a.index()] = algorithm;
        Ok(self)
    }
}

/// One instance of every algorithm plus the table that picks between them.
///
/// Algorithms carry per-pair state, so a worker is never cloned or shared:
/// each thread builds its own.
#[derive(Debug)]
pub struct NarrowPhaseWorker {
    dispatch: CollisionDispatch,
    sphere_sphere: SphereVsSphereAlgorithm,
    sat: SatAlgorithm,
    gjk: GjkAlgorithm,
}

impl NarrowPhaseWorker {
    /// Create a worker. `config` must pass [`NarrowPhaseConfig::validate`].
    #[must_use]
    pub fn new(config: &NarrowPhaseConfig, dispatch: CollisionDispatch) -> Self {
        debug_assert!(
            config.validate().is_ok(),
            "worker built from an invalid config: {config:?}"
        );
        Self {
            dispatch,
            sphere_sphere: SphereVsSphereAlgorithm::new(),
            sat: SatAlgorithm::new(config),
            gjk: GjkAlgorithm::new(config),
        }
    }

    /// The dispatch table in use.
    #[must_use]
    pub fn dispatch(&self) -> &CollisionDispatch {
        &self.dispatch
    }

    /// The algorithm instance for `kind`.
    pub fn algorithm_mut(&mut self, kind: AlgorithmKind) -> &mut dyn NarrowPhaseAlgorithm {
        match kind {
            AlgorithmKind::SphereSphere => &mut self.sphere_sphere,
            AlgorithmKind::Sat => &mut self.sat,
            AlgorithmKind::Gjk => &mut self.gjk,
        }
    }

    /// Run one query through the selected algorithm.
    pub fn test(&mut self, query: &PairQuery<'_>, arena: &mut ContactArena) -> Option<ContactId> {
        let kind = self
            .dispatch
            .select(query.shape_a.kind(), query.shape_b.kind());
        let algorithm = self.algorithm_mut(kind);
        algorithm.bind_overlapping_pair(query.pair);
        algorithm.test_collision(
            query.shape_a,
            &query.pose_a,
            query.shape_b,
            &query.pose_b,
            arena,
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::pair::OverlappingPair;
    use crate::shape::CollisionShape;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};
    use sim_types::{BodyId, Pose};

    #[test]
    fn test_default_table() {
        let dispatch = CollisionDispatch::new();
        assert_eq!(
            dispatch.select(ShapeKind::Sphere, ShapeKind::Sphere),
            AlgorithmKind::SphereSphere
        );
        assert_eq!(
            dispatch.select(ShapeKind::Box, ShapeKind::ConvexMesh),
            AlgorithmKind::Sat
        );
        assert_eq!(
            dispatch.select(ShapeKind::Sphere, ShapeKind::Box),
            AlgorithmKind::Gjk
        );
        assert_eq!(
            dispatch.select(ShapeKind::Capsule, ShapeKind::Capsule),
            AlgorithmKind::Gjk
        );

        for a in ShapeKind::all() {
            for b in ShapeKind::all() {
                assert_eq!(dispatch.select(a, b), dispatch.select(b, a));
            }
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "worker built from an invalid config")]
    fn test_worker_rejects_invalid_config_in_debug() {
        let config = NarrowPhaseConfig::default().gjk_max_iterations(0);
        let _ = NarrowPhaseWorker::new(&config, CollisionDispatch::new());
    }

    #[test]
    fn test_override_is_symmetric() {
        let dispatch = CollisionDispatch::new()
            .with_algorithm(ShapeKind::Box, ShapeKind::ConvexMesh, AlgorithmKind::Gjk)
            .unwrap();
        assert_eq!(
            dispatch.select(ShapeKind::ConvexMesh, ShapeKind::Box),
            AlgorithmKind::Gjk
        );
        assert_eq!(
            dispatch.select(ShapeKind::Box, ShapeKind::Box),
            AlgorithmKind::Sat
        );
    }

    #[test]
    fn test_unsupported_override() {
        let err = CollisionDispatch::new()
            .with_algorithm(ShapeKind::Sphere, ShapeKind::Box, AlgorithmKind::Sat)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "algorithm SAT cannot handle sphere-box pairs"
        );

        assert!(CollisionDispatch::new()
            .with_algorithm(ShapeKind::Capsule, ShapeKind::Sphere, AlgorithmKind::SphereSphere)
            .is_err());
    }

    #[test]
    fn test_worker_routes_queries() {
        let mut worker =
            NarrowPhaseWorker::new(&NarrowPhaseConfig::default(), CollisionDispatch::new());
        let mut arena = ContactArena::new();
        let sphere = CollisionShape::sphere(0.5);
        let cube = CollisionShape::box_shape(Vector3::new(0.5, 0.5, 0.5));
        let pair = OverlappingPair::new(BodyId::new(1), BodyId::new(2));

        let query = PairQuery::new(
            pair,
            &cube,
            Pose::identity(),
            &sphere,
            Pose::from_position(Point3::new(0.0, 0.0, 0.9)),
        );
        let id = worker.test(&query, &mut arena).unwrap();
        let contact = arena.get(id).unwrap();

        assert_eq!(contact.shape_a, ShapeKind::Box);
        assert_eq!(contact.shape_b, ShapeKind::Sphere);
        assert_relative_eq!(contact.penetration_depth, 0.1, epsilon = 1e-6);
        assert_relative_eq!(contact.normal, Vector3::z(), epsilon = 1e-6);
        assert_eq!(
            worker.algorithm_mut(AlgorithmKind::Gjk).current_pair(),
            Some(pair)
        );
        assert!(worker
            .algorithm_mut(AlgorithmKind::Sat)
            .current_pair()
            .is_none());
    }
}
