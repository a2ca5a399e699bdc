//! Batch runner: tests a step's worth of overlapping pairs.
//!
//! Pairs are independent, so a batch can be split across threads. Each
//! rayon task owns its own [`NarrowPhaseWorker`] (algorithms carry per-pair
//! state and are never shared) and its own arena shard. Results are then
//! committed to the step arena in query order, so the parallel path returns
//! exactly the contacts, in exactly the order, of the sequential path.
//!
//! # Example
//!
//! ```
//! use nalgebra::Point3;
//! use sim_collision::{CollisionShape, ContactArena, NarrowPhase, OverlappingPair, PairQuery};
//! use sim_types::{BodyId, NarrowPhaseConfig, Pose};
//!
//! let narrow_phase = NarrowPhase::new(NarrowPhaseConfig::default()).unwrap();
//! let ball = CollisionShape::sphere(1.0);
//!
//! let queries = [PairQuery::new(
//!     OverlappingPair::new(BodyId::new(0), BodyId::new(1)),
//!     &ball,
//!     Pose::identity(),
//!     &ball,
//!     Pose::from_position(Point3::new(1.5, 0.0, 0.0)),
//! )];
//!
//! let mut arena = ContactArena::new();
//! let contacts = narrow_phase.process(&queries, &mut arena);
//! assert_eq!(contacts.len(), 1);
//! assert!((arena.get(contacts[0]).unwrap().penetration_depth - 0.5).abs() < 1e-12);
//! ```

use sim_types::{NarrowPhaseConfig, Result};
use tracing::trace;

use crate::arena::{ContactArena, ContactId};
use crate::narrow::{CollisionDispatch, NarrowPhaseWorker};
use crate::pair::PairQuery;

/// Narrow-phase front end: validated configuration plus dispatch table.
#[derive(Debug, Clone, PartialEq)]
pub struct NarrowPhase {
    config: NarrowPhaseConfig,
    dispatch: CollisionDispatch,
}

impl NarrowPhase {
    /// Create a narrow phase with the default dispatch table.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`](sim_types::SimError::InvalidConfig)
    /// if `config` fails validation.
    pub fn new(config: NarrowPhaseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            dispatch: CollisionDispatch::default(),
        })
    }

    /// Replace the dispatch table.
    #[must_use]
    pub fn with_dispatch(mut self, dispatch: CollisionDispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &NarrowPhaseConfig {
        &self.config
    }

    /// Dispatch table in use.
    #[must_use]
    pub fn dispatch(&self) -> &CollisionDispatch {
        &self.dispatch
    }

    /// A fresh worker for this configuration.
    #[must_use]
    pub fn worker(&self) -> NarrowPhaseWorker {
        NarrowPhaseWorker::new(&self.config, self.dispatch)
    }

    /// Test every query on the calling thread.
    ///
    /// Returns the handles of the contacts found, in query order. Queries
    /// that miss produce nothing.
    pub fn process(&self, queries: &[PairQuery<'_>], arena: &mut ContactArena) -> Vec<ContactId> {
        let mut worker = self.worker();
        let contacts: Vec<ContactId> = queries
            .iter()
            .filter_map(|query| worker.test(query, arena))
            .collect();

        trace!(
            queries = queries.len(),
            contacts = contacts.len(),
            "narrow phase batch"
        );
        contacts
    }

    /// Test every query, split across the rayon thread pool.
    ///
    /// Output is identical to [`Self::process`] regardless of thread count.
    /// Without the `parallel` feature this runs sequentially.
    pub fn process_parallel(
        &self,
        queries: &[PairQuery<'_>],
        arena: &mut ContactArena,
    ) -> Vec<ContactId> {
        #[cfg(feature = "parallel")]
        {
            use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

            let found: Vec<_> = queries
                .par_iter()
                .map_init(
                    || (self.worker(), ContactArena::new()),
                    |(worker, shard), query| {
                        shard.reset_all();
                        worker
                            .test(query, shard)
                            .and_then(|id| shard.get(id).copied())
                    },
                )
                .collect();

            let contacts: Vec<ContactId> = found
                .into_iter()
                .flatten()
                .map(|contact| arena.allocate(contact))
                .collect();

            trace!(
                queries = queries.len(),
                contacts = contacts.len(),
                "parallel narrow phase batch"
            );
            contacts
        }

        #[cfg(not(feature = "parallel"))]
        {
            self.process(queries, arena)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::narrow::AlgorithmKind;
    use crate::pair::OverlappingPair;
    use crate::shape::{CollisionShape, ShapeKind};
    use nalgebra::{Point3, Vector3};
    use sim_types::{BodyId, Pose};

    #[test]
    fn test_rejects_invalid_config() {
        let config = NarrowPhaseConfig::default().gjk_max_iterations(0);
        let err = NarrowPhase::new(config).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_process_skips_misses() {
        let narrow_phase = NarrowPhase::new(NarrowPhaseConfig::default()).unwrap();
        let ball = CollisionShape::sphere(0.5);
        let cube = CollisionShape::box_shape(Vector3::new(0.5, 0.5, 0.5));

        let queries = [
            PairQuery::new(
                OverlappingPair::new(BodyId::new(0), BodyId::new(1)),
                &ball,
                Pose::identity(),
                &ball,
                Pose::from_position(Point3::new(5.0, 0.0, 0.0)),
            ),
            PairQuery::new(
                OverlappingPair::new(BodyId::new(2), BodyId::new(3)),
                &ball,
                Pose::identity(),
                &cube,
                Pose::from_position(Point3::new(0.0, 0.95, 0.0)),
            ),
        ];

        let mut arena = ContactArena::new();
        let contacts = narrow_phase.process(&queries, &mut arena);
        assert_eq!(contacts.len(), 1);

        let contact = arena.get(contacts[0]).unwrap();
        assert_eq!(contact.body_a, BodyId::new(2));
        assert_eq!(contact.shape_b, ShapeKind::Box);
    }

    #[test]
    fn test_custom_dispatch() {
        let dispatch = CollisionDispatch::new()
            .with_algorithm(ShapeKind::Sphere, ShapeKind::Sphere, AlgorithmKind::Gjk)
            .unwrap();
        let narrow_phase = NarrowPhase::new(NarrowPhaseConfig::default())
            .unwrap()
            .with_dispatch(dispatch);
        assert_eq!(
            narrow_phase
                .dispatch()
                .select(ShapeKind::Sphere, ShapeKind::Sphere),
            AlgorithmKind::Gjk
        );

        let ball = CollisionShape::sphere(1.0);
        let queries = [PairQuery::new(
            OverlappingPair::new(BodyId::new(0), BodyId::new(1)),
            &ball,
            Pose::identity(),
            &ball,
            Pose::from_position(Point3::new(0.0, 0.0, 1.0)),
        )];
        let mut arena = ContactArena::new();
        let contacts = narrow_phase.process(&queries, &mut arena);
        approx::assert_relative_eq!(
            arena.get(contacts[0]).unwrap().penetration_depth,
            1.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let narrow_phase = NarrowPhase::new(NarrowPhaseConfig::default()).unwrap();
        let shapes = [
            CollisionShape::sphere(0.5),
            CollisionShape::box_shape(Vector3::new(0.4, 0.5, 0.6)),
            CollisionShape::capsule(0.3, 0.2),
            CollisionShape::tetrahedron(0.5),
        ];

        let mut queries = Vec::new();
        for (i, a) in shapes.iter().enumerate() {
            for (j, b) in shapes.iter().enumerate() {
                #[allow(clippy::cast_precision_loss)]
                let offset = 0.6 + 0.05 * (i * 4 + j) as f64;
                queries.push(PairQuery::new(
                    OverlappingPair::new(BodyId::new(i as u64), BodyId::new(j as u64 + 10)),
                    a,
                    Pose::identity(),
                    b,
                    Pose::from_position(Point3::new(offset, 0.1, -0.05)),
                ));
            }
        }

        let mut sequential = ContactArena::new();
        let mut parallel = ContactArena::new();
        let seq_ids = narrow_phase.process(&queries, &mut sequential);
        let par_ids = narrow_phase.process_parallel(&queries, &mut parallel);

        assert_eq!(seq_ids, par_ids);
        assert_eq!(sequential.as_slice(), parallel.as_slice());
    }
}
