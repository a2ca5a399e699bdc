//! GJK (Gilbert-Johnson-Keerthi) for arbitrary convex pairs.
//!
//! The query runs in two stages:
//!
//! 1. A GJK *distance* query on the margin-exclusive cores. When the cores
//!    are apart by more than the sum of the margins the shapes do not touch.
//!    When they are apart by less, the margins overlap and the contact comes
//!    straight from the core witness points.
//! 2. When the cores themselves overlap, EPA measures how deep they
//!    overlap and the margins are added on top.
//!
//! # References
//!
//! - Gilbert, Johnson, Keerthi: "A Fast Procedure for Computing the Distance
//!   Between Complex Objects in Three-Dimensional Space" (1988)
//! - van den Bergen: "Collision Detection in Interactive 3D Environments" (2003)

use nalgebra::{Point3, Vector3};
use sim_types::{NarrowPhaseConfig, Pose};
use tracing::debug;

use super::epa::{self, EpaLimits};
use super::simplex::{ShapePair, Simplex};
use super::NarrowPhaseAlgorithm;
use crate::arena::{ContactArena, ContactId};
use crate::contact::{ContactGeometry, ContactPointInfo};
use crate::pair::OverlappingPair;
use crate::shape::CollisionShape;

/// Squared core distance below which the cores count as overlapping.
const CORE_OVERLAP_SQ: f64 = 1e-16;

/// Outcome of the distance query on the convex cores.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CoreDistance {
    /// Cores are apart.
    Separated {
        /// Distance between the cores.
        distance: f64,
        /// Unit direction from A's core toward B's core.
        normal: Vector3<f64>,
        /// Closest point on A's core.
        witness_a: Point3<f64>,
        /// Closest point on B's core.
        witness_b: Point3<f64>,
    },
    /// Cores touch or overlap.
    Overlapping,
    /// Iteration budget exhausted.
    NotConverged,
}

/// Distance between the margin-exclusive cores of two shapes.
pub(crate) fn core_distance(
    shapes: &ShapePair<'_>,
    simplex: &mut Simplex,
    max_iterations: usize,
    relative_tolerance: f64,
) -> CoreDistance {
    simplex.clear();

    let first = shapes.support(&shapes.center_direction());
    simplex.set(&[first]);
    let mut v = first.point.coords;
    let mut dist_sq = v.norm_squared();

    for _ in 0..max_iterations {
        if dist_sq <= CORE_OVERLAP_SQ {
            return CoreDistance::Overlapping;
        }

        let w = shapes.support(&-v);

        // No support point gets meaningfully closer than the current one
        if simplex.contains(&w.point) || dist_sq - v.dot(&w.point.coords) <= relative_tolerance * dist_sq
        {
            return separated(simplex, &v);
        }

        simplex.push(w);
        let Some(closest) = simplex.reduce_to_closest() else {
            return CoreDistance::Overlapping;
        };

        let new_dist_sq = closest.norm_squared();
        if new_dist_sq >= dist_sq {
            return separated(simplex, &closest);
        }
        v = closest;
        dist_sq = new_dist_sq;
    }

    CoreDistance::NotConverged
}

/// `closest` is the point of `A - B` nearest the origin, i.e. `witness_a - witness_b`.
fn separated(simplex: &Simplex, closest: &Vector3<f64>) -> CoreDistance {
    let dist_sq = closest.norm_squared();
    if dist_sq <= CORE_OVERLAP_SQ {
        return CoreDistance::Overlapping;
    }
    let distance = dist_sq.sqrt();
    let (witness_a, witness_b) = simplex.witness_points();
    CoreDistance::Separated {
        distance,
        normal: -closest / distance,
        witness_a,
        witness_b,
    }
}

/// Contact between the margin-inflated shapes from a contact between their
/// cores.
///
/// `core_depth` is the core penetration, negative when the cores are apart.
/// Each witness point moves out along the normal by its shape's margin.
pub(crate) fn inflate_core_contact(
    normal: Vector3<f64>,
    witness_a: Point3<f64>,
    witness_b: Point3<f64>,
    core_depth: f64,
    margin_a: f64,
    margin_b: f64,
) -> ContactGeometry {
    ContactGeometry {
        normal,
        point_on_a: witness_a + normal * margin_a,
        point_on_b: witness_b - normal * margin_b,
        penetration_depth: (margin_a + margin_b + core_depth).max(0.0),
    }
}

/// GJK + EPA narrow-phase algorithm, valid for any pair of convex shapes.
#[derive(Debug)]
pub struct GjkAlgorithm {
    pair: Option<OverlappingPair>,
    simplex: Simplex,
    max_iterations: usize,
    relative_tolerance: f64,
    epa: EpaLimits,
}

impl GjkAlgorithm {
    /// Create the algorithm with the iteration bounds of `config`.
    #[must_use]
    pub fn new(config: &NarrowPhaseConfig) -> Self {
        debug_assert!(
            config.validate().is_ok(),
            "GJK built from an invalid config: {config:?}"
        );
        Self {
            pair: None,
            simplex: Simplex::new(),
            max_iterations: config.gjk_max_iterations,
            relative_tolerance: config.gjk_relative_tolerance,
            epa: EpaLimits::from_config(config),
        }
    }

    /// Contact geometry for a pair, if the shapes touch.
    fn contact_geometry(
        &mut self,
        shapes: &ShapePair<'_>,
        arena: &mut ContactArena,
    ) -> Option<ContactGeometry> {
        let margin_a = shapes.shape_a.margin();
        let margin_b = shapes.shape_b.margin();

        match core_distance(
            shapes,
            &mut self.simplex,
            self.max_iterations,
            self.relative_tolerance,
        ) {
            CoreDistance::Separated {
                distance,
                normal,
                witness_a,
                witness_b,
            } => {
                if distance > margin_a + margin_b {
                    return None;
                }
                Some(inflate_core_contact(
                    normal, witness_a, witness_b, -distance, margin_a, margin_b,
                ))
            }
            CoreDistance::Overlapping => {
                let core = epa::penetration(shapes, &self.simplex, &self.epa, arena.epa_scratch())?;
                Some(inflate_core_contact(
                    core.normal,
                    core.point_on_a,
                    core.point_on_b,
                    core.penetration_depth,
                    margin_a,
                    margin_b,
                ))
            }
            CoreDistance::NotConverged => {
                debug!(
                    shape_a = %shapes.shape_a.kind(),
                    shape_b = %shapes.shape_b.kind(),
                    max_iterations = self.max_iterations,
                    "GJK distance query did not converge"
                );
                None
            }
        }
    }
}

impl NarrowPhaseAlgorithm for GjkAlgorithm {
    fn bind_overlapping_pair(&mut self, pair: OverlappingPair) {
        self.pair = Some(pair);
        self.simplex.clear();
    }

    fn current_pair(&self) -> Option<OverlappingPair> {
        self.pair
    }

    fn test_collision(
        &mut self,
        shape_a: &CollisionShape,
        pose_a: &Pose,
        shape_b: &CollisionShape,
        pose_b: &Pose,
        arena: &mut ContactArena,
    ) -> Option<ContactId> {
        debug_assert!(
            self.pair.is_some(),
            "test_collision called without a bound overlapping pair"
        );
        let pair = self.pair?;

        let shapes = ShapePair {
            shape_a,
            pose_a,
            shape_b,
            pose_b,
        };
        let geometry = self.contact_geometry(&shapes, arena)?;

        Some(arena.allocate(ContactPointInfo::new(
            pair,
            shape_a.kind(),
            pose_a,
            shape_b.kind(),
            pose_b,
            &geometry,
        )))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use sim_types::BodyId;

    fn pose_at(x: f64, y: f64, z: f64) -> Pose {
        Pose::from_position(Point3::new(x, y, z))
    }

    fn algorithm() -> GjkAlgorithm {
        let mut gjk = GjkAlgorithm::new(&NarrowPhaseConfig::default());
        gjk.bind_overlapping_pair(OverlappingPair::new(BodyId::new(1), BodyId::new(2)));
        gjk
    }

    fn collide(
        shape_a: &CollisionShape,
        pose_a: &Pose,
        shape_b: &CollisionShape,
        pose_b: &Pose,
    ) -> Option<ContactPointInfo> {
        let mut arena = ContactArena::new();
        let id = algorithm().test_collision(shape_a, pose_a, shape_b, pose_b, &mut arena)?;
        arena.get(id).copied()
    }

    #[test]
    fn test_core_distance_between_points() {
        let a = CollisionShape::sphere(1.0);
        let b = CollisionShape::sphere(1.0);
        let shapes = ShapePair {
            shape_a: &a,
            pose_a: &pose_at(0.0, 0.0, 0.0),
            shape_b: &b,
            pose_b: &pose_at(3.0, 4.0, 0.0),
        };

        match core_distance(&shapes, &mut Simplex::new(), 64, 1e-6) {
            CoreDistance::Separated { distance, .. } => assert_relative_eq!(distance, 5.0),
            other => panic!("expected separation, got {other:?}"),
        }
    }

    #[test]
    fn test_core_distance_between_boxes() {
        let a = CollisionShape::box_with_margin(Vector3::new(1.0, 1.0, 1.0), 0.1);
        let b = CollisionShape::box_with_margin(Vector3::new(1.0, 1.0, 1.0), 0.1);
        let shapes = ShapePair {
            shape_a: &a,
            pose_a: &pose_at(0.0, 0.0, 0.0),
            shape_b: &b,
            pose_b: &pose_at(3.0, 0.5, 0.0),
        };

        // Cores span [-0.9, 0.9]; gap between them is 3 - 1.8
        match core_distance(&shapes, &mut Simplex::new(), 64, 1e-9) {
            CoreDistance::Separated {
                distance,
                normal,
                witness_a,
                witness_b,
            } => {
                assert_relative_eq!(distance, 1.2, epsilon = 1e-9);
                assert_relative_eq!(normal, Vector3::x(), epsilon = 1e-9);
                assert_relative_eq!(witness_a.x, 0.9, epsilon = 1e-9);
                assert_relative_eq!(witness_b.x, 2.1, epsilon = 1e-9);
            }
            other => panic!("expected separation, got {other:?}"),
        }
    }

    #[test]
    fn test_core_distance_overlapping() {
        let a = CollisionShape::box_shape(Vector3::new(1.0, 1.0, 1.0));
        let b = CollisionShape::sphere(0.5);
        let shapes = ShapePair {
            shape_a: &a,
            pose_a: &pose_at(0.0, 0.0, 0.0),
            shape_b: &b,
            pose_b: &pose_at(0.2, 0.1, 0.0),
        };

        assert!(matches!(
            core_distance(&shapes, &mut Simplex::new(), 64, 1e-6),
            CoreDistance::Overlapping
        ));
    }

    #[test]
    fn test_spheres_in_margin_band_match_closed_form() {
        let a = CollisionShape::sphere(1.0);
        let b = CollisionShape::sphere(0.5);
        let contact = collide(&a, &pose_at(0.0, 0.0, 0.0), &b, &pose_at(1.2, 0.0, 0.0)).unwrap();

        assert_relative_eq!(contact.penetration_depth, 0.3, epsilon = 1e-9);
        assert_relative_eq!(contact.normal, Vector3::x(), epsilon = 1e-9);
        assert_relative_eq!(contact.local_point_a, Point3::new(1.0, 0.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(contact.local_point_b, Point3::new(-0.5, 0.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_separated_spheres() {
        let a = CollisionShape::sphere(1.0);
        let b = CollisionShape::sphere(1.0);
        assert!(collide(&a, &pose_at(0.0, 0.0, 0.0), &b, &pose_at(2.5, 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_capsule_resting_on_box() {
        let capsule = CollisionShape::capsule(1.0, 0.25);
        let ground = CollisionShape::box_with_margin(Vector3::new(5.0, 5.0, 0.5), 0.1);

        // Capsule lying along X, bottom at z = 0.4, box top at z = 0.5
        let lying = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2);
        let pose_capsule = Pose::from_position_rotation(Point3::new(0.0, 0.0, 0.65), lying);
        let contact = collide(&ground, &pose_at(0.0, 0.0, 0.0), &capsule, &pose_capsule).unwrap();

        assert_relative_eq!(contact.penetration_depth, 0.1, epsilon = 1e-6);
        assert_relative_eq!(contact.normal, Vector3::z(), epsilon = 1e-6);
    }

    #[test]
    fn test_deep_overlap_goes_through_epa() {
        let a = CollisionShape::box_with_margin(Vector3::new(1.0, 1.0, 1.0), 0.05);
        let b = CollisionShape::sphere(0.5);
        let contact = collide(&a, &pose_at(0.0, 0.0, 0.0), &b, &pose_at(0.0, 0.0, 0.8)).unwrap();

        // Sphere bottom at z = 0.3, box top at z = 1
        assert_relative_eq!(contact.penetration_depth, 0.7, epsilon = 1e-4);
        assert_relative_eq!(contact.normal, Vector3::z(), epsilon = 1e-4);
        assert!(contact.normal.norm() > 0.999_999);
    }

    #[test]
    fn test_sphere_centre_on_capsule_axis() {
        let capsule = CollisionShape::capsule(1.0, 0.5);
        let ball = CollisionShape::sphere(0.5);

        for z in [0.0, 0.3, 0.7] {
            let contact = collide(&capsule, &pose_at(0.0, 0.0, 0.0), &ball, &pose_at(0.0, 0.0, z))
                .unwrap_or_else(|| panic!("no contact with the ball at z = {z}"));

            // Pushed out sideways through both radii
            assert_relative_eq!(contact.penetration_depth, 1.0, epsilon = 1e-9);
            assert_relative_eq!(contact.normal.norm(), 1.0, epsilon = 1e-12);
            assert_relative_eq!(contact.normal.z, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_coaxial_capsules() {
        let a = CollisionShape::capsule(1.0, 0.3);
        let b = CollisionShape::capsule(1.0, 0.3);
        let contact = collide(&a, &pose_at(0.0, 0.0, 0.0), &b, &pose_at(0.0, 0.0, 0.5)).unwrap();
        assert_relative_eq!(contact.penetration_depth, 0.6, epsilon = 1e-9);
        assert_relative_eq!(contact.normal.z, 0.0, epsilon = 1e-12);

        let c = CollisionShape::capsule(1.0, 0.5);
        let coincident = collide(&c, &pose_at(1.0, 2.0, 3.0), &c, &pose_at(1.0, 2.0, 3.0)).unwrap();
        assert_relative_eq!(coincident.penetration_depth, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_crossing_capsules() {
        let a = CollisionShape::capsule(1.0, 0.2);
        let b = CollisionShape::capsule(1.0, 0.3);
        let along_y = Pose::from_position_rotation(
            Point3::origin(),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::FRAC_PI_2),
        );

        let contact = collide(&a, &pose_at(0.0, 0.0, 0.0), &b, &along_y).unwrap();
        assert_relative_eq!(contact.penetration_depth, 0.5, epsilon = 1e-9);
        assert_relative_eq!(contact.normal.x.abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_concentric_spheres() {
        let a = CollisionShape::sphere(1.0);
        let b = CollisionShape::sphere(0.5);
        let contact = collide(&a, &pose_at(0.5, 0.5, 0.5), &b, &pose_at(0.5, 0.5, 0.5)).unwrap();

        assert_relative_eq!(contact.penetration_depth, 1.5, epsilon = 1e-12);
        assert_relative_eq!(contact.normal, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn test_swapping_shapes_flips_normal() {
        let a = CollisionShape::capsule(0.5, 0.3);
        let b = CollisionShape::tetrahedron(0.6);
        let pose_a = pose_at(0.0, 0.0, 0.0);
        // Lowest tetrahedron edge sits at z = 0.65, capsule top at z = 0.8
        let pose_b = pose_at(0.0, 0.0, 1.25);

        let ab = collide(&a, &pose_a, &b, &pose_b).unwrap();
        let ba = collide(&b, &pose_b, &a, &pose_a).unwrap();

        assert_relative_eq!(ab.penetration_depth, 0.19, epsilon = 1e-6);
        assert_relative_eq!(ab.penetration_depth, ba.penetration_depth, epsilon = 1e-6);
        assert_relative_eq!(ab.normal, Vector3::z(), epsilon = 1e-6);
        assert_relative_eq!(ab.normal, -ba.normal, epsilon = 1e-6);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "GJK built from an invalid config")]
    fn test_zero_iteration_budget_rejected_in_debug() {
        let _ = GjkAlgorithm::new(&NarrowPhaseConfig::default().gjk_max_iterations(0));
    }

    #[test]
    fn test_rebinding_changes_current_pair() {
        let mut gjk = GjkAlgorithm::new(&NarrowPhaseConfig::default());
        assert!(gjk.current_pair().is_none());

        let first = OverlappingPair::new(BodyId::new(1), BodyId::new(2));
        let second = OverlappingPair::new(BodyId::new(3), BodyId::new(4));
        gjk.bind_overlapping_pair(first);
        gjk.bind_overlapping_pair(second);
        assert_eq!(gjk.current_pair(), Some(second));
    }
}
