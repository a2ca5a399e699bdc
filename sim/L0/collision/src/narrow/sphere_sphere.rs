//! Closed-form sphere-sphere test.

use nalgebra::Vector3;
use sim_types::Pose;

use super::NarrowPhaseAlgorithm;
use crate::arena::{ContactArena, ContactId};
use crate::contact::{ContactGeometry, ContactPointInfo};
use crate::pair::OverlappingPair;
use crate::shape::CollisionShape;

/// Sphere-sphere narrow-phase algorithm.
///
/// Two spheres touch when the distance `d` between their centres satisfies
/// `d <= r1 + r2`. The contact normal is the centre-to-centre direction and
/// the depth is `r1 + r2 - d`. Coincident centres use `+Y`.
#[derive(Debug, Default)]
pub struct SphereVsSphereAlgorithm {
    pair: Option<OverlappingPair>,
}

impl SphereVsSphereAlgorithm {
    /// Create an unbound algorithm.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Contact geometry between two spheres, if they touch.
pub(crate) fn sphere_sphere_geometry(
    radius_a: f64,
    pose_a: &Pose,
    radius_b: f64,
    pose_b: &Pose,
) -> Option<ContactGeometry> {
    let diff = pose_b.position - pose_a.position;
    let dist_sq = diff.norm_squared();
    let sum_radii = radius_a + radius_b;

    if dist_sq > sum_radii * sum_radii {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist_sq > f64::EPSILON * f64::EPSILON {
        diff / dist
    } else {
        Vector3::y()
    };

    Some(ContactGeometry {
        normal,
        point_on_a: pose_a.position + normal * radius_a,
        point_on_b: pose_b.position - normal * radius_b,
        penetration_depth: sum_radii - dist,
    })
}

impl NarrowPhaseAlgorithm for SphereVsSphereAlgorithm {
    fn bind_overlapping_pair(&mut self, pair: OverlappingPair) {
        self.pair = Some(pair);
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

        let (CollisionShape::Sphere(a), CollisionShape::Sphere(b)) = (shape_a, shape_b) else {
            debug_assert!(
                false,
                "sphere-sphere algorithm given {}-{} pair",
                shape_a.kind(),
                shape_b.kind()
            );
            return None;
        };

        let geometry = sphere_sphere_geometry(a.radius(), pose_a, b.radius(), pose_b)?;
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
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;
    use sim_types::BodyId;

    fn pose_at(x: f64, y: f64, z: f64) -> Pose {
        Pose::from_position(Point3::new(x, y, z))
    }

    fn collide(
        r1: f64,
        pose_a: &Pose,
        r2: f64,
        pose_b: &Pose,
    ) -> Option<ContactPointInfo> {
        let mut algorithm = SphereVsSphereAlgorithm::new();
        algorithm.bind_overlapping_pair(OverlappingPair::new(BodyId::new(7), BodyId::new(9)));
        let mut arena = ContactArena::new();
        let id = algorithm.test_collision(
            &CollisionShape::sphere(r1),
            pose_a,
            &CollisionShape::sphere(r2),
            pose_b,
            &mut arena,
        )?;
        assert_eq!(arena.len(), 1);
        arena.get(id).copied()
    }

    #[test]
    fn test_overlapping_spheres() {
        let contact = collide(1.0, &pose_at(0.0, 0.0, 0.0), 1.0, &pose_at(1.5, 0.0, 0.0)).unwrap();

        assert_eq!(contact.body_a, BodyId::new(7));
        assert_eq!(contact.body_b, BodyId::new(9));
        assert_relative_eq!(contact.penetration_depth, 0.5);
        assert_relative_eq!(contact.normal, Vector3::x());
        assert_relative_eq!(contact.point, Point3::new(0.75, 0.0, 0.0));
        assert_relative_eq!(contact.local_point_a, Point3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(contact.local_point_b, Point3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_separated_spheres() {
        assert!(collide(1.0, &pose_at(0.0, 0.0, 0.0), 1.0, &pose_at(0.0, 2.5, 0.0)).is_none());
    }

    #[test]
    fn test_touching_spheres_have_zero_depth() {
        let contact = collide(0.5, &pose_at(0.0, 0.0, 0.0), 1.5, &pose_at(0.0, 0.0, 2.0)).unwrap();
        assert_eq!(contact.penetration_depth, 0.0);
        assert_eq!(contact.normal, Vector3::z());
    }

    #[test]
    fn test_coincident_centres_use_up_axis() {
        let contact = collide(1.0, &pose_at(1.0, 1.0, 1.0), 0.5, &pose_at(1.0, 1.0, 1.0)).unwrap();
        assert_eq!(contact.normal, Vector3::y());
        assert_relative_eq!(contact.penetration_depth, 1.5);
    }

    #[test]
    fn test_rotation_does_not_matter() {
        let rotated = Pose::from_position_rotation(
            Point3::new(1.5, 0.0, 0.0),
            nalgebra::UnitQuaternion::from_euler_angles(0.3, -1.1, 2.0),
        );
        let contact = collide(1.0, &pose_at(0.0, 0.0, 0.0), 1.0, &rotated).unwrap();
        assert_relative_eq!(contact.penetration_depth, 0.5, epsilon = 1e-12);
        assert_relative_eq!(
            contact.world_point_b(&rotated),
            Point3::new(0.5, 0.0, 0.0),
            epsilon = 1e-12
        );
    }
}
