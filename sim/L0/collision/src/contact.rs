//! Contact output handed to the constraint solver.

use nalgebra::{Point3, Vector3};
use sim_types::{BodyId, Pose};

use crate::pair::OverlappingPair;
use crate::shape::ShapeKind;

/// World-space contact geometry computed by a narrow-phase algorithm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactGeometry {
    /// Unit contact normal, pointing from shape A toward shape B.
    pub normal: Vector3<f64>,
    /// Deepest point of shape A's surface inside shape B.
    pub point_on_a: Point3<f64>,
    /// Deepest point of shape B's surface inside shape A.
    pub point_on_b: Point3<f64>,
    /// Penetration depth along the normal.
    pub penetration_depth: f64,
}

/// A single contact between two shapes.
///
/// Allocated from a [`ContactArena`](crate::ContactArena) when a test hits and
/// never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPointInfo {
    /// First body of the pair.
    pub body_a: BodyId,
    /// Second body of the pair.
    pub body_b: BodyId,
    /// Kind of the first shape.
    pub shape_a: ShapeKind,
    /// Kind of the second shape.
    pub shape_b: ShapeKind,
    /// Unit contact normal, pointing from A toward B.
    pub normal: Vector3<f64>,
    /// World contact point, midway between the two surface points.
    pub point: Point3<f64>,
    /// Contact point on A's surface, in A's local frame.
    pub local_point_a: Point3<f64>,
    /// Contact point on B's surface, in B's local frame.
    pub local_point_b: Point3<f64>,
    /// Penetration depth (non-negative).
    pub penetration_depth: f64,
}

impl ContactPointInfo {
    /// Build a contact from world-space geometry.
    #[must_use]
    pub fn new(
        pair: OverlappingPair,
        shape_a: ShapeKind,
        pose_a: &Pose,
        shape_b: ShapeKind,
        pose_b: &Pose,
        geometry: &ContactGeometry,
    ) -> Self {
        debug_assert!(
            (geometry.normal.norm() - 1.0).abs() < 1e-6,
            "contact normal must be unit length, got {:?}",
            geometry.normal
        );
        debug_assert!(
            geometry.penetration_depth >= 0.0,
            "penetration depth must be non-negative, got {}",
            geometry.penetration_depth
        );

        Self {
            body_a: pair.body_a,
            body_b: pair.body_b,
            shape_a,
            shape_b,
            normal: geometry.normal,
            point: nalgebra::center(&geometry.point_on_a, &geometry.point_on_b),
            local_point_a: pose_a.inverse_transform_point(&geometry.point_on_a),
            local_point_b: pose_b.inverse_transform_point(&geometry.point_on_b),
            penetration_depth: geometry.penetration_depth,
        }
    }

    /// Contact point on A's surface in world coordinates.
    #[must_use]
    pub fn world_point_a(&self, pose_a: &Pose) -> Point3<f64> {
        pose_a.transform_point(&self.local_point_a)
    }

    /// Contact point on B's surface in world coordinates.
    #[must_use]
    pub fn world_point_b(&self, pose_b: &Pose) -> Point3<f64> {
        pose_b.transform_point(&self.local_point_b)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_contact_points_round_trip() {
        let pair = OverlappingPair::new(BodyId::new(1), BodyId::new(2));
        let pose_a = Pose::from_position(Point3::new(0.0, 0.0, 0.0));
        let pose_b = Pose::from_position(Point3::new(1.5, 0.0, 0.0));
        let geometry = ContactGeometry {
            normal: Vector3::x(),
            point_on_a: Point3::new(1.0, 0.0, 0.0),
            point_on_b: Point3::new(0.5, 0.0, 0.0),
            penetration_depth: 0.5,
        };
        let contact = ContactPointInfo::new(
            pair,
            ShapeKind::Sphere,
            &pose_a,
            ShapeKind::Sphere,
            &pose_b,
            &geometry,
        );

        assert_eq!(contact.body_a, BodyId::new(1));
        assert_eq!(contact.point, Point3::new(0.75, 0.0, 0.0));
        assert_eq!(contact.local_point_a, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(contact.local_point_b, Point3::new(-1.0, 0.0, 0.0));
        assert_relative_eq!(
            contact.world_point_b(&pose_b).coords,
            geometry.point_on_b.coords,
            epsilon = 1e-12
        );
        assert_relative_eq!(
            contact.world_point_a(&pose_a).coords,
            geometry.point_on_a.coords,
            epsilon = 1e-12
        );
    }
}
