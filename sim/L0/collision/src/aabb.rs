//! World-space axis-aligned bounding boxes.
//!
//! Produced by [`CollisionShape::update_aabb`](crate::CollisionShape::update_aabb)
//! for the external broad phase. Recomputed every query; never cached here.

use nalgebra::{Point3, Vector3};

/// Axis-aligned bounding box.
///
/// Invariant: `min <= max` on every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point3<f64>,
    /// Maximum corner of the bounding box.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Create a new AABB from minimum and maximum corners.
    #[must_use]
    pub fn new(min: Point3<f64>, max: Point3<f64>) -> Self {
        debug_assert!(
            min.x <= max.x && min.y <= max.y && min.z <= max.z,
            "AABB min {min:?} exceeds max {max:?}"
        );
        Self { min, max }
    }

    /// Create an AABB centered at a point with the given half-extents.
    #[must_use]
    pub fn from_center(center: Point3<f64>, half_extents: Vector3<f64>) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Check if this AABB overlaps with another AABB (touching counts).
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Expand this AABB by a margin on all sides.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vector3::repeat(margin);
        Self::new(self.min - m, self.max + m)
    }

    /// Smallest AABB enclosing both boxes.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        Self::new(self.min.inf(&other.min), self.max.sup(&other.max))
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Point3<f64> {
        nalgebra::center(&self.min, &self.max)
    }

    /// Half-extents along each axis.
    #[must_use]
    pub fn half_extents(&self) -> Vector3<f64> {
        (self.max - self.min) * 0.5
    }

    /// Check whether a point lies inside or on the boundary.
    #[must_use]
    pub fn contains_point(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|i| self.min[i] <= point[i] && point[i] <= self.max[i])
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Point3::origin(), Point3::origin())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_overlaps() {
        let a = Aabb::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0));
        let b = Aabb::new(Point3::new(0.5, 0.5, 0.5), Point3::new(2.0, 2.0, 2.0));
        let c = Aabb::new(Point3::new(1.0, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        let d = Aabb::new(Point3::new(1.1, 0.0, 0.0), Point3::new(2.0, 1.0, 1.0));
        assert!(a.overlaps(&b));
        assert!(a.overlaps(&c), "touching boxes overlap");
        assert!(!a.overlaps(&d));
    }

    #[test]
    fn test_expanded_and_merged() {
        let a = Aabb::from_center(Point3::origin(), Vector3::new(1.0, 1.0, 1.0));
        let e = a.expanded(0.5);
        assert_eq!(e.min, Point3::new(-1.5, -1.5, -1.5));
        assert_eq!(e.max, Point3::new(1.5, 1.5, 1.5));

        let b = Aabb::from_center(Point3::new(3.0, 0.0, 0.0), Vector3::new(1.0, 2.0, 1.0));
        let m = a.merged(&b);
        assert_eq!(m.min, Point3::new(-1.0, -2.0, -1.0));
        assert_eq!(m.max, Point3::new(4.0, 2.0, 1.0));
    }

    #[test]
    fn test_center_and_half_extents() {
        let a = Aabb::new(Point3::new(-1.0, 0.0, 2.0), Point3::new(3.0, 2.0, 4.0));
        assert_eq!(a.center(), Point3::new(1.0, 1.0, 3.0));
        assert_eq!(a.half_extents(), Vector3::new(2.0, 1.0, 1.0));
        assert!(a.contains_point(&Point3::new(3.0, 1.0, 3.0)));
        assert!(!a.contains_point(&Point3::new(3.1, 1.0, 3.0)));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "exceeds max")]
    fn test_inverted_bounds_rejected_in_debug() {
        let _ = Aabb::new(Point3::new(1.0, 0.0, 0.0), Point3::new(0.0, 1.0, 1.0));
    }
}
